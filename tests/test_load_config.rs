use crowdin_sync::load_config::{load_config, DEFAULT_BASE_URL};
use crowdin_sync_core::config::LanguageFolder;
use crowdin_sync_core::contract::FileUpdateOption;
use serial_test::serial;
use std::env;
use std::fs::write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

const OVERRIDES: &[&str] = &[
    "CROWDIN_PROJECT_ID_FILES",
    "CROWDIN_PROJECT_ID_CONTENT",
    "CROWDIN_FILE_UPDATE_OPTIONS",
    "CROWDIN_FILE_EXPORT_APPROVED_ONLY",
    "CROWDIN_CONTENT_BRANCH_ID",
    "CROWDIN_CONTENT_APPROVED_ONLY",
    "CROWDIN_DEBUG",
];

fn clear_overrides() {
    for key in OVERRIDES {
        env::remove_var(key);
    }
}

fn config_file(yaml: &str) -> NamedTempFile {
    let file = NamedTempFile::new().expect("temp file");
    write(file.path(), yaml).unwrap();
    file
}

/// A full config file maps onto the typed settings without any env vars.
#[tokio::test]
#[serial]
async fn test_load_config_reads_file_values() {
    clear_overrides();
    let file = config_file(
        r#"
crowdin:
  project_id_files: 12
  project_id_content: 34
  file_update_option: keep_translations_and_approvals
  file_export_approved_only: false
  content_branch_id: 5
  content_approved_only: true
base_dir: /srv/app
language_folder: full
files:
  - source: resources/lang
    target: app/lang
    include: [messages.php]
content:
  - name: products
    database: database/app.sqlite
    table: products
    translatable: [title, body]
    fields: [title]
    context_column: note
    chunk_size: 25
"#,
    );

    let config = load_config(file.path()).expect("config loads");

    assert_eq!(config.crowdin.base_url, DEFAULT_BASE_URL);
    assert_eq!(config.base_dir, PathBuf::from("/srv/app"));
    assert_eq!(config.files.len(), 1);
    assert_eq!(config.files[0].target, "app/lang");
    assert_eq!(config.files[0].include, vec!["messages.php".to_string()]);

    let files = config.file_settings().expect("file settings");
    assert_eq!(files.project_id, 12);
    assert_eq!(files.update_option, FileUpdateOption::KeepTranslationsAndApprovals);
    assert!(!files.export_approved_only);
    assert_eq!(files.language_folder, LanguageFolder::Full);

    let section = &config.content[0];
    assert_eq!(section.key_column, "id", "key column defaults to id");
    let content = config.content_settings(section).expect("content settings");
    assert_eq!(content.project_id, 34);
    assert_eq!(content.branch_id, Some(5));
    assert!(content.approved_only);
    assert_eq!(content.chunk_size, 25);
    assert_eq!(
        config.database_path(section),
        PathBuf::from("/srv/app/database/app.sqlite")
    );
}

/// Environment variables win over the file.
#[tokio::test]
#[serial]
async fn test_load_config_applies_env_overrides() {
    clear_overrides();
    let file = config_file(
        r#"
crowdin:
  project_id_files: 1
content:
  - name: pages
    database: app.sqlite
    table: pages
"#,
    );

    env::set_var("CROWDIN_PROJECT_ID_FILES", "77");
    env::set_var("CROWDIN_PROJECT_ID_CONTENT", "88");
    env::set_var("CROWDIN_FILE_UPDATE_OPTIONS", "keep_translations");
    env::set_var("CROWDIN_FILE_EXPORT_APPROVED_ONLY", "false");
    env::set_var("CROWDIN_CONTENT_BRANCH_ID", "4");
    env::set_var("CROWDIN_DEBUG", "yes");

    let config = load_config(file.path()).expect("config loads");
    clear_overrides();

    assert!(config.debug);
    let files = config.file_settings().unwrap();
    assert_eq!(files.project_id, 77);
    assert_eq!(files.update_option, FileUpdateOption::KeepTranslations);
    assert!(!files.export_approved_only);
    let content = config.content_settings(&config.content[0]).unwrap();
    assert_eq!(content.project_id, 88);
    assert_eq!(content.branch_id, Some(4));
    assert!(!content.approved_only);
}

#[tokio::test]
#[serial]
async fn test_load_config_rejects_malformed_env_values() {
    clear_overrides();
    let file = config_file("crowdin: {}\n");

    env::set_var("CROWDIN_PROJECT_ID_FILES", "not-a-number");
    let err = load_config(file.path()).unwrap_err();
    clear_overrides();
    assert!(err.to_string().contains("CROWDIN_PROJECT_ID_FILES"), "got: {err}");

    env::set_var("CROWDIN_CONTENT_APPROVED_ONLY", "maybe");
    let err = load_config(file.path()).unwrap_err();
    clear_overrides();
    assert!(err.to_string().contains("CROWDIN_CONTENT_APPROVED_ONLY"), "got: {err}");
}

/// Missing project ids only fail when the pipeline needing them is built.
#[tokio::test]
#[serial]
async fn test_missing_project_ids_error_on_use() {
    clear_overrides();
    let file = config_file("crowdin: {}\n");

    let config = load_config(file.path()).expect("config loads");
    let err = config.file_settings().unwrap_err();
    assert!(err.to_string().contains("project_id_files"), "got: {err}");
}

#[tokio::test]
#[serial]
async fn test_load_config_errors_for_invalid_file() {
    clear_overrides();
    let file = config_file("crowdin: [unterminated\n");
    let err = load_config(file.path()).unwrap_err();
    assert!(err.to_string().contains("Failed to parse config YAML"), "got: {err}");

    let err = load_config("/definitely/not/here.yaml").unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"), "got: {err}");
}
