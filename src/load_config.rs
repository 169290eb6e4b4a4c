/// `load_config` module: Loads a static YAML config and applies environment overrides.
///
/// This module is the only place where user-supplied YAML is parsed and mapped
/// onto the strongly-typed settings of `crowdin-sync-core`.
///
/// # Responsibilities
/// - Parse the YAML configuration file into type-safe structs
/// - Apply `CROWDIN_*` environment overrides on top of the file values
/// - Build [`FileSyncSettings`] / [`ContentSyncSettings`] for the pipelines
///
/// Secrets (the API token) are never read from the file; see [`crate::client`].
///
/// # Errors
/// All errors use `anyhow::Error` with the offending path or variable in the message.
use anyhow::{anyhow, Context, Result};
use crowdin_sync_core::config::{
    ContentSyncSettings, FileSyncSettings, LanguageFolder, DEFAULT_CHUNK_SIZE,
};
use crowdin_sync_core::contract::FileUpdateOption;
use crowdin_sync_core::files::FileMapping;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

pub const DEFAULT_BASE_URL: &str = "https://api.crowdin.com/api/v2";

#[derive(Debug, Deserialize)]
pub struct CliConfig {
    pub crowdin: CrowdinSection,
    #[serde(default)]
    pub debug: bool,
    /// Root that relative source folders and databases resolve against.
    #[serde(default = "default_base_dir")]
    pub base_dir: PathBuf,
    #[serde(default)]
    pub language_folder: LanguageFolder,
    #[serde(default)]
    pub files: Vec<FileMapping>,
    #[serde(default)]
    pub content: Vec<ContentSection>,
}

#[derive(Debug, Deserialize)]
pub struct CrowdinSection {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub project_id_files: Option<i64>,
    #[serde(default)]
    pub project_id_content: Option<i64>,
    #[serde(default)]
    pub file_update_option: FileUpdateOption,
    #[serde(default = "default_true")]
    pub file_export_approved_only: bool,
    #[serde(default)]
    pub content_branch_id: Option<i64>,
    #[serde(default)]
    pub content_approved_only: bool,
}

/// One table of translatable records.
#[derive(Debug, Clone, Deserialize)]
pub struct ContentSection {
    /// Identifier prefix of the strings uploaded for this table.
    pub name: String,
    /// SQLite database file.
    pub database: PathBuf,
    pub table: String,
    #[serde(default = "default_key_column")]
    pub key_column: String,
    /// Columns the table declares as translatable (JSON `{language: text}`).
    #[serde(default)]
    pub translatable: Vec<String>,
    /// Columns to sync; empty means every translatable column.
    #[serde(default)]
    pub fields: Vec<String>,
    /// Column whose value is sent as string context.
    #[serde(default)]
    pub context_column: Option<String>,
    #[serde(default)]
    pub chunk_size: Option<usize>,
}

fn default_base_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_true() -> bool {
    true
}

fn default_key_column() -> String {
    "id".to_string()
}

impl CliConfig {
    pub fn file_settings(&self) -> Result<FileSyncSettings> {
        let project_id = self.crowdin.project_id_files.ok_or_else(|| {
            anyhow!("crowdin.project_id_files (or CROWDIN_PROJECT_ID_FILES) is not set")
        })?;
        Ok(FileSyncSettings {
            project_id,
            update_option: self.crowdin.file_update_option,
            export_approved_only: self.crowdin.file_export_approved_only,
            language_folder: self.language_folder,
        })
    }

    pub fn content_settings(&self, section: &ContentSection) -> Result<ContentSyncSettings> {
        let project_id = self.crowdin.project_id_content.ok_or_else(|| {
            anyhow!("crowdin.project_id_content (or CROWDIN_PROJECT_ID_CONTENT) is not set")
        })?;
        Ok(ContentSyncSettings {
            project_id,
            branch_id: self.crowdin.content_branch_id,
            approved_only: self.crowdin.content_approved_only,
            chunk_size: section.chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE),
        })
    }

    /// Database path of a content section, resolved against `base_dir`.
    pub fn database_path(&self, section: &ContentSection) -> PathBuf {
        self.base_dir.join(&section.database)
    }

    /// Overlay `CROWDIN_*` environment variables onto the file values.
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(id) = env_parsed::<i64>("CROWDIN_PROJECT_ID_FILES")? {
            self.crowdin.project_id_files = Some(id);
        }
        if let Some(id) = env_parsed::<i64>("CROWDIN_PROJECT_ID_CONTENT")? {
            self.crowdin.project_id_content = Some(id);
        }
        if let Some(raw) = env_value("CROWDIN_FILE_UPDATE_OPTIONS") {
            self.crowdin.file_update_option = raw
                .parse()
                .map_err(|e: String| anyhow!("CROWDIN_FILE_UPDATE_OPTIONS: {e}"))?;
        }
        if let Some(flag) = env_flag("CROWDIN_FILE_EXPORT_APPROVED_ONLY")? {
            self.crowdin.file_export_approved_only = flag;
        }
        if let Some(id) = env_parsed::<i64>("CROWDIN_CONTENT_BRANCH_ID")? {
            self.crowdin.content_branch_id = Some(id);
        }
        if let Some(flag) = env_flag("CROWDIN_CONTENT_APPROVED_ONLY")? {
            self.crowdin.content_approved_only = flag;
        }
        if let Some(flag) = env_flag("CROWDIN_DEBUG")? {
            self.debug = flag;
        }
        Ok(())
    }

    pub fn trace_loaded(&self) {
        info!(
            base_url = %self.crowdin.base_url,
            project_id_files = ?self.crowdin.project_id_files,
            project_id_content = ?self.crowdin.project_id_content,
            files = self.files.len(),
            content = self.content.len(),
            "Loaded config"
        );
        debug!(?self, "Config loaded (full debug)");
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_parsed<T>(key: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    env_value(key)
        .map(|raw| raw.trim().parse::<T>().with_context(|| format!("{key}={raw}")))
        .transpose()
}

fn env_flag(key: &str) -> Result<Option<bool>> {
    env_value(key)
        .map(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            other => Err(anyhow!("{key} must be a boolean, got {other:?}")),
        })
        .transpose()
}

/// Loads the YAML config file and applies environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CliConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading configuration from file");

    let config_content = match fs::read_to_string(path_ref) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path_ref, e));
        }
    };

    let mut config: CliConfig = match serde_yaml::from_str(&config_content) {
        Ok(conf) => {
            info!(config_path = ?path_ref, "Parsed config YAML successfully");
            conf
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse config YAML");
            return Err(anyhow!("Failed to parse config YAML: {e}"));
        }
    };

    config.apply_env_overrides()?;
    config.trace_loaded();
    Ok(config)
}
