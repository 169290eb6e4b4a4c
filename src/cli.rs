///
/// This module implements the CLI interface for crowdin-sync: command parsing,
/// config loading and dispatch into the pipelines of `crowdin-sync-core`.
///
/// All reconciliation logic lives in [`crowdin-sync-core`]; this module only
/// wires config, the Crowdin client and the SQLite record store together.
///
/// ## How To Use
/// - For command-line users: run the `crowdin-sync` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`],
///   or [`sync_files`] / [`sync_content`] with any `TranslationService`.
///
/// [`crowdin-sync-core`]: ../../crowdin-sync-core/
use crate::client::CrowdinClient;
use crate::load_config::{load_config, CliConfig, ContentSection};
use crate::sqlite_store::{SqliteRecord, SqliteRecordStore, SqliteTable};
use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand, ValueEnum};
use crowdin_sync_core::content::{ContentPipeline, ContentResource, ContentSyncReport, Field};
use crowdin_sync_core::contract::TranslationService;
use crowdin_sync_core::files::{FilePipeline, FileSyncReport};
use std::path::{Path, PathBuf};

/// CLI for crowdin-sync: keep language files and database content in step with Crowdin.
#[derive(Parser)]
#[clap(
    name = "crowdin-sync",
    version,
    about = "Synchronise language files and translatable database content with Crowdin"
)]
pub struct Cli {
    #[clap(subcommand)]
    pub command: Commands,

    /// Log every file and string handled
    #[clap(long, global = true)]
    pub debug: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Direction {
    /// Send local sources to Crowdin
    Upload,
    /// Write Crowdin translations locally
    Download,
    /// Upload, then download
    #[default]
    Sync,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronise the language files listed under `files` in the config
    Files {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        #[clap(long, value_enum, default_value_t = Direction::Sync)]
        direction: Direction,
    },
    /// Synchronise the database content listed under `content` in the config
    Content {
        /// Path to the YAML config file
        #[clap(long)]
        config: PathBuf,
        #[clap(long, value_enum, default_value_t = Direction::Sync)]
        direction: Direction,
        /// Only sync the content resource with this name
        #[clap(long)]
        only: Option<String>,
    },
}

impl Commands {
    pub fn config_path(&self) -> &Path {
        match self {
            Commands::Files { config, .. } | Commands::Content { config, .. } => config,
        }
    }
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    run_with(cli, || {}).await
}

/// Like [`run`], calling `enable_debug` once the config asks for debug logging.
pub async fn run_with<F>(cli: Cli, enable_debug: F) -> Result<()>
where
    F: FnOnce(),
{
    // Emit a top-level 'trace_initialised' event at the very start
    tracing::info!("trace_initialised");

    let config = load_config(cli.command.config_path())?;
    if config.debug || cli.debug {
        enable_debug();
    }

    let client = CrowdinClient::new_from_env(&config.crowdin.base_url)
        .map_err(|e| anyhow!("Failed to construct Crowdin client: {e}"))?;

    let result = match cli.command {
        Commands::Files { direction, .. } => {
            tracing::info!(command = "files", ?direction, "Starting file synchronisation");
            sync_files(&config, &client, direction)
                .await
                .map(|report| {
                    tracing::info!(command = "files", ?report, "File synchronisation complete")
                })
        }
        Commands::Content {
            direction, only, ..
        } => {
            tracing::info!(command = "content", ?direction, "Starting content synchronisation");
            sync_content(&config, &client, direction, only.as_deref())
                .await
                .map(|report| {
                    tracing::info!(
                        command = "content",
                        ?report,
                        "Content synchronisation complete"
                    )
                })
        }
    };

    if let Err(e) = &result {
        tracing::error!(error = %e, "Synchronisation failed");
    }

    let exit_span = tracing::info_span!("exit");
    exit_span.in_scope(|| {
        tracing::info!(success = result.is_ok(), "exit");
    });

    result
}

/// Run the file pipeline over every configured mapping.
pub async fn sync_files<S>(
    config: &CliConfig,
    service: &S,
    direction: Direction,
) -> Result<FileSyncReport>
where
    S: TranslationService + ?Sized,
{
    let settings = config.file_settings()?;
    settings.trace_loaded();
    if config.files.is_empty() {
        tracing::warn!("No file mappings configured, nothing to do");
        return Ok(FileSyncReport::default());
    }

    let mut pipeline = FilePipeline::open(service, settings, &config.base_dir).await?;
    let mut total = FileSyncReport::default();
    for mapping in &config.files {
        let report = match direction {
            Direction::Upload => pipeline.upload_files(mapping).await?,
            Direction::Download => pipeline.download_files(mapping).await?,
            Direction::Sync => pipeline.sync_files(mapping).await?,
        };
        total.created += report.created;
        total.updated += report.updated;
        total.downloaded += report.downloaded;
    }
    Ok(total)
}

fn resource_for(section: &ContentSection) -> ContentResource<SqliteRecord> {
    if section.fields.is_empty() {
        ContentResource::auto(section.name.as_str())
    } else {
        ContentResource::with_fields(
            section.name.as_str(),
            section.fields.iter().map(|f| Field::direct(f.as_str())).collect(),
        )
    }
}

fn open_store(config: &CliConfig, section: &ContentSection) -> Result<SqliteRecordStore> {
    let path = config.database_path(section);
    SqliteRecordStore::open(
        &path,
        SqliteTable {
            table: section.table.clone(),
            key_column: section.key_column.clone(),
            translatable: section.translatable.clone(),
            fields: section.fields.clone(),
            context_column: section.context_column.clone(),
        },
    )
    .map_err(|e| anyhow!("Failed to open content database {:?}: {e}", path))
}

/// Run the content pipeline over every configured resource, or only `only`.
pub async fn sync_content<S>(
    config: &CliConfig,
    service: &S,
    direction: Direction,
    only: Option<&str>,
) -> Result<ContentSyncReport>
where
    S: TranslationService + ?Sized,
{
    let sections: Vec<&ContentSection> = config
        .content
        .iter()
        .filter(|s| only.map_or(true, |name| s.name == name))
        .collect();
    if let Some(name) = only {
        if sections.is_empty() {
            return Err(anyhow!("No content resource named {name:?} in config"));
        }
    }

    let mut total = ContentSyncReport::default();
    for section in sections {
        let settings = config.content_settings(section)?;
        settings.trace_loaded();
        let store = open_store(config, section)?;
        let resource = resource_for(section);
        let pipeline = ContentPipeline::open(service, settings).await?;

        let report = match direction {
            Direction::Upload => pipeline.upload_content(&store, &resource).await?,
            Direction::Download => pipeline.download_content(&store, &resource).await?,
            Direction::Sync => pipeline.sync_content(&store, &resource).await?,
        };
        tracing::info!(resource = %section.name, ?report, "Content resource done");
        total.created += report.created;
        total.updated += report.updated;
        total.unchanged += report.unchanged;
        total.ambiguous += report.ambiguous;
        total.unresolved += report.unresolved;
        total.applied += report.applied;
        total.saved += report.saved;
    }
    Ok(total)
}
