use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::contract::FileUpdateOption;

/// How a target language id maps onto a local folder name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageFolder {
    /// `pt-BR` is written to `pt/`.
    #[default]
    PrimarySubtag,
    /// `pt-BR` is written to `pt-BR/`.
    Full,
}

impl LanguageFolder {
    pub fn folder_for<'a>(&self, language_id: &'a str) -> &'a str {
        match self {
            LanguageFolder::PrimarySubtag => language_id.split('-').next().unwrap_or(language_id),
            LanguageFolder::Full => language_id,
        }
    }
}

/// Settings of the file pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileSyncSettings {
    /// File-based project holding the language files.
    pub project_id: i64,
    #[serde(default)]
    pub update_option: FileUpdateOption,
    #[serde(default = "default_true")]
    pub export_approved_only: bool,
    #[serde(default)]
    pub language_folder: LanguageFolder,
}

/// Settings of the content pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSyncSettings {
    /// String-based project holding the record strings.
    pub project_id: i64,
    #[serde(default)]
    pub branch_id: Option<i64>,
    #[serde(default)]
    pub approved_only: bool,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

pub const DEFAULT_CHUNK_SIZE: usize = 100;

fn default_true() -> bool {
    true
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl FileSyncSettings {
    pub fn trace_loaded(&self) {
        info!(
            project_id = self.project_id,
            update_option = self.update_option.as_str(),
            export_approved_only = self.export_approved_only,
            "Loaded file sync settings"
        );
        debug!(?self, "File sync settings (full debug)");
    }
}

impl ContentSyncSettings {
    pub fn trace_loaded(&self) {
        info!(
            project_id = self.project_id,
            branch_id = ?self.branch_id,
            approved_only = self.approved_only,
            chunk_size = self.chunk_size,
            "Loaded content sync settings"
        );
        debug!(?self, "Content sync settings (full debug)");
    }
}
