#![allow(unused)]

//! # contract: the remote translation service as seen by the pipelines
//!
//! This module defines a single trait ([`TranslationService`]) and the plain
//! data types flowing across it. The pipelines in [`crate::files`] and
//! [`crate::content`] never talk HTTP; they call this trait, so the real
//! Crowdin client and test mocks are interchangeable.
//!
//! ## Mocking & Testing
//! - The trait is annotated for `mockall` so consumers get a deterministic
//!   `MockTranslationService` in tests (enable the `test-export-mocks` feature
//!   outside this crate).
//!
//! ## Errors
//! - Every remote failure is a boxed [`ServiceError`]. Pipelines never retry;
//!   the error propagates and ends the run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use mockall::{automock, predicate::*};

/// Error returned by any remote call.
pub type ServiceError = Box<dyn std::error::Error + Send + Sync>;

/// Languages configured on a remote project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLanguages {
    pub source_language_id: String,
    pub target_language_ids: Vec<String>,
}

/// A remote directory. Its name is the full remote folder path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Directory {
    pub id: i64,
    pub name: String,
}

/// A remote file. Files at the project root have no directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFile {
    pub id: i64,
    pub name: String,
    pub directory_id: Option<i64>,
}

/// What happens to existing translations when a file's source is replaced.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileUpdateOption {
    #[default]
    ClearTranslationsAndApprovals,
    KeepTranslations,
    KeepTranslationsAndApprovals,
}

impl FileUpdateOption {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileUpdateOption::ClearTranslationsAndApprovals => "clear_translations_and_approvals",
            FileUpdateOption::KeepTranslations => "keep_translations",
            FileUpdateOption::KeepTranslationsAndApprovals => "keep_translations_and_approvals",
        }
    }
}

impl std::str::FromStr for FileUpdateOption {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "clear_translations_and_approvals" => {
                Ok(FileUpdateOption::ClearTranslationsAndApprovals)
            }
            "keep_translations" => Ok(FileUpdateOption::KeepTranslations),
            "keep_translations_and_approvals" => Ok(FileUpdateOption::KeepTranslationsAndApprovals),
            other => Err(format!("unknown file update option: {other}")),
        }
    }
}

/// Request to create a remote file from an uploaded storage blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFile {
    pub name: String,
    pub directory_id: i64,
    pub storage_id: i64,
}

/// Request to replace the source of an existing remote file in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileUpdate {
    pub file_id: i64,
    pub name: String,
    pub storage_id: i64,
    pub update_option: FileUpdateOption,
}

/// Request to build a translated export of one file in one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportRequest {
    pub file_id: i64,
    pub target_language_id: String,
    pub skip_untranslated_strings: bool,
    pub export_approved_only: bool,
}

/// A source string in a string-based project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceString {
    pub id: i64,
    pub identifier: String,
    pub text: String,
    pub context: Option<String>,
}

/// Request to add a source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSourceString {
    pub branch_id: Option<i64>,
    pub identifier: String,
    pub text: String,
    pub context: Option<String>,
}

/// Request to change the text (and optionally context) of a source string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceStringUpdate {
    pub string_id: i64,
    pub text: String,
    pub context: Option<String>,
}

/// A translation of one source string into one language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translation {
    pub id: i64,
    pub text: String,
    pub rating: i64,
}

/// Reviewer sign-off on a translation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Approval {
    pub id: i64,
    pub translation_id: i64,
}

/// Trait for every remote operation the pipelines consume.
/// The implementor is responsible for authentication, transport and paging.
///
/// All list operations return the complete result set, not a single page.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait TranslationService: Send + Sync {
    /// Source and target languages of a project.
    async fn project_languages(&self, project_id: i64) -> Result<ProjectLanguages, ServiceError>;

    async fn list_directories(&self, project_id: i64) -> Result<Vec<Directory>, ServiceError>;

    async fn create_directory(&self, project_id: i64, name: &str)
        -> Result<Directory, ServiceError>;

    async fn list_files(&self, project_id: i64) -> Result<Vec<RemoteFile>, ServiceError>;

    /// Upload raw bytes as a storage blob, returning the storage id.
    async fn upload_storage(&self, file_name: &str, content: &[u8]) -> Result<i64, ServiceError>;

    async fn create_file(&self, project_id: i64, req: NewFile) -> Result<RemoteFile, ServiceError>;

    async fn update_file(&self, project_id: i64, req: FileUpdate)
        -> Result<RemoteFile, ServiceError>;

    /// Build a translated export and return the URL it can be fetched from.
    async fn build_file_translation(
        &self,
        project_id: i64,
        req: ExportRequest,
    ) -> Result<String, ServiceError>;

    /// Fetch the body of a previously built export.
    async fn fetch_export(&self, url: &str) -> Result<String, ServiceError>;

    /// Source strings whose identifier matches exactly.
    async fn find_strings(
        &self,
        project_id: i64,
        identifier: &str,
    ) -> Result<Vec<SourceString>, ServiceError>;

    async fn create_string(
        &self,
        project_id: i64,
        req: NewSourceString,
    ) -> Result<SourceString, ServiceError>;

    async fn update_string(
        &self,
        project_id: i64,
        req: SourceStringUpdate,
    ) -> Result<SourceString, ServiceError>;

    /// Translations of a string into a language, ordered by rating descending.
    async fn list_translations(
        &self,
        project_id: i64,
        string_id: i64,
        language_id: &str,
    ) -> Result<Vec<Translation>, ServiceError>;

    async fn list_approvals(
        &self,
        project_id: i64,
        string_id: i64,
        language_id: &str,
    ) -> Result<Vec<Approval>, ServiceError>;

    async fn get_translation(
        &self,
        project_id: i64,
        translation_id: i64,
    ) -> Result<Translation, ServiceError>;
}
