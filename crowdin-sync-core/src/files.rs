//! File pipeline: language files up, translated language files down.
//!
//! The pipeline is opened once per run ([`FilePipeline::open`]), which fetches
//! the project languages and the remote file tree. Every operation afterwards
//! works against that prepared state.
//!
//! Local layout, for a mapping with `source = "lang"`:
//!
//! ```text
//! lang/en/messages.php   <- read, uploaded as {target}/messages.php
//! lang/de/messages.php   <- written from the German export
//! ```
//!
//! # Error Handling
//! Remote and filesystem failures end the run. Downloading a file that has no
//! remote counterpart is an error, never a silent skip.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::config::FileSyncSettings;
use crate::contract::{
    ExportRequest, FileUpdate, NewFile, ProjectLanguages, TranslationService,
};
use crate::error::SyncError;
use crate::placeholder;
use crate::resolver::{split_target, RemoteTree};

/// One local language folder mapped onto one remote folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileMapping {
    /// Local folder holding one sub-folder per language.
    pub source: PathBuf,
    /// Remote folder path the files are uploaded into.
    pub target: String,
    /// Only these file names are synced; empty means all files.
    #[serde(default)]
    pub include: Vec<String>,
}

/// A source-language file read from disk, placeholders already rewritten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedFile {
    /// Local folder holding the language sub-folders.
    pub source_root: PathBuf,
    pub file_name: String,
    /// Remote path: folder and file name.
    pub target: String,
    pub content: String,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FileSyncReport {
    pub created: usize,
    pub updated: usize,
    pub downloaded: usize,
}

pub struct FilePipeline<'a, S: ?Sized> {
    service: &'a S,
    settings: FileSyncSettings,
    base_dir: PathBuf,
    languages: ProjectLanguages,
    tree: RemoteTree,
}

impl<'a, S> FilePipeline<'a, S>
where
    S: TranslationService + ?Sized,
{
    /// Fetch languages and the remote file tree. `base_dir` is what relative
    /// mapping sources resolve against.
    pub async fn open(
        service: &'a S,
        settings: FileSyncSettings,
        base_dir: impl Into<PathBuf>,
    ) -> Result<Self, SyncError> {
        let languages = service.project_languages(settings.project_id).await?;
        info!(
            project_id = settings.project_id,
            source_language = %languages.source_language_id,
            targets = languages.target_language_ids.len(),
            "Prepared file pipeline"
        );
        let tree = RemoteTree::load(service, settings.project_id).await?;
        Ok(Self {
            service,
            settings,
            base_dir: base_dir.into(),
            languages,
            tree,
        })
    }

    pub fn tree(&self) -> &RemoteTree {
        &self.tree
    }

    /// Read every file directly under `{source}/{source language}/`.
    pub async fn prepare_filetree(
        &self,
        mapping: &FileMapping,
    ) -> Result<Vec<PreparedFile>, SyncError> {
        let source_root = self.base_dir.join(&mapping.source);
        let language_dir = source_root.join(&self.languages.source_language_id);
        debug!(path = %language_dir.display(), "Scanning source language folder");

        let mut entries = tokio::fs::read_dir(&language_dir)
            .await
            .map_err(|e| SyncError::io(&language_dir, e))?;
        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| SyncError::io(&language_dir, e))?
        {
            let path = entry.path();
            // Follows symlinks: a linked language file is synced like a plain one.
            let metadata = tokio::fs::metadata(&path)
                .await
                .map_err(|e| SyncError::io(&path, e))?;
            if metadata.is_dir() {
                debug!(path = %path.display(), "Skipping sub-folder");
                continue;
            }
            let name = entry
                .file_name()
                .into_string()
                .map_err(|_| SyncError::InvalidPath(path.clone()))?;
            names.push(name);
        }
        names.sort();

        let target_root = mapping.target.trim_end_matches('/');
        let mut prepared = Vec::with_capacity(names.len());
        for name in names {
            if !mapping.include.is_empty() && !mapping.include.contains(&name) {
                continue;
            }
            let path = language_dir.join(&name);
            let raw = tokio::fs::read_to_string(&path)
                .await
                .map_err(|e| SyncError::io(&path, e))?;
            prepared.push(PreparedFile {
                source_root: source_root.clone(),
                target: format!("{target_root}/{name}"),
                file_name: name,
                content: placeholder::to_remote(&raw),
            });
        }

        info!(
            source = %mapping.source.display(),
            files = prepared.len(),
            "Prepared source files"
        );
        Ok(prepared)
    }

    pub async fn upload_files(
        &mut self,
        mapping: &FileMapping,
    ) -> Result<FileSyncReport, SyncError> {
        let files = self.prepare_filetree(mapping).await?;
        self.upload_prepared(&files).await
    }

    pub async fn download_files(
        &mut self,
        mapping: &FileMapping,
    ) -> Result<FileSyncReport, SyncError> {
        let files = self.prepare_filetree(mapping).await?;
        self.download_prepared(&files).await
    }

    /// Upload, then download, the same set of files.
    pub async fn sync_files(&mut self, mapping: &FileMapping) -> Result<FileSyncReport, SyncError> {
        let files = self.prepare_filetree(mapping).await?;
        let uploaded = self.upload_prepared(&files).await?;
        let downloaded = self.download_prepared(&files).await?;
        Ok(FileSyncReport {
            created: uploaded.created,
            updated: uploaded.updated,
            downloaded: downloaded.downloaded,
        })
    }

    /// Store each file's content as a new blob and bind it to a new or existing remote file.
    pub async fn upload_prepared(
        &mut self,
        files: &[PreparedFile],
    ) -> Result<FileSyncReport, SyncError> {
        let mut report = FileSyncReport::default();
        let project_id = self.settings.project_id;

        for file in files {
            let (dir_path, file_name) = split_target(&file.target);
            let directory_id = self.tree.resolve_directory(self.service, dir_path).await?;
            let existing = self.tree.find_file(file_name, directory_id).map(|f| f.id);

            debug!(remote = %file.target, "Uploading file");
            let storage_id = self
                .service
                .upload_storage(file_name, file.content.as_bytes())
                .await?;

            let remote = match existing {
                None => {
                    let created = self
                        .service
                        .create_file(
                            project_id,
                            NewFile {
                                name: file_name.to_string(),
                                directory_id,
                                storage_id,
                            },
                        )
                        .await?;
                    report.created += 1;
                    created
                }
                Some(file_id) => {
                    let updated = self
                        .service
                        .update_file(
                            project_id,
                            FileUpdate {
                                file_id,
                                name: file_name.to_string(),
                                storage_id,
                                update_option: self.settings.update_option,
                            },
                        )
                        .await?;
                    report.updated += 1;
                    updated
                }
            };
            self.tree.record_file(remote);
        }

        info!(
            created = report.created,
            updated = report.updated,
            "Uploaded files"
        );
        Ok(report)
    }

    /// Export each file in every target language and write it into its language folder.
    pub async fn download_prepared(
        &mut self,
        files: &[PreparedFile],
    ) -> Result<FileSyncReport, SyncError> {
        let mut report = FileSyncReport::default();
        let project_id = self.settings.project_id;

        for file in files {
            let (dir_path, file_name) = split_target(&file.target);
            let directory_id = self.tree.resolve_directory(self.service, dir_path).await?;
            let file_id = self
                .tree
                .find_file(file_name, directory_id)
                .map(|f| f.id)
                .ok_or_else(|| SyncError::FileNotFound {
                    directory: dir_path.to_string(),
                    name: file_name.to_string(),
                })?;

            for language in &self.languages.target_language_ids {
                debug!(remote = %file.target, language = %language, "Downloading file");

                let url = self
                    .service
                    .build_file_translation(
                        project_id,
                        ExportRequest {
                            file_id,
                            target_language_id: language.clone(),
                            skip_untranslated_strings: true,
                            export_approved_only: self.settings.export_approved_only,
                        },
                    )
                    .await?;
                let body = self.service.fetch_export(&url).await?;
                let content = placeholder::prepare_download(&body);

                let folder = self.settings.language_folder.folder_for(language);
                let destination =
                    write_translation(&file.source_root, folder, &file.file_name, &content)
                        .await?;
                debug!(path = %destination.display(), "Wrote translated file");
                report.downloaded += 1;
            }
        }

        info!(downloaded = report.downloaded, "Downloaded files");
        Ok(report)
    }
}

async fn write_translation(
    source_root: &Path,
    folder: &str,
    file_name: &str,
    content: &str,
) -> Result<PathBuf, SyncError> {
    let dir = source_root.join(folder);
    tokio::fs::create_dir_all(&dir)
        .await
        .map_err(|e| SyncError::io(&dir, e))?;
    let path = dir.join(file_name);
    tokio::fs::write(&path, content)
        .await
        .map_err(|e| SyncError::io(&path, e))?;
    Ok(path)
}
