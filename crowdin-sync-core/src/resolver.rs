//! Maps local relative paths onto remote directory and file ids.
//!
//! [`RemoteTree`] is a snapshot of a project's directories and files taken once
//! per pipeline. Directories are created lazily; after each creation the whole
//! directory list is fetched again rather than patched locally.

use tracing::{debug, info};

use crate::contract::{Directory, RemoteFile, TranslationService};
use crate::error::SyncError;

#[derive(Debug, Clone)]
pub struct RemoteTree {
    project_id: i64,
    directories: Vec<Directory>,
    files: Vec<RemoteFile>,
}

impl RemoteTree {
    pub fn new(project_id: i64, directories: Vec<Directory>, files: Vec<RemoteFile>) -> Self {
        Self {
            project_id,
            directories,
            files,
        }
    }

    /// Fetch the directory and file lists of a project.
    pub async fn load<S>(service: &S, project_id: i64) -> Result<Self, SyncError>
    where
        S: TranslationService + ?Sized,
    {
        let directories = service.list_directories(project_id).await?;
        let files = service.list_files(project_id).await?;
        info!(
            project_id,
            directories = directories.len(),
            files = files.len(),
            "Loaded remote file tree"
        );
        Ok(Self::new(project_id, directories, files))
    }

    pub fn directories(&self) -> &[Directory] {
        &self.directories
    }

    pub fn files(&self) -> &[RemoteFile] {
        &self.files
    }

    /// Id of the directory named exactly `path`, creating it if absent.
    pub async fn resolve_directory<S>(&mut self, service: &S, path: &str) -> Result<i64, SyncError>
    where
        S: TranslationService + ?Sized,
    {
        if let Some(dir) = self.directories.iter().find(|d| d.name == path) {
            return Ok(dir.id);
        }

        let created = service.create_directory(self.project_id, path).await?;
        debug!(path, directory_id = created.id, "Created remote directory");

        self.directories = service.list_directories(self.project_id).await?;

        Ok(created.id)
    }

    /// First file named exactly `name` inside `directory_id`.
    pub fn find_file(&self, name: &str, directory_id: i64) -> Option<&RemoteFile> {
        self.files
            .iter()
            .find(|f| f.directory_id == Some(directory_id) && f.name == name)
    }

    /// Remember a file created or updated during this run.
    pub fn record_file(&mut self, file: RemoteFile) {
        match self.files.iter_mut().find(|f| f.id == file.id) {
            Some(existing) => *existing = file,
            None => self.files.push(file),
        }
    }
}

/// Split a remote target into its folder path and file name.
pub fn split_target(target: &str) -> (&str, &str) {
    match target.rsplit_once('/') {
        Some((path, file)) => (path, file),
        None => ("", target),
    }
}
