#![doc = "Crowdin API v2 client implementing the core `TranslationService` trait."]
//
//! # Crowdin client (CLI <-> Core)
//!
//! This module wires the [`TranslationService`] contract from
//! `crowdin-sync-core` to the Crowdin REST API v2 using `reqwest`.
//!
//! - Construct [`CrowdinClient`] from the environment (`CROWDIN_API_KEY`) or
//!   explicitly with a token and base URL (enterprise organisations use
//!   `https://{organization}.api.crowdin.com/api/v2`).
//! - List endpoints are paged transparently; callers always receive full lists.
//! - Export downloads go to pre-signed URLs and are fetched without the token.
//!
//! Every request is sent once. Failures are returned as [`CrowdinError`] boxed
//! into the core's `ServiceError`.

use std::future::Future;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;

use crowdin_sync_core::contract::{
    Approval, Directory, ExportRequest, FileUpdate, NewFile, NewSourceString, ProjectLanguages,
    RemoteFile, ServiceError, SourceString, SourceStringUpdate, Translation, TranslationService,
};

/// Largest page the API hands out.
const PAGE_LIMIT: usize = 500;

#[derive(Error, Debug)]
pub enum CrowdinError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Crowdin responded with {status} to {action}: {message}")]
    Api {
        status: u16,
        action: String,
        message: String,
    },

    #[error("CROWDIN_API_KEY missing in environment")]
    MissingToken,
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Deserialize)]
struct Page<T> {
    data: Vec<Envelope<T>>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiProject {
    source_language_id: String,
    target_language_ids: Vec<String>,
}

#[derive(Deserialize)]
struct ApiDirectory {
    id: i64,
    name: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiFile {
    id: i64,
    name: String,
    directory_id: Option<i64>,
}

#[derive(Deserialize)]
struct ApiStorage {
    id: i64,
}

#[derive(Deserialize)]
struct ApiDownload {
    url: String,
}

#[derive(Deserialize)]
struct ApiString {
    id: i64,
    #[serde(default)]
    identifier: String,
    text: Value,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Deserialize)]
struct ApiTranslation {
    id: i64,
    text: Value,
    #[serde(default)]
    rating: Option<i64>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiApproval {
    id: i64,
    translation_id: i64,
}

/// Plural strings arrive as objects; they are kept as their JSON text.
fn text_from_value(value: Value) -> String {
    match value {
        Value::String(s) => s,
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl From<ApiString> for SourceString {
    fn from(s: ApiString) -> Self {
        SourceString {
            id: s.id,
            identifier: s.identifier,
            text: text_from_value(s.text),
            context: s.context,
        }
    }
}

impl From<ApiTranslation> for Translation {
    fn from(t: ApiTranslation) -> Self {
        Translation {
            id: t.id,
            text: text_from_value(t.text),
            rating: t.rating.unwrap_or(0),
        }
    }
}

impl From<ApiFile> for RemoteFile {
    fn from(f: ApiFile) -> Self {
        RemoteFile {
            id: f.id,
            name: f.name,
            directory_id: f.directory_id,
        }
    }
}

/// Body of a string update: a JSON Patch document.
fn string_patch(req: &SourceStringUpdate) -> Value {
    let mut ops = vec![json!({ "op": "replace", "path": "/text", "value": req.text })];
    if let Some(context) = req.context.as_deref().filter(|c| !c.is_empty()) {
        ops.push(json!({ "op": "replace", "path": "/context", "value": context }));
    }
    Value::Array(ops)
}

pub struct CrowdinClient {
    http: Client,
    base_url: String,
    token: String,
}

impl CrowdinClient {
    pub fn new(base_url: &str, token: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    pub fn new_from_env(base_url: &str) -> Result<Self, ServiceError> {
        dotenvy::dotenv().ok();
        match std::env::var("CROWDIN_API_KEY") {
            Ok(token) if !token.trim().is_empty() => {
                tracing::info!(base_url, "Initialized CrowdinClient from environment");
                Ok(Self::new(base_url, token))
            }
            _ => {
                tracing::error!("CROWDIN_API_KEY missing in environment");
                Err(Box::new(CrowdinError::MissingToken))
            }
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Send an authenticated request and decode the `data` envelope.
    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        action: &str,
    ) -> Result<T, ServiceError> {
        let response = request
            .bearer_auth(&self.token)
            .send()
            .await
            .map_err(CrowdinError::from)?;
        let envelope: Envelope<T> = checked(response, action)
            .await?
            .json()
            .await
            .map_err(CrowdinError::from)?;
        Ok(envelope.data)
    }

    /// Fetch every page of a list endpoint.
    async fn list_all<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        action: &str,
    ) -> Result<Vec<T>, ServiceError> {
        let items = collect_pages(PAGE_LIMIT, |offset| {
            let request = self
                .http
                .get(self.url(path))
                .query(query)
                .query(&[("limit", PAGE_LIMIT), ("offset", offset)])
                .bearer_auth(&self.token);
            async move {
                let response = request.send().await.map_err(CrowdinError::from)?;
                let page: Page<T> = checked(response, action)
                    .await?
                    .json()
                    .await
                    .map_err(CrowdinError::from)?;
                Ok::<Vec<T>, ServiceError>(page.data.into_iter().map(|e| e.data).collect())
            }
        })
        .await?;
        tracing::debug!(action, count = items.len(), "Fetched list");
        Ok(items)
    }
}

/// Pass successful responses through; turn any other status into [`CrowdinError::Api`].
async fn checked(response: Response, action: &str) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response
        .text()
        .await
        .unwrap_or_else(|_| String::from("<Failed to decode response body>"));
    tracing::error!(status = %status, action, "Crowdin API returned error");
    Err(Box::new(CrowdinError::Api {
        status: status.as_u16(),
        action: action.to_string(),
        message,
    }))
}

/// Request pages at increasing offsets until one comes back shorter than `limit`.
async fn collect_pages<T, F, Fut>(limit: usize, mut fetch: F) -> Result<Vec<T>, ServiceError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Vec<T>, ServiceError>>,
{
    let mut items = Vec::new();
    let mut offset = 0;
    loop {
        let page = fetch(offset).await?;
        let count = page.len();
        items.extend(page);
        if count < limit {
            return Ok(items);
        }
        offset += limit;
    }
}

/// The strings filter is a substring search; keep exact identifier matches only.
fn exact_identifier(strings: Vec<ApiString>, identifier: &str) -> Vec<SourceString> {
    strings
        .into_iter()
        .filter(|s| s.identifier == identifier)
        .map(SourceString::from)
        .collect()
}

#[async_trait]
impl TranslationService for CrowdinClient {
    async fn project_languages(&self, project_id: i64) -> Result<ProjectLanguages, ServiceError> {
        let project: ApiProject = self
            .send(
                self.http.get(self.url(&format!("projects/{project_id}"))),
                "get project",
            )
            .await?;
        Ok(ProjectLanguages {
            source_language_id: project.source_language_id,
            target_language_ids: project.target_language_ids,
        })
    }

    async fn list_directories(&self, project_id: i64) -> Result<Vec<Directory>, ServiceError> {
        let dirs: Vec<ApiDirectory> = self
            .list_all(
                &format!("projects/{project_id}/directories"),
                &[],
                "list directories",
            )
            .await?;
        Ok(dirs
            .into_iter()
            .map(|d| Directory {
                id: d.id,
                name: d.name,
            })
            .collect())
    }

    async fn create_directory(
        &self,
        project_id: i64,
        name: &str,
    ) -> Result<Directory, ServiceError> {
        tracing::info!(project_id, name, "Creating directory");
        let dir: ApiDirectory = self
            .send(
                self.http
                    .post(self.url(&format!("projects/{project_id}/directories")))
                    .json(&json!({ "name": name })),
                "create directory",
            )
            .await?;
        Ok(Directory {
            id: dir.id,
            name: dir.name,
        })
    }

    async fn list_files(&self, project_id: i64) -> Result<Vec<RemoteFile>, ServiceError> {
        let files: Vec<ApiFile> = self
            .list_all(&format!("projects/{project_id}/files"), &[], "list files")
            .await?;
        Ok(files.into_iter().map(RemoteFile::from).collect())
    }

    async fn upload_storage(&self, file_name: &str, content: &[u8]) -> Result<i64, ServiceError> {
        let storage: ApiStorage = self
            .send(
                self.http
                    .post(self.url("storages"))
                    .header("Crowdin-API-FileName", file_name)
                    .header("Content-Type", "application/octet-stream")
                    .body(content.to_vec()),
                "upload storage",
            )
            .await?;
        tracing::debug!(file_name, storage_id = storage.id, "Uploaded storage");
        Ok(storage.id)
    }

    async fn create_file(&self, project_id: i64, req: NewFile) -> Result<RemoteFile, ServiceError> {
        tracing::info!(
            project_id,
            name = %req.name,
            directory_id = req.directory_id,
            "Creating file"
        );
        let file: ApiFile = self
            .send(
                self.http
                    .post(self.url(&format!("projects/{project_id}/files")))
                    .json(&json!({
                        "storageId": req.storage_id,
                        "name": req.name,
                        "directoryId": req.directory_id,
                    })),
                "create file",
            )
            .await?;
        Ok(file.into())
    }

    async fn update_file(
        &self,
        project_id: i64,
        req: FileUpdate,
    ) -> Result<RemoteFile, ServiceError> {
        tracing::info!(
            project_id,
            file_id = req.file_id,
            update_option = req.update_option.as_str(),
            "Updating file"
        );
        let file: ApiFile = self
            .send(
                self.http
                    .put(self.url(&format!("projects/{project_id}/files/{}", req.file_id)))
                    .json(&json!({
                        "storageId": req.storage_id,
                        "name": req.name,
                        "updateOption": req.update_option.as_str(),
                    })),
                "update file",
            )
            .await?;
        Ok(file.into())
    }

    async fn build_file_translation(
        &self,
        project_id: i64,
        req: ExportRequest,
    ) -> Result<String, ServiceError> {
        let download: ApiDownload = self
            .send(
                self.http
                    .post(self.url(&format!(
                        "projects/{project_id}/translations/builds/files/{}",
                        req.file_id
                    )))
                    .json(&json!({
                        "targetLanguageId": req.target_language_id,
                        "skipUntranslatedStrings": req.skip_untranslated_strings,
                        "exportApprovedOnly": req.export_approved_only,
                    })),
                "build file translation",
            )
            .await?;
        Ok(download.url)
    }

    async fn fetch_export(&self, url: &str) -> Result<String, ServiceError> {
        let response = self.http.get(url).send().await.map_err(CrowdinError::from)?;
        let body = checked(response, "download export")
            .await?
            .text()
            .await
            .map_err(CrowdinError::from)?;
        Ok(body)
    }

    async fn find_strings(
        &self,
        project_id: i64,
        identifier: &str,
    ) -> Result<Vec<SourceString>, ServiceError> {
        let strings: Vec<ApiString> = self
            .list_all(
                &format!("projects/{project_id}/strings"),
                &[
                    ("filter", identifier.to_string()),
                    ("scope", "identifier".to_string()),
                ],
                "list strings",
            )
            .await?;
        Ok(exact_identifier(strings, identifier))
    }

    async fn create_string(
        &self,
        project_id: i64,
        req: NewSourceString,
    ) -> Result<SourceString, ServiceError> {
        let mut body = json!({
            "identifier": req.identifier,
            "text": req.text,
        });
        if let Some(branch_id) = req.branch_id {
            body["branchId"] = json!(branch_id);
        }
        if let Some(context) = req.context.as_deref().filter(|c| !c.is_empty()) {
            body["context"] = json!(context);
        }
        let string: ApiString = self
            .send(
                self.http
                    .post(self.url(&format!("projects/{project_id}/strings")))
                    .json(&body),
                "create string",
            )
            .await?;
        Ok(string.into())
    }

    async fn update_string(
        &self,
        project_id: i64,
        req: SourceStringUpdate,
    ) -> Result<SourceString, ServiceError> {
        let string: ApiString = self
            .send(
                self.http
                    .patch(self.url(&format!("projects/{project_id}/strings/{}", req.string_id)))
                    .json(&string_patch(&req)),
                "update string",
            )
            .await?;
        Ok(string.into())
    }

    async fn list_translations(
        &self,
        project_id: i64,
        string_id: i64,
        language_id: &str,
    ) -> Result<Vec<Translation>, ServiceError> {
        let translations: Vec<ApiTranslation> = self
            .list_all(
                &format!("projects/{project_id}/translations"),
                &[
                    ("stringId", string_id.to_string()),
                    ("languageId", language_id.to_string()),
                    ("orderBy", "rating desc".to_string()),
                ],
                "list translations",
            )
            .await?;
        Ok(translations.into_iter().map(Translation::from).collect())
    }

    async fn list_approvals(
        &self,
        project_id: i64,
        string_id: i64,
        language_id: &str,
    ) -> Result<Vec<Approval>, ServiceError> {
        let approvals: Vec<ApiApproval> = self
            .list_all(
                &format!("projects/{project_id}/approvals"),
                &[
                    ("stringId", string_id.to_string()),
                    ("languageId", language_id.to_string()),
                ],
                "list approvals",
            )
            .await?;
        Ok(approvals
            .into_iter()
            .map(|a| Approval {
                id: a.id,
                translation_id: a.translation_id,
            })
            .collect())
    }

    async fn get_translation(
        &self,
        project_id: i64,
        translation_id: i64,
    ) -> Result<Translation, ServiceError> {
        let translation: ApiTranslation = self
            .send(
                self.http.get(self.url(&format!(
                    "projects/{project_id}/translations/{translation_id}"
                ))),
                "get translation",
            )
            .await?;
        Ok(translation.into())
    }
}
