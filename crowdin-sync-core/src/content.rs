//! Content pipeline: record fields up as source strings, selected translations back down.
//!
//! Every translatable field of every record becomes one remote source string,
//! correlated through a stable identifier (see [`identifier`]). Records are
//! walked page by page so memory stays bounded on large tables.
//!
//! # Reconciliation rules
//! - Upload: no match creates a string; exactly one match is updated only when
//!   text or context changed; several matches are an anomaly and are logged,
//!   not touched.
//! - Download: the identifier must resolve to exactly one string, otherwise
//!   the field is skipped. Per language either the approved translation or the
//!   highest-rated one is applied; with nothing to apply, the field keeps its
//!   current value.

use tracing::{debug, info, warn};

use crate::config::ContentSyncSettings;
use crate::contract::{
    NewSourceString, ProjectLanguages, SourceStringUpdate, Translation, TranslationService,
};
use crate::error::SyncError;
use crate::record::{LocalizedRecord, RecordStore};

/// Produces the source text of a field from a record and the source language.
pub type UploadTransform<R> = Box<dyn Fn(&R, &str) -> Option<String> + Send + Sync>;
/// Applies a downloaded translation (language, text) to a record.
pub type DownloadTransform<R> = Box<dyn Fn(&mut R, &str, String) + Send + Sync>;
/// Derives the string context for a record.
pub type ContextFn<R> = Box<dyn Fn(&R) -> Option<String> + Send + Sync>;

/// Stable key tying a record field to its remote source string: `name.field[key]`.
pub fn identifier(name: &str, field: &str, key: &str) -> String {
    format!("{name}.{field}[{key}]")
}

/// A field synced either straight through the record's per-language values or
/// through explicit transforms.
pub enum Field<R> {
    Direct(String),
    Transformed {
        name: String,
        upload: UploadTransform<R>,
        download: DownloadTransform<R>,
    },
}

impl<R> Field<R> {
    pub fn direct(name: impl Into<String>) -> Self {
        Field::Direct(name.into())
    }

    pub fn transformed<U, D>(name: impl Into<String>, upload: U, download: D) -> Self
    where
        U: Fn(&R, &str) -> Option<String> + Send + Sync + 'static,
        D: Fn(&mut R, &str, String) + Send + Sync + 'static,
    {
        Field::Transformed {
            name: name.into(),
            upload: Box::new(upload),
            download: Box::new(download),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Field::Direct(name) => name,
            Field::Transformed { name, .. } => name,
        }
    }
}

/// Which fields of a record type are synced.
pub enum FieldSelection<R> {
    /// Use the fields the record store declares as translatable.
    Auto,
    Explicit(Vec<Field<R>>),
}

/// A logical group of records synced under one identifier prefix.
pub struct ContentResource<R> {
    pub name: String,
    pub fields: FieldSelection<R>,
    /// Overrides [`LocalizedRecord::context`] when set.
    pub context: Option<ContextFn<R>>,
}

impl<R> ContentResource<R> {
    /// Resource whose fields are discovered from the record store.
    pub fn auto(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: FieldSelection::Auto,
            context: None,
        }
    }

    pub fn with_fields(name: impl Into<String>, fields: Vec<Field<R>>) -> Self {
        Self {
            name: name.into(),
            fields: FieldSelection::Explicit(fields),
            context: None,
        }
    }

    pub fn with_context<F>(mut self, context: F) -> Self
    where
        F: Fn(&R) -> Option<String> + Send + Sync + 'static,
    {
        self.context = Some(Box::new(context));
        self
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ContentSyncReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    /// Identifiers that matched more than one remote string on upload.
    pub ambiguous: usize,
    /// Fields skipped on download because their identifier did not resolve to one string.
    pub unresolved: usize,
    /// Translations written onto records.
    pub applied: usize,
    pub saved: usize,
}

/// A field after selection, borrowing its transforms from the resource.
struct FieldPlan<'r, R> {
    name: String,
    upload: Option<&'r UploadTransform<R>>,
    download: Option<&'r DownloadTransform<R>>,
}

fn plan_fields<'r, St>(
    store: &St,
    resource: &'r ContentResource<St::Record>,
) -> Result<Vec<FieldPlan<'r, St::Record>>, SyncError>
where
    St: RecordStore,
{
    match &resource.fields {
        FieldSelection::Auto => {
            let fields = store
                .translatable_fields()
                .filter(|f| !f.is_empty())
                .ok_or_else(|| SyncError::NotTranslatable(store.record_type().to_string()))?;
            Ok(fields
                .into_iter()
                .map(|name| FieldPlan {
                    name,
                    upload: None,
                    download: None,
                })
                .collect())
        }
        FieldSelection::Explicit(fields) => Ok(fields
            .iter()
            .map(|field| match field {
                Field::Direct(name) => FieldPlan {
                    name: name.clone(),
                    upload: None,
                    download: None,
                },
                Field::Transformed {
                    name,
                    upload,
                    download,
                } => FieldPlan {
                    name: name.clone(),
                    upload: Some(upload),
                    download: Some(download),
                },
            })
            .collect()),
    }
}

pub struct ContentPipeline<'a, S: ?Sized> {
    service: &'a S,
    settings: ContentSyncSettings,
    languages: ProjectLanguages,
}

impl<'a, S> ContentPipeline<'a, S>
where
    S: TranslationService + ?Sized,
{
    /// Fetch the languages of the content project.
    pub async fn open(service: &'a S, settings: ContentSyncSettings) -> Result<Self, SyncError> {
        let languages = service.project_languages(settings.project_id).await?;
        info!(
            project_id = settings.project_id,
            source_language = %languages.source_language_id,
            targets = languages.target_language_ids.len(),
            "Prepared content pipeline"
        );
        Ok(Self {
            service,
            settings,
            languages,
        })
    }

    fn chunk_size(&self) -> usize {
        self.settings.chunk_size.max(1)
    }

    pub async fn sync_content<St>(
        &self,
        store: &St,
        resource: &ContentResource<St::Record>,
    ) -> Result<ContentSyncReport, SyncError>
    where
        St: RecordStore,
    {
        let uploaded = self.upload_content(store, resource).await?;
        let downloaded = self.download_content(store, resource).await?;
        Ok(ContentSyncReport {
            applied: downloaded.applied,
            saved: downloaded.saved,
            unresolved: downloaded.unresolved,
            ..uploaded
        })
    }

    pub async fn upload_content<St>(
        &self,
        store: &St,
        resource: &ContentResource<St::Record>,
    ) -> Result<ContentSyncReport, SyncError>
    where
        St: RecordStore,
    {
        let fields = plan_fields(store, resource)?;
        let source_language = self.languages.source_language_id.as_str();
        let size = self.chunk_size();
        let mut report = ContentSyncReport::default();

        info!(resource = %resource.name, record_type = store.record_type(), "Uploading content");
        let mut page = 0;
        loop {
            let rows = store.chunk(page, size).await.map_err(SyncError::Store)?;
            let count = rows.len();

            for row in &rows {
                let key = row.record_key();
                let context = match &resource.context {
                    Some(context) => context(row),
                    None => row.context(),
                }
                .filter(|c| !c.is_empty());

                for field in &fields {
                    let id = identifier(&resource.name, &field.name, &key);
                    let source = match field.upload {
                        Some(upload) => upload(row, source_language),
                        None => row.translation(&field.name, source_language),
                    };
                    let Some(source) = source.filter(|s| !s.is_empty()) else {
                        continue;
                    };
                    self.upload_string(&id, source, context.clone(), &mut report)
                        .await?;
                }
            }

            if count < size {
                break;
            }
            page += 1;
        }

        info!(
            resource = %resource.name,
            created = report.created,
            updated = report.updated,
            unchanged = report.unchanged,
            ambiguous = report.ambiguous,
            "Uploaded content"
        );
        Ok(report)
    }

    async fn upload_string(
        &self,
        id: &str,
        text: String,
        context: Option<String>,
        report: &mut ContentSyncReport,
    ) -> Result<(), SyncError> {
        let project_id = self.settings.project_id;
        let existing = self.service.find_strings(project_id, id).await?;

        match existing.as_slice() {
            [] => {
                debug!(identifier = id, characters = text.chars().count(), "Adding string");
                self.service
                    .create_string(
                        project_id,
                        NewSourceString {
                            branch_id: self.settings.branch_id,
                            identifier: id.to_string(),
                            text,
                            context,
                        },
                    )
                    .await?;
                report.created += 1;
            }
            [string] => {
                let same_context =
                    string.context.as_deref().unwrap_or("") == context.as_deref().unwrap_or("");
                if string.text == text && same_context {
                    debug!(identifier = id, "No update required (unchanged)");
                    report.unchanged += 1;
                    return Ok(());
                }
                debug!(identifier = id, characters = text.chars().count(), "Updating string");
                self.service
                    .update_string(
                        project_id,
                        SourceStringUpdate {
                            string_id: string.id,
                            text,
                            context,
                        },
                    )
                    .await?;
                report.updated += 1;
            }
            matches => {
                warn!(
                    identifier = id,
                    matches = matches.len(),
                    "Identifier matches several source strings, leaving them untouched"
                );
                report.ambiguous += 1;
            }
        }
        Ok(())
    }

    pub async fn download_content<St>(
        &self,
        store: &St,
        resource: &ContentResource<St::Record>,
    ) -> Result<ContentSyncReport, SyncError>
    where
        St: RecordStore,
    {
        let fields = plan_fields(store, resource)?;
        let project_id = self.settings.project_id;
        let size = self.chunk_size();
        let mut report = ContentSyncReport::default();

        info!(resource = %resource.name, record_type = store.record_type(), "Downloading content");
        let mut page = 0;
        loop {
            let rows = store.chunk(page, size).await.map_err(SyncError::Store)?;
            let count = rows.len();

            for mut row in rows {
                let key = row.record_key();

                for field in &fields {
                    let id = identifier(&resource.name, &field.name, &key);
                    let strings = self.service.find_strings(project_id, &id).await?;
                    let [string] = strings.as_slice() else {
                        debug!(
                            identifier = %id,
                            matches = strings.len(),
                            "Skipping field (identifier not unique)"
                        );
                        report.unresolved += 1;
                        continue;
                    };

                    for language in &self.languages.target_language_ids {
                        let selected = self.select_translation(string.id, language, &id).await?;
                        let Some(translation) = selected else {
                            continue;
                        };
                        debug!(
                            identifier = %id,
                            language = %language,
                            characters = translation.text.chars().count(),
                            "Updating translation"
                        );
                        match field.download {
                            Some(download) => {
                                download(&mut row, language.as_str(), translation.text)
                            }
                            None => row.set_translation(&field.name, language, translation.text),
                        }
                        report.applied += 1;
                    }
                }

                store.save(&row).await.map_err(SyncError::Store)?;
                report.saved += 1;
            }

            if count < size {
                break;
            }
            page += 1;
        }

        info!(
            resource = %resource.name,
            applied = report.applied,
            saved = report.saved,
            unresolved = report.unresolved,
            "Downloaded content"
        );
        Ok(report)
    }

    /// The approved translation when approvals gate downloads, else the
    /// highest-rated one. Ties keep the service's order.
    async fn select_translation(
        &self,
        string_id: i64,
        language: &str,
        id: &str,
    ) -> Result<Option<Translation>, SyncError> {
        let project_id = self.settings.project_id;

        if self.settings.approved_only {
            let approvals = self
                .service
                .list_approvals(project_id, string_id, language)
                .await?;
            let Some(approval) = approvals.first() else {
                debug!(identifier = id, language, "Skipping language (no approved translation)");
                return Ok(None);
            };
            let translation = self
                .service
                .get_translation(project_id, approval.translation_id)
                .await?;
            return Ok(Some(translation));
        }

        let translations = self
            .service
            .list_translations(project_id, string_id, language)
            .await?;
        let best = translations.into_iter().fold(None, |best: Option<Translation>, t| match best {
            Some(b) if b.rating >= t.rating => Some(b),
            _ => Some(t),
        });
        if best.is_none() {
            debug!(identifier = id, language, "Skipping language (no translation)");
        }
        Ok(best)
    }
}
