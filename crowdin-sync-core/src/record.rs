//! # record: local persistence as seen by the content pipeline
//!
//! A [`RecordStore`] hands out records in pages and persists them again; a
//! [`LocalizedRecord`] exposes its key and per-language field values. Stores
//! that know which fields of their records are translatable say so through
//! [`RecordStore::translatable_fields`], which is what field auto-discovery
//! relies on.

use async_trait::async_trait;

/// Error returned by a record store.
pub type StoreError = Box<dyn std::error::Error + Send + Sync>;

/// A persisted record with translatable fields, each a map of language to text.
pub trait LocalizedRecord: Send {
    /// Primary key, already rendered as text.
    fn record_key(&self) -> String;

    /// Value of `field` in `language`, if present.
    fn translation(&self, field: &str, language: &str) -> Option<String>;

    fn set_translation(&mut self, field: &str, language: &str, text: String);

    /// Optional context attached to strings uploaded for this record.
    fn context(&self) -> Option<String> {
        None
    }
}

/// Paged access to all records of one type.
#[async_trait]
pub trait RecordStore: Send + Sync {
    type Record: LocalizedRecord;

    /// Human-readable name of the record type, used in logs and errors.
    fn record_type(&self) -> &str;

    /// Names of the translatable fields, or `None` when the record type does
    /// not declare them.
    fn translatable_fields(&self) -> Option<Vec<String>> {
        None
    }

    /// Page `page` (zero-based) of at most `size` records in stable key order.
    async fn chunk(&self, page: usize, size: usize) -> Result<Vec<Self::Record>, StoreError>;

    async fn save(&self, record: &Self::Record) -> Result<(), StoreError>;
}
