#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;

use async_trait::async_trait;
use crowdin_sync_core::contract::ProjectLanguages;
use crowdin_sync_core::record::{LocalizedRecord, RecordStore, StoreError};

/// A record with two translatable fields and an optional note used as context.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Product {
    pub id: i64,
    pub title: BTreeMap<String, String>,
    pub body: BTreeMap<String, String>,
    pub note: Option<String>,
}

impl Product {
    pub fn new(id: i64, title_en: &str) -> Self {
        let mut title = BTreeMap::new();
        title.insert("en".to_string(), title_en.to_string());
        Self {
            id,
            title,
            ..Default::default()
        }
    }

    fn field(&self, field: &str) -> Option<&BTreeMap<String, String>> {
        match field {
            "title" => Some(&self.title),
            "body" => Some(&self.body),
            _ => None,
        }
    }
}

impl LocalizedRecord for Product {
    fn record_key(&self) -> String {
        self.id.to_string()
    }

    fn translation(&self, field: &str, language: &str) -> Option<String> {
        self.field(field).and_then(|m| m.get(language)).cloned()
    }

    fn set_translation(&mut self, field: &str, language: &str, text: String) {
        let map = match field {
            "title" => &mut self.title,
            "body" => &mut self.body,
            _ => return,
        };
        map.insert(language.to_string(), text);
    }

    fn context(&self) -> Option<String> {
        self.note.clone()
    }
}

/// Records kept in memory, paged in id order.
pub struct MemoryStore {
    pub rows: Mutex<Vec<Product>>,
    pub fields: Option<Vec<String>>,
    pub saves: Mutex<usize>,
}

impl MemoryStore {
    pub fn new(rows: Vec<Product>) -> Self {
        Self {
            rows: Mutex::new(rows),
            fields: None,
            saves: Mutex::new(0),
        }
    }

    pub fn translatable(mut self, fields: &[&str]) -> Self {
        self.fields = Some(fields.iter().map(|f| f.to_string()).collect());
        self
    }

    pub fn get(&self, id: i64) -> Product {
        self.rows
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.id == id)
            .cloned()
            .expect("record exists")
    }

    pub fn save_count(&self) -> usize {
        *self.saves.lock().unwrap()
    }
}

#[async_trait]
impl RecordStore for MemoryStore {
    type Record = Product;

    fn record_type(&self) -> &str {
        "Product"
    }

    fn translatable_fields(&self) -> Option<Vec<String>> {
        self.fields.clone()
    }

    async fn chunk(&self, page: usize, size: usize) -> Result<Vec<Product>, StoreError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows.iter().skip(page * size).take(size).cloned().collect())
    }

    async fn save(&self, record: &Product) -> Result<(), StoreError> {
        let mut rows = self.rows.lock().unwrap();
        if let Some(existing) = rows.iter_mut().find(|p| p.id == record.id) {
            *existing = record.clone();
        }
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

pub fn languages(source: &str, targets: &[&str]) -> ProjectLanguages {
    ProjectLanguages {
        source_language_id: source.to_string(),
        target_language_ids: targets.iter().map(|t| t.to_string()).collect(),
    }
}
