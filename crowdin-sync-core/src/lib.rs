#![doc = "crowdin-sync-core: reconciliation logic for localization sync with Crowdin."]

//! This crate contains the pipelines, contracts and rules that keep local
//! localization content in step with a Crowdin project.
//!
//! Two pipelines share a handful of primitives:
//! - [`files`]: uploads whole language files and writes translated copies back
//!   into per-language folders.
//! - [`content`]: uploads translatable record fields as individual source strings
//!   and writes selected translations back onto the records.
//!
//! The remote service is reached only through [`contract::TranslationService`];
//! local records only through [`record::RecordStore`]. Concrete implementations
//! (HTTP client, SQLite store) live in the `crowdin-sync` crate.

pub mod config;
pub mod content;
pub mod contract;
pub mod error;
pub mod files;
pub mod placeholder;
pub mod record;
pub mod resolver;
