//! Core contracts shared by every sitcorpus stage.
//!
//! This crate defines the category catalog, document plans, the mapping
//! ledger that threads the pipeline, and the representation trait used to
//! turn rendered text into artifacts and back.

pub mod atomic;
pub mod catalog;
pub mod document;
pub mod error;
pub mod ledger;
pub mod paths;
pub mod representation;

pub use atomic::{write_bytes_atomic, write_json_atomic};
pub use catalog::{Category, ValueKind, find_category};
pub use document::{Confidence, DocumentFormat, DocumentPlan, Label, SitAssignment};
pub use error::{Error, Result};
pub use ledger::{BASE_COLUMNS, MappingLedger, MappingRow};
pub use paths::CorpusPaths;
pub use representation::{
    Attachment, EmlMessage, PlainText, RenderedDocument, Representation,
    default_representations, representation_for_path,
};

/// Current contract version recorded in `meta.json` artifacts.
pub const MANIFEST_VERSION: &str = "0.1";
