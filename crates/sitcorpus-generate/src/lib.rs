//! Render and post-process stages of the corpus pipeline.
//!
//! This crate consumes `meta.json` (the planned manifest) to write one text
//! file per document, extra e-mail representations and the merged mapping
//! ledger. Rendering is deterministic per `(seed, doc_id)`.

pub mod context;
pub mod engine;
pub mod errors;
pub mod generators;
pub mod model;
pub mod postprocess;
pub mod render;

pub use context::{GenerationContext, hash_seed};
pub use engine::{RenderEngine, RenderResult};
pub use errors::GenerationError;
pub use generators::{GeneratedValue, ValueGenerator, ValueLibrary, ValueOrigin};
pub use model::{GenerateOptions, GenerationIssue, GenerationReport, PostprocessReport};
pub use postprocess::{PostprocessResult, Postprocessor, attachment_for};
pub use render::{ContentRenderer, RenderedText, fill_to_target, word_count};
