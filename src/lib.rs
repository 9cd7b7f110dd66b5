//! # manuscript-forge – manuscript layout and vertical-writing PDF output
//!
//! Turns a manuscript (plain text plus typesetting settings) into a
//! print-ready PDF. The pipeline stages are:
//!
//! 1. **Validate** – check settings ranges and enumerations ([`settings`])
//! 2. **Geometry** – resolve page size, orientation and margins ([`geometry`])
//! 3. **Segment** – split content into paragraphs and lines ([`segment`])
//! 4. **Numerals** – mark short digit runs for upright setting ([`numerals`])
//! 5. **Columns** – plan column widths and gaps ([`columns`])
//! 6. **Estimate** – approximate the page count ([`estimate`])
//! 7. **Document** – assemble the layout document and render directive ([`document`])
//! 8. **Render** – flow glyphs onto pages and emit PDF bytes ([`flow`], [`render`])
//! 9. **Store** – write the result into the output directory ([`storage`])
//!
//! [`pipeline`] ties the stages into a request → response call, [`job`]
//! tracks background submissions, and a C-compatible FFI surface is exposed
//! via the [`ffi`] module.

pub mod columns;
pub mod document;
pub mod error;
pub mod estimate;
pub mod ffi;
pub mod flow;
pub mod fonts;
pub mod geometry;
pub mod job;
pub mod numerals;
pub mod pipeline;
pub mod render;
pub mod samples;
pub mod segment;
pub mod settings;
pub mod storage;

// Re-exports for convenience
pub use document::{build_layout, Layout, LayoutDocument, RenderDirective};
pub use error::{Error, Result};
pub use pipeline::{GenerationRequest, GenerationResponse, Pipeline, PipelineConfig};
pub use settings::ManuscriptSettings;
