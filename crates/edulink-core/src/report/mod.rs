//! Report assembly and rendering.
//!
//! - `aggregator`: runs a pass and produces one `Report` per child
//! - `lookups`: type descriptions and teachers for rendering
//! - `render`: turns a report into an HTML `Document`

pub mod aggregator;
pub mod lookups;
pub mod render;

pub use aggregator::{
    Account, ChildFailure, FailurePolicy, PassOptions, PassOutcome, PassStage, ReportAggregator,
};
pub use lookups::ReportLookups;
pub use render::{Document, HtmlRenderer, Renderer};
