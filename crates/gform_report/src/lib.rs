//! Presentation layer for the group-formation engine: maps a canonical
//! `RunResult` JSON value into a stable, human-readable `ReportModel` and
//! renders it back to JSON. Reads artifacts only — no recomputation, and no
//! dependency on `gform_core`/`gform_io`'s concrete types, so the renderer
//! stays usable against any JSON shape a future engine version emits.

#[cfg(feature = "render_json")]
pub mod model;
#[cfg(feature = "render_json")]
pub mod render_json;

#[cfg(feature = "render_json")]
pub use model::{build_model, GroupSummary, ReportModel, RunSummary};
#[cfg(feature = "render_json")]
pub use render_json::render_report_json;
