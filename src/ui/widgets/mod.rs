// src/ui/widgets/mod.rs
//! Custom widgets for the levelscope UI.

pub mod spectrum;
pub mod status_panel;

// Re-export widget rendering types
pub use spectrum::SpectrumRenderer;
pub use status_panel::{render_status_panel, StatusInfo};
