pub mod editing;
pub mod overlay;

// Re-export key types for easier usage
pub use editing::{Cmd, Document, Patch, Selection, SelectionSet, Span};
pub use overlay::{
    ExtractionStrategy, Overlay, OverlayEffect, OverlayEngine, OverlaySet, StyleClass,
};
