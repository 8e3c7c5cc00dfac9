//! Clipforge Project Model
//!
//! The editable project graph and everything that persists or versions it:
//! - Tracks with a stable display order
//! - Media clips bound to their source providers
//! - Text overlay layers
//! - Render/export settings records
//! - Whole-state undo/redo history
//! - JSON project files

pub mod clip;
pub mod history;
pub mod ids;
pub mod project;
pub mod settings;
pub mod text;
pub mod timeline;
pub mod track;

pub use clip::*;
pub use history::*;
pub use ids::*;
pub use project::*;
pub use settings::*;
pub use text::*;
pub use timeline::*;
pub use track::*;
