//! Asset loading
//!
//! Two assets feed the viewer: a glTF model and an equirectangular HDR
//! environment. Both load asynchronously through an [`AssetSource`] and
//! report progress through a shared [`ProgressTracker`].
//!
//! ## Module Structure
//!
//! - `source.rs` - AssetSource trait, FileSource, PendingLoad, progress
//! - `model.rs` - glTF document, buffers, images, materials, node flattening
//! - `environment.rs` - HDR decode and prefiltered lighting levels
//! - `error.rs` - AssetError

mod environment;
mod error;
mod model;
pub mod source;

pub use environment::{load_environment, EnvironmentMap};
pub use error::AssetError;
pub use model::load_model;
pub use source::{AssetSource, FileSource, PendingLoad, ProgressTracker};
