//! Build-time schema snapshot generator for docschema.
//!
//! This crate scans your source files for structs marked with `#[store]`,
//! synthesizes their schema models and writes one `<record>.schema.json`
//! file per record. Any fatal schema error fails the build.
//!
//! # Example
//!
//! In your `build.rs`:
//!
//! ```ignore
//! fn main() {
//!     docschema_build::generate_models()
//!         .scan_path("src/")
//!         .output_dir("schemas/")
//!         .run()
//!         .expect("Failed to generate schema models");
//!
//!     println!("cargo:rerun-if-changed=src/");
//! }
//! ```

mod generator;
mod scanner;

pub use generator::{GenerationSummary, ModelGenerator};

/// Create a new model generator with default settings.
///
/// # Example
///
/// ```ignore
/// docschema_build::generate_models()
///     .scan_path("src/models")
///     .run()
///     .expect("Failed to generate schema models");
/// ```
pub fn generate_models() -> ModelGenerator {
    ModelGenerator::new()
}
