//! # Waruna Dataset Preparation
//!
//! Data-preparation utilities for a region-annotated image-classification
//! dataset.
//!
//! ## Modules
//!
//! - `augment`: tops up an under-populated class folder to a target sample
//!   count by copying the originals into a fresh sibling directory and
//!   synthesizing augmented variants sampled with replacement
//! - `annotations`: merges per-source VIA region-annotation JSON files into
//!   one flat filename -> class mapping
//! - `utils`: error types and logging helpers
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use waruna_dataprep::{fill_to_target, AugmentationPolicy, FillConfig};
//!
//! let policy = AugmentationPolicy::default();
//! let report = fill_to_target(
//!     "data/waruna/Healthy".as_ref(),
//!     "data/waruna".as_ref(),
//!     &policy,
//!     &FillConfig::default(),
//! )?;
//! println!("created {:?}", report.output_dir);
//! ```

pub mod annotations;
pub mod augment;
pub mod utils;

// Re-export commonly used items for convenience
pub use annotations::{aggregate_annotations, aggregate_to_file, write_aggregated};
pub use augment::pipeline::AugmentationPolicy;
pub use augment::{fill_to_target, FillConfig, FillReport};
pub use utils::error::{DataPrepError, Result};

/// Default number of samples a class folder is topped up to
pub const DEFAULT_TARGET_SAMPLES: usize = 100;

/// Default RNG seed for reproducible sampling
pub const DEFAULT_SEED: u64 = 13;

/// File name of the aggregated annotation mapping (spelling kept from the
/// dataset's existing tooling)
pub const AGGREGATED_FILE_NAME: &str = "aggragatedAnnotations.txt";

/// Recognized image file extensions (matched case-insensitively against the
/// last-dot extension)
pub const IMAGE_EXTENSIONS: &[&str] = &[
    "bmp", "gif", "jpeg", "jpg", "png", "tif", "tiff", "webp",
];

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
