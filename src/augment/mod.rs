//! Augmentation Filler
//!
//! Tops up an under-populated class folder to a target sample count. The
//! originals are copied unchanged into a fresh, uniquely-named sibling
//! directory, then augmented variants (drawn with replacement from the
//! originals) are synthesized until the target is reached.
//!
//! Failures abort the run with an error naming the offending path; files
//! written before the failure are left in place.

pub mod pipeline;

use std::fs;
use std::path::{Path, PathBuf};

use image::{DynamicImage, ImageReader};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::utils::error::{DataPrepError, Result};
use crate::utils::logging::ProgressLogger;
use crate::{DEFAULT_SEED, DEFAULT_TARGET_SAMPLES, IMAGE_EXTENSIONS};

use pipeline::AugmentationPolicy;

/// Configuration for a fill run
#[derive(Debug, Clone)]
pub struct FillConfig {
    /// Total sample count the output directory is topped up to
    pub target_samples: usize,
    /// Seed for reproducible sampling
    pub seed: u64,
}

impl Default for FillConfig {
    fn default() -> Self {
        Self {
            target_samples: DEFAULT_TARGET_SAMPLES,
            seed: DEFAULT_SEED,
        }
    }
}

/// Outcome of a fill run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillReport {
    /// The newly created directory holding originals plus augmented variants
    pub output_dir: PathBuf,
    pub originals_copied: usize,
    pub augmented_written: usize,
}

/// List the image files directly inside `input_dir`, sorted by path.
///
/// Only the last-dot extension is considered, so multi-dot names like
/// `leaf.v2.png` are matched correctly.
pub fn list_source_images(input_dir: &Path) -> Result<Vec<PathBuf>> {
    if !input_dir.is_dir() {
        return Err(DataPrepError::fs(
            input_dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        ));
    }

    let mut images: Vec<PathBuf> = WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.path().to_path_buf())
        .filter(|p| has_image_extension(p))
        .collect();
    images.sort();

    Ok(images)
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| IMAGE_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// Copy all originals from `input_dir` into a fresh `<base>_Aug_<suffix>`
/// directory under `output_root`, then synthesize augmented variants until
/// `config.target_samples` is reached.
///
/// Augmented files are named `aug{i}_{stem}.{ext}` with `i` counting up from
/// zero in draw order. A target at or below the original count produces no
/// augmented images. An empty source directory with a positive deficit is an
/// error.
pub fn fill_to_target(
    input_dir: &Path,
    output_root: &Path,
    policy: &AugmentationPolicy,
    config: &FillConfig,
) -> Result<FillReport> {
    let originals = list_source_images(input_dir)?;
    let deficit = config.target_samples.saturating_sub(originals.len());

    if deficit > 0 && originals.is_empty() {
        return Err(DataPrepError::NoSourceImages {
            dir: input_dir.to_path_buf(),
        });
    }

    let base = input_dir
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("class");
    let output_dir = tempfile::Builder::new()
        .prefix(&format!("{}_Aug_", base))
        .tempdir_in(output_root)
        .map_err(|e| DataPrepError::fs(output_root, e))?
        .into_path();

    info!(
        "Original directory: {:?}, augmented directory: {:?}",
        input_dir, output_dir
    );

    let mut progress = ProgressLogger::new("Copying originals", originals.len());
    for src in &originals {
        let file_name = src
            .file_name()
            .ok_or_else(|| {
                DataPrepError::fs(
                    src,
                    std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file name"),
                )
            })?;
        let dst = output_dir.join(file_name);
        fs::copy(src, &dst).map_err(|e| DataPrepError::fs(&dst, e))?;
        progress.increment();
    }
    progress.finish();

    let mut rng = ChaCha8Rng::seed_from_u64(config.seed);
    let mut progress = ProgressLogger::new("Augmenting", deficit);
    for index in 0..deficit {
        let src = originals.choose(&mut rng).ok_or_else(|| {
            DataPrepError::NoSourceImages {
                dir: input_dir.to_path_buf(),
            }
        })?;

        let decoded = ImageReader::open(src)
            .map_err(|e| DataPrepError::fs(src, e))?
            .decode()
            .map_err(|e| DataPrepError::codec(src, e))?;
        // Canonical working format: RGB8, regardless of what was decoded
        let canonical = DynamicImage::ImageRgb8(decoded.to_rgb8());
        let augmented = policy.apply(canonical, &mut rng);

        let name = augmented_file_name(src, index)?;
        let dst = output_dir.join(&name);
        debug!("Writing augmented sample {:?}", dst);
        augmented
            .save(&dst)
            .map_err(|e| DataPrepError::codec(&dst, e))?;
        progress.increment();
    }
    progress.finish();

    Ok(FillReport {
        output_dir,
        originals_copied: originals.len(),
        augmented_written: deficit,
    })
}

/// Build `aug{index}_{stem}.{ext}` from a source path, splitting on the last
/// dot only.
fn augmented_file_name(src: &Path, index: usize) -> Result<String> {
    let stem = src
        .file_stem()
        .and_then(|s| s.to_str())
        .ok_or_else(|| {
            DataPrepError::fs(
                src,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file stem"),
            )
        })?;
    let ext = src
        .extension()
        .and_then(|e| e.to_str())
        .ok_or_else(|| {
            DataPrepError::fs(
                src,
                std::io::Error::new(std::io::ErrorKind::InvalidInput, "no file extension"),
            )
        })?;
    Ok(format!("aug{}_{}.{}", index, stem, ext))
}
