//! Augmentation Policy
//!
//! The default policy reproduces the dataset's established augmentation
//! chain: 90-degree rotations, brightness/contrast jitter, clipped histogram
//! equalization, horizontal flip, transpose, shift/scale/rotate jitter and a
//! small blur. Each step fires independently with its own probability, so two
//! draws from the same policy rarely look alike.
//!
//! The RNG is passed in per call; callers seed it explicitly so runs are
//! reproducible.

use image::{DynamicImage, Rgb, RgbImage};
use rand::Rng;

/// Randomized augmentation chain applied to sampled images
#[derive(Debug, Clone)]
pub struct AugmentationPolicy {
    /// Probability of rotating by a random multiple of 90 degrees
    pub rotate90_prob: f64,
    /// Probability of jittering brightness and contrast together
    pub brightness_contrast_prob: f64,
    /// Maximum brightness shift as a fraction of full scale
    pub brightness_limit: f32,
    /// Maximum contrast shift as a fraction
    pub contrast_limit: f32,
    /// Probability of clipped per-channel histogram equalization
    pub equalize_prob: f64,
    /// Histogram clip limit as a multiple of the mean bin height
    pub equalize_clip_limit: f32,
    /// Probability of a horizontal flip
    pub hflip_prob: f64,
    /// Probability of transposing the image (swap axes)
    pub transpose_prob: f64,
    /// Probability of combined shift/scale/rotate jitter
    pub shift_scale_rotate_prob: f64,
    /// Maximum shift as a fraction of each dimension
    pub shift_limit: f32,
    /// Maximum scale change as a fraction
    pub scale_limit: f32,
    /// Maximum rotation in degrees
    pub rotate_limit: f32,
    /// Probability of a small gaussian blur
    pub blur_prob: f64,
    /// Blur sigma (roughly a 3x3 kernel)
    pub blur_sigma: f32,
}

impl Default for AugmentationPolicy {
    fn default() -> Self {
        Self {
            rotate90_prob: 0.5,
            brightness_contrast_prob: 0.7,
            brightness_limit: 0.8,
            contrast_limit: 0.4,
            equalize_prob: 0.7,
            equalize_clip_limit: 4.0,
            hflip_prob: 0.7,
            transpose_prob: 0.5,
            shift_scale_rotate_prob: 0.75,
            shift_limit: 0.0625,
            scale_limit: 0.5,
            rotate_limit: 45.0,
            blur_prob: 0.5,
            blur_sigma: 0.8,
        }
    }
}

impl AugmentationPolicy {
    /// A policy where no step ever fires; useful for tests
    pub fn disabled() -> Self {
        Self {
            rotate90_prob: 0.0,
            brightness_contrast_prob: 0.0,
            equalize_prob: 0.0,
            hflip_prob: 0.0,
            transpose_prob: 0.0,
            shift_scale_rotate_prob: 0.0,
            blur_prob: 0.0,
            ..Self::default()
        }
    }

    /// Apply the chain to an image, drawing all randomness from `rng`
    pub fn apply(&self, img: DynamicImage, rng: &mut impl Rng) -> DynamicImage {
        let mut img = img;

        if rng.gen_bool(self.rotate90_prob) {
            // Factor 0 keeps the image as-is; all four factors are equally
            // likely.
            img = match rng.gen_range(0..=3u8) {
                1 => img.rotate90(),
                2 => img.rotate180(),
                3 => img.rotate270(),
                _ => img,
            };
        }

        if rng.gen_bool(self.brightness_contrast_prob) {
            let beta = rng.gen_range(-self.brightness_limit..=self.brightness_limit);
            let alpha = rng.gen_range(-self.contrast_limit..=self.contrast_limit);
            img = img.brighten((beta * 255.0) as i32);
            img = img.adjust_contrast(alpha * 100.0);
        }

        if rng.gen_bool(self.equalize_prob) {
            img = DynamicImage::ImageRgb8(equalize_clipped(
                &img.to_rgb8(),
                self.equalize_clip_limit,
            ));
        }

        if rng.gen_bool(self.hflip_prob) {
            img = img.fliph();
        }

        if rng.gen_bool(self.transpose_prob) {
            // transpose(x, y) = input(y, x)
            img = img.rotate90().fliph();
        }

        if rng.gen_bool(self.shift_scale_rotate_prob) {
            let angle = rng
                .gen_range(-self.rotate_limit..=self.rotate_limit)
                .to_radians();
            let scale = 1.0 + rng.gen_range(-self.scale_limit..=self.scale_limit);
            let (w, h) = (img.width() as f32, img.height() as f32);
            let dx = rng.gen_range(-self.shift_limit..=self.shift_limit) * w;
            let dy = rng.gen_range(-self.shift_limit..=self.shift_limit) * h;
            img = DynamicImage::ImageRgb8(warp_affine(&img.to_rgb8(), angle, scale, dx, dy));
        }

        if rng.gen_bool(self.blur_prob) {
            img = img.blur(self.blur_sigma);
        }

        img
    }
}

/// Per-channel histogram equalization with a clip limit.
///
/// Bins above `clip_limit` times the mean bin height are clipped and the
/// excess redistributed evenly, which bounds the contrast amplification the
/// equalization can introduce.
fn equalize_clipped(src: &RgbImage, clip_limit: f32) -> RgbImage {
    let (w, h) = src.dimensions();
    let total = (w as u64 * h as u64).max(1);
    let mut out = src.clone();

    for c in 0..3 {
        let mut hist = [0u64; 256];
        for p in src.pixels() {
            hist[p[c] as usize] += 1;
        }

        let cap = ((clip_limit * total as f32 / 256.0).max(1.0)) as u64;
        let mut excess = 0u64;
        for bin in hist.iter_mut() {
            if *bin > cap {
                excess += *bin - cap;
                *bin = cap;
            }
        }
        let bonus = excess / 256;
        for bin in hist.iter_mut() {
            *bin += bonus;
        }

        let sum: u64 = hist.iter().sum();
        let mut lut = [0u8; 256];
        let mut cum = 0u64;
        for (v, slot) in lut.iter_mut().enumerate() {
            cum += hist[v];
            *slot = ((cum * 255) / sum.max(1)) as u8;
        }

        for p in out.pixels_mut() {
            p[c] = lut[p[c] as usize];
        }
    }

    out
}

/// Rotate/scale about the image center, then shift, using inverse mapping
/// with bilinear sampling. Out-of-frame samples clamp to the nearest edge.
fn warp_affine(src: &RgbImage, angle: f32, scale: f32, dx: f32, dy: f32) -> RgbImage {
    let (w, h) = src.dimensions();
    let (cx, cy) = (w as f32 / 2.0, h as f32 / 2.0);
    let (sin, cos) = angle.sin_cos();
    let inv_scale = 1.0 / scale.max(f32::EPSILON);

    let mut out = RgbImage::new(w, h);
    for (x, y, px) in out.enumerate_pixels_mut() {
        let rx = x as f32 - cx - dx;
        let ry = y as f32 - cy - dy;
        let sx = (rx * cos + ry * sin) * inv_scale + cx;
        let sy = (-rx * sin + ry * cos) * inv_scale + cy;
        *px = sample_bilinear(src, sx, sy);
    }
    out
}

fn sample_bilinear(src: &RgbImage, x: f32, y: f32) -> Rgb<u8> {
    let (w, h) = src.dimensions();
    let x = x.clamp(0.0, (w - 1) as f32);
    let y = y.clamp(0.0, (h - 1) as f32);

    let x0 = x.floor() as u32;
    let y0 = y.floor() as u32;
    let x1 = (x0 + 1).min(w - 1);
    let y1 = (y0 + 1).min(h - 1);
    let fx = x - x0 as f32;
    let fy = y - y0 as f32;

    let p00 = src.get_pixel(x0, y0);
    let p10 = src.get_pixel(x1, y0);
    let p01 = src.get_pixel(x0, y1);
    let p11 = src.get_pixel(x1, y1);

    let mut out = [0u8; 3];
    for c in 0..3 {
        let top = p00[c] as f32 * (1.0 - fx) + p10[c] as f32 * fx;
        let bottom = p01[c] as f32 * (1.0 - fx) + p11[c] as f32 * fx;
        out[c] = (top * (1.0 - fy) + bottom * fy).round().clamp(0.0, 255.0) as u8;
    }
    Rgb(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn gradient_image(w: u32, h: u32) -> DynamicImage {
        let img = RgbImage::from_fn(w, h, |x, y| {
            Rgb([(x * 16) as u8, (y * 16) as u8, ((x + y) * 8) as u8])
        });
        DynamicImage::ImageRgb8(img)
    }

    #[test]
    fn test_disabled_policy_is_identity() {
        let policy = AugmentationPolicy::disabled();
        let img = gradient_image(8, 6);
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let out = policy.apply(img.clone(), &mut rng);
        assert_eq!(out.to_rgb8().as_raw(), img.to_rgb8().as_raw());
    }

    #[test]
    fn test_apply_is_deterministic_for_a_given_seed() {
        let policy = AugmentationPolicy::default();
        let img = gradient_image(16, 12);

        let mut rng_a = ChaCha8Rng::seed_from_u64(13);
        let mut rng_b = ChaCha8Rng::seed_from_u64(13);
        let out_a = policy.apply(img.clone(), &mut rng_a);
        let out_b = policy.apply(img, &mut rng_b);

        assert_eq!(out_a.to_rgb8().as_raw(), out_b.to_rgb8().as_raw());
    }

    #[test]
    fn test_rotate90_draws_all_four_factors() {
        let policy = AugmentationPolicy {
            rotate90_prob: 1.0,
            ..AugmentationPolicy::disabled()
        };
        let img = gradient_image(8, 8);
        let original = img.to_rgb8();

        let mut identity_seen = 0usize;
        let mut rotated_seen = 0usize;
        for seed in 0..200 {
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            let out = policy.apply(img.clone(), &mut rng);
            if out.to_rgb8().as_raw() == original.as_raw() {
                identity_seen += 1;
            } else {
                rotated_seen += 1;
            }
        }

        assert!(identity_seen > 0, "factor 0 never drawn");
        assert!(rotated_seen > 0, "factors 1..3 never drawn");
    }

    #[test]
    fn test_transpose_swaps_axes() {
        let img = gradient_image(8, 4);
        let transposed = img.rotate90().fliph().to_rgb8();
        assert_eq!(transposed.dimensions(), (4, 8));
        let src = img.to_rgb8();
        assert_eq!(transposed.get_pixel(1, 3), src.get_pixel(3, 1));
    }

    #[test]
    fn test_equalize_preserves_dimensions() {
        let src = gradient_image(10, 10).to_rgb8();
        let out = equalize_clipped(&src, 4.0);
        assert_eq!(out.dimensions(), src.dimensions());
    }

    #[test]
    fn test_equalize_uniform_image_stays_uniform() {
        let src = RgbImage::from_pixel(6, 6, Rgb([120, 120, 120]));
        let out = equalize_clipped(&src, 4.0);
        let first = out.get_pixel(0, 0);
        assert!(out.pixels().all(|p| p == first));
    }

    #[test]
    fn test_warp_identity_transform() {
        let src = gradient_image(8, 8).to_rgb8();
        let out = warp_affine(&src, 0.0, 1.0, 0.0, 0.0);
        assert_eq!(out.as_raw(), src.as_raw());
    }

    #[test]
    fn test_warp_preserves_dimensions() {
        let src = gradient_image(9, 5).to_rgb8();
        let out = warp_affine(&src, 0.5, 1.3, 1.0, -1.0);
        assert_eq!(out.dimensions(), (9, 5));
    }
}
