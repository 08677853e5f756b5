//! Offline grayscale descriptor used when the vision model is unavailable

use image::imageops::FilterType;
use image::DynamicImage;

use crate::config::{FALLBACK_DIMS, FALLBACK_SIZE};

#[derive(Debug, Clone, Copy)]
pub struct FallbackDescriptor {
	size: u32,
	dims: usize,
}

impl Default for FallbackDescriptor {
	fn default() -> Self {
		Self::new(FALLBACK_SIZE, FALLBACK_DIMS)
	}
}

impl FallbackDescriptor {
	pub fn new(size: u32, dims: usize) -> Self {
		Self {
			size: size.max(1),
			dims,
		}
	}

	pub fn dims(&self) -> usize {
		self.dims
	}

	/// Cover-crop to a square, drop alpha, grayscale, then block-average
	pub fn describe(&self, image: &DynamicImage) -> Vec<f32> {
		let gray = image
			.resize_to_fill(self.size, self.size, FilterType::Lanczos3)
			.to_luma8();
		reduce(gray.as_raw(), self.dims)
	}
}

/// Block-average normalized intensities into `out_dims` buckets.
///
/// Every bucket is divided by the nominal block size, even the last one when
/// the input does not split evenly; indices past the last bucket are dropped.
/// Existing persisted vectors depend on this exact arithmetic.
pub fn reduce(pixels: &[u8], out_dims: usize) -> Vec<f32> {
	let mut sums = vec![0.0f64; out_dims];
	if out_dims == 0 {
		return Vec::new();
	}

	let block = (pixels.len() / out_dims).max(1);
	for (i, &v) in pixels.iter().enumerate() {
		let idx = i / block;
		if idx < out_dims {
			sums[idx] += f64::from(v as f32 / 255.0);
		}
	}

	sums.into_iter().map(|s| (s / block as f64) as f32).collect()
}
