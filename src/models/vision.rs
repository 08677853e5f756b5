//! Vision model (ViT) for image embeddings

use anyhow::{bail, Context, Result};
use image::imageops::FilterType;
use image::DynamicImage;
use ndarray::Array4;
use ort::session::Session;
use std::path::Path;

use crate::config::{INPUT_SIZE, PIXEL_MEAN, PIXEL_STD};
use crate::runtime::Provider;

/// Anything that turns a decoded image into a raw feature vector
pub trait ImageEncoder: Send {
	fn encode(&mut self, image: &DynamicImage) -> Result<Vec<f32>>;
}

pub struct VisionModel {
	session: Session,
}

impl VisionModel {
	pub fn load(model_path: &Path, provider: Provider) -> Result<Self> {
		if !model_path.exists() {
			bail!("Vision model file does not exist: {}", model_path.display());
		}
		let session = crate::runtime::create_session(model_path, provider)
			.context("Failed to load vision model")?;
		Ok(Self { session })
	}
}

impl ImageEncoder for VisionModel {
	fn encode(&mut self, image: &DynamicImage) -> Result<Vec<f32>> {
		let pixels = preprocess(image);
		let input = ort::value::Value::from_array(pixels)?;

		let outputs = self.session.run(ort::inputs!["pixel_values" => input])?;
		let output = outputs
			.get("pooler_output")
			.or_else(|| outputs.get("last_hidden_state"))
			.context("No usable output in vision model")?;

		let (shape, data) = output.try_extract_tensor::<f32>()?;
		let dims: Vec<usize> = shape.iter().map(|&x| x as usize).collect();
		flatten_output(&dims, data)
	}
}

/// NCHW tensor, each channel scaled to [0,1] then standardized
fn preprocess(img: &DynamicImage) -> Array4<f32> {
	let resized = img.resize_exact(INPUT_SIZE, INPUT_SIZE, FilterType::CatmullRom);
	let rgb = resized.to_rgb8();
	let size = INPUT_SIZE as usize;

	let mut data = Array4::<f32>::zeros((1, 3, size, size));
	for (x, y, px) in rgb.enumerate_pixels() {
		for c in 0..3 {
			let v = px[c] as f32 / 255.0;
			data[[0, c, y as usize, x as usize]] = (v - PIXEL_MEAN) / PIXEL_STD;
		}
	}
	data
}

/// Collapse model output into one flat row
///
/// `[dim]` and `[1, dim]` are taken as-is; `[1, tokens, dim]` is mean-pooled.
pub(crate) fn flatten_output(dims: &[usize], data: &[f32]) -> Result<Vec<f32>> {
	match dims {
		[_] | [1, _] => Ok(data.to_vec()),
		[1, n, dim] if *n > 0 => {
			let mut pooled = vec![0.0; *dim];
			for token in data.chunks_exact(*dim).take(*n) {
				for (acc, v) in pooled.iter_mut().zip(token) {
					*acc += v;
				}
			}
			pooled.iter_mut().for_each(|v| *v /= *n as f32);
			Ok(pooled)
		}
		_ => bail!("Unexpected vision output shape: {:?}", dims),
	}
}
