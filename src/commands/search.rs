//! Search command - find parts that look like a photo

use anyhow::{bail, Result};
use colored::*;
use std::path::Path;
use std::time::Instant;

use super::parts::describe;
use crate::engine::{Engine, SearchResponse};
use crate::ui;

pub async fn run(engine: &Engine, image: &Path, json: bool) -> Result<()> {
	if !image.is_file() {
		bail!("Image not found: {}", image.display());
	}

	let start = Instant::now();
	ui::info(&format!("Searching by image: {}", ui::path_link(image, 50)));
	let response = engine.search_by_path(image).await?;

	if json {
		println!("{}", serde_json::to_string_pretty(&response)?);
		return Ok(());
	}

	print_response(&response);
	ui::success(&format!(
		"Found {} parts in {:.0}ms",
		response.results.len(),
		start.elapsed().as_millis()
	));
	Ok(())
}

fn print_response(response: &SearchResponse) {
	if let Some(warning) = &response.warning {
		ui::warn(warning);
	}

	ui::header(if response.degraded { "Sample parts" } else { "Results" });

	for (i, hit) in response.results.iter().enumerate() {
		let score = hit
			.score
			.map(|s| format!("{}%", (s * 100.0).round() as i32))
			.unwrap_or_default();

		println!(
			"{}. {} {}",
			format!("{:2}", i + 1).bright_blue().bold(),
			describe(&hit.item),
			score.dimmed()
		);
	}

	println!();
}
