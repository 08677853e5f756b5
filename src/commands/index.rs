//! Index command - embed every catalog image

use anyhow::Result;
use colored::*;
use std::time::Instant;

use crate::engine::Engine;
use crate::processing;
use crate::ui;

pub async fn run(engine: &Engine, force: bool) -> Result<()> {
	let start = Instant::now();
	let builder = engine.builder();

	let with_images = processing::indexable(engine.catalog()).count();
	ui::info(&format!(
		"{} of {} parts have images",
		with_images,
		engine.catalog().len()
	));

	let index = match builder.current() {
		Some(existing) if !force => {
			ui::success(&format!(
				"Index already holds {} images. Use --force to rebuild.",
				existing.len()
			));
			existing
		}
		_ => builder.rebuild().await,
	};

	ui::header("Index");
	let signature = index
		.signature()
		.map(|s| s.to_string())
		.unwrap_or_else(|| "empty".to_string());
	println!("  {} {}", "Mode:".bright_blue().bold(), signature);
	println!("  {} {}", "Entries:".bright_blue().bold(), index.len());
	if let Some(built_at) = index.built_at() {
		println!(
			"  {} {}",
			"Built:".bright_blue().bold(),
			built_at.format("%Y-%m-%d %H:%M:%S UTC")
		);
	}
	if let Some(stats) = builder.last_stats() {
		println!(
			"  {} {} of {} images{}",
			"Embedded:".bright_blue().bold(),
			stats.indexed,
			stats.images,
			if stats.restarted { " (restarted after mode switch)".yellow().to_string() } else { String::new() }
		);
		if stats.skipped > 0 {
			ui::warn(&format!("{} images skipped (--verbose for details)", stats.skipped));
		}
	}
	println!();

	if index.is_empty() {
		ui::warn("Nothing was indexed; searches will return sample parts");
	}

	ui::success(&format!("Done in {:.1}s", start.elapsed().as_secs_f32()));
	Ok(())
}
