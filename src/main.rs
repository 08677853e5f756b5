//! partlens - visual auto-parts search
//!
//! Command-line front end: index catalog images, search by photo, and
//! browse the catalog.

use anyhow::Result;
use clap::Parser;
use std::path::Path;

use partlens::cli::{Cli, Command};
use partlens::config::{self, Settings};
use partlens::engine::{Engine, EngineOptions};
use partlens::storage::Catalog;
use partlens::{commands, ui};

#[tokio::main]
async fn main() {
	let cli = Cli::parse();
	ui::Log::set_verbose(cli.verbose);
	ui::Log::set_stderr_only(matches!(
		cli.command,
		Command::Search { json: true, .. }
			| Command::Parts { json: true, .. }
			| Command::Part { json: true, .. }
			| Command::Vin { json: true, .. }
	));

	if let Err(e) = run(cli).await {
		ui::error(&format!("{:#}", e));
		std::process::exit(1);
	}
}

async fn run(cli: Cli) -> Result<()> {
	if let Some(dir) = cli.models {
		config::set_model_dir(dir);
	}
	if let Some(file) = cli.vision {
		config::set_vision_model(file);
	}

	let mut settings = match cli.root {
		Some(root) => Settings::new(root),
		None => Settings::from_env_or(Path::new(".")),
	};
	ui::debug(&format!("Project root: {}", settings.root.display()));

	let options = EngineOptions {
		provider: cli.provider,
		fallback_only: cli.fallback_only,
		model_path: config::get_vision_model_path(),
	};

	match cli.command {
		Command::Index { force } => {
			print_header();
			let engine = Engine::open(settings, options)?;
			commands::index::run(&engine, force).await
		}
		Command::Search { image, limit, json } => {
			print_header();
			settings.limit = limit;
			let engine = Engine::open(settings, options)?;
			commands::search::run(&engine, &image, json).await
		}
		Command::Parts { query, json } => {
			let catalog = Catalog::load(&settings.parts_file())?;
			commands::parts::list(&catalog, query.as_deref(), json)
		}
		Command::Part { id, json } => {
			let catalog = Catalog::load(&settings.parts_file())?;
			commands::parts::show(&catalog, &id, json)
		}
		Command::Vin { vin, json } => {
			let catalog = Catalog::load(&settings.parts_file())?;
			commands::parts::vin(&catalog, &vin, json)
		}
	}
}

fn print_header() {
	ui::header(&format!("partlens v{}", env!("CARGO_PKG_VERSION")));
}
