use clap::builder::styling::{AnsiColor, Style, Styles};
use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use std::path::PathBuf;

/// Execution provider for ONNX Runtime
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Provider {
	/// Auto-detect best available (TensorRT → CUDA → CoreML → XNNPACK → CPU)
	#[default]
	Auto,
	/// CPU only
	Cpu,
	/// NVIDIA CUDA GPU
	Cuda,
	/// NVIDIA TensorRT (optimized inference)
	Tensorrt,
	/// Apple CoreML (macOS only)
	Coreml,
	/// XNNPACK (optimized CPU kernels)
	Xnnpack,
}

fn parse_limit(s: &str) -> Result<usize, String> {
	let val: usize = s.parse().map_err(|_| format!("'{}' is not a valid number", s))?;
	if val == 0 {
		Err("limit must be at least 1".to_string())
	} else {
		Ok(val)
	}
}

fn styles() -> Styles {
	Styles::styled()
		.header(Style::new().bold().fg_color(Some(AnsiColor::Blue.into())))
		.usage(Style::new().bold().fg_color(Some(AnsiColor::Blue.into())))
		.literal(Style::new().fg_color(Some(AnsiColor::Blue.into())))
		.placeholder(Style::new().fg_color(Some(AnsiColor::Yellow.into())))
		.valid(Style::new().fg_color(Some(AnsiColor::Blue.into())))
		.invalid(Style::new().fg_color(Some(AnsiColor::Red.into())))
}

#[derive(Parser, Debug)]
#[command(
	name = "partlens",
	author,
	version,
	about = "Find catalog parts that look like a photo",
	styles = styles(),
	after_help = format!(
		"{title}
  {bin} {index}   {index_args}                {index_desc}
  {bin} {search}  {search_args}   {search_desc}
  {bin} {parts}   {parts_args}             {parts_desc}
  {bin} {vin}     {vin_args} {vin_desc}",
		title = "Examples:".bright_blue().bold(),
		bin = "partlens".bright_blue(),
		index = "index".yellow(),
		index_args = "--force",
		index_desc = "Rebuild the embedding index".dimmed(),
		search = "search".yellow(),
		search_args = "photo.jpg -n 10",
		search_desc = "Parts that look like a photo".dimmed(),
		parts = "parts".yellow(),
		parts_args = "\"brake\"",
		parts_desc = "Filter the catalog".dimmed(),
		vin = "vin".yellow(),
		vin_args = "WVWZZZ1JZXW000001",
		vin_desc = "Parts for a vehicle".dimmed(),
	),
)]
pub struct Cli {
	/// Enable verbose debug output
	#[arg(short = 'v', long = "verbose", global = true)]
	pub verbose: bool,

	/// Project root holding data/, public/ and uploads/ (default: $PARTLENS_ROOT or .)
	#[arg(short = 'r', long = "root", global = true, value_name = "DIR")]
	pub root: Option<PathBuf>,

	/// Directory containing the vision model
	#[arg(short = 'm', long = "models", global = true, value_name = "DIR")]
	pub models: Option<PathBuf>,

	/// Vision model file, overriding the one found in the models directory
	#[arg(long = "vision", global = true, value_name = "FILE")]
	pub vision: Option<PathBuf>,

	/// Execution provider: auto, cpu, cuda, tensorrt, coreml, xnnpack
	#[arg(short = 'p', long = "provider", global = true, default_value = "auto")]
	pub provider: Provider,

	/// Skip the vision model and use the offline descriptor
	#[arg(long = "fallback-only", global = true)]
	pub fallback_only: bool,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Build the embedding index for all catalog images
	Index {
		/// Rebuild even if a persisted index exists
		#[arg(short = 'f', long = "force")]
		force: bool,
	},

	/// Find parts that look like a photo
	Search {
		/// Photo to search with
		#[arg(value_name = "IMAGE")]
		image: PathBuf,

		/// Number of results
		#[arg(short = 'n', long = "limit", default_value_t = crate::config::DEFAULT_LIMIT, value_parser = parse_limit)]
		limit: usize,

		/// Print the response as JSON
		#[arg(long = "json")]
		json: bool,
	},

	/// List catalog parts, optionally filtered by name, brand or OEM number
	Parts {
		/// Case-insensitive filter
		#[arg(value_name = "QUERY")]
		query: Option<String>,

		/// Print as JSON
		#[arg(long = "json")]
		json: bool,
	},

	/// Show one part by id
	Part {
		#[arg(value_name = "ID")]
		id: String,

		/// Print as JSON
		#[arg(long = "json")]
		json: bool,
	},

	/// Suggest parts for a vehicle identification number
	Vin {
		#[arg(value_name = "VIN")]
		vin: String,

		/// Print as JSON
		#[arg(long = "json")]
		json: bool,
	},
}

#[cfg(test)]
mod tests {
	use super::*;
	use clap::CommandFactory;

	#[test]
	fn cli_definition_is_valid() {
		Cli::command().debug_assert();
	}

	#[test]
	fn global_flags_parse_after_subcommand() {
		let cli = Cli::parse_from(["partlens", "search", "a.jpg", "--fallback-only", "-p", "cpu", "-n", "3"]);
		assert!(cli.fallback_only);
		assert_eq!(cli.provider, Provider::Cpu);
		match cli.command {
			Command::Search { image, limit, json } => {
				assert_eq!(image, PathBuf::from("a.jpg"));
				assert_eq!(limit, 3);
				assert!(!json);
			}
			other => panic!("unexpected command {:?}", other),
		}
	}

	#[test]
	fn vision_override_is_global() {
		let cli = Cli::parse_from(["partlens", "index", "--vision", "models/custom.onnx"]);
		assert_eq!(cli.vision, Some(PathBuf::from("models/custom.onnx")));
	}

	#[test]
	fn zero_limit_is_rejected() {
		assert!(Cli::try_parse_from(["partlens", "search", "a.jpg", "-n", "0"]).is_err());
	}
}
