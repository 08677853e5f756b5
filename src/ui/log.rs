//! Unified logging system

use chrono::Local;
use colored::*;
use std::sync::atomic::{AtomicBool, Ordering};

static VERBOSE: AtomicBool = AtomicBool::new(false);
static STDERR_ONLY: AtomicBool = AtomicBool::new(false);

pub struct Log;

impl Log {
	pub fn set_verbose(enabled: bool) {
		VERBOSE.store(enabled, Ordering::Relaxed);
	}

	pub fn is_verbose() -> bool {
		VERBOSE.load(Ordering::Relaxed)
	}

	/// Keep stdout clean for machine-readable output
	pub fn set_stderr_only(enabled: bool) {
		STDERR_ONLY.store(enabled, Ordering::Relaxed);
	}
}

fn out(line: String) {
	if STDERR_ONLY.load(Ordering::Relaxed) {
		eprintln!("{}", line);
	} else {
		println!("{}", line);
	}
}

fn stamp() -> ColoredString {
	Local::now().format("%H:%M:%S").to_string().dimmed()
}

pub fn info(msg: &str) {
	out(format!("[{}] {} {}", stamp(), "ℹ".bright_blue().bold(), msg.bright_white()));
}

pub fn success(msg: &str) {
	out(format!("[{}] {} {}", stamp(), "✓".bright_green().bold(), msg.bright_white()));
}

pub fn warn(msg: &str) {
	eprintln!("[{}] {} {}", stamp(), "⚠".bright_yellow().bold(), msg.bright_white());
}

pub fn error(msg: &str) {
	eprintln!("[{}] {} {}", stamp(), "✗".bright_red().bold(), msg.bright_white());
}

pub fn debug(msg: &str) {
	if Log::is_verbose() {
		out(format!("[{}] {} {}", stamp(), "⚙".bright_black().bold(), msg.dimmed()));
	}
}

pub fn header(text: &str) {
	out(format!("\n{}", format!("─── {} ───", text).bright_blue().bold()));
}

/// Clickable file path (OSC 8 terminal hyperlink)
pub fn path_link(path: &std::path::Path, max_len: usize) -> String {
	let absolute = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

	let uri = if cfg!(windows) {
		let path_str = absolute.to_string_lossy();
		let cleaned = path_str.strip_prefix(r"\\?\").unwrap_or(&path_str);
		format!("file:///{}", cleaned.replace('\\', "/"))
	} else {
		format!("file://{}", absolute.display())
	};

	let filename = path
		.file_name()
		.and_then(|n| n.to_str())
		.unwrap_or("unknown");

	format!("\x1b]8;;{}\x1b\\{}\x1b]8;;\x1b\\", uri, truncate_middle(filename, max_len))
}

fn truncate_middle(text: &str, max_len: usize) -> String {
	let chars: Vec<char> = text.chars().collect();
	if chars.len() <= max_len || max_len < 8 {
		return text.to_string();
	}
	let head = max_len / 2;
	let tail = max_len - head - 3;
	let start: String = chars[..head].iter().collect();
	let end: String = chars[chars.len() - tail..].iter().collect();
	format!("{}...{}", start, end)
}
