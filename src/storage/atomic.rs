//! Write-then-rename file replacement

use std::io::Write;
use std::path::Path;

/// Replace `path` with `bytes` so readers never observe a partial file
pub fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
	let parent = match path.parent() {
		Some(p) if !p.as_os_str().is_empty() => p,
		_ => Path::new("."),
	};
	std::fs::create_dir_all(parent)?;

	let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
	tmp.write_all(bytes)?;
	tmp.as_file().sync_all()?;
	tmp.persist(path).map_err(|e| e.error)?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn replaces_existing_content() {
		let dir = tempfile::TempDir::new().unwrap();
		let path = dir.path().join("nested").join("file.json");
		write_atomic(&path, b"first").unwrap();
		write_atomic(&path, b"second").unwrap();
		assert_eq!(std::fs::read(&path).unwrap(), b"second");

		let leftovers = std::fs::read_dir(path.parent().unwrap()).unwrap().count();
		assert_eq!(leftovers, 1);
	}
}
