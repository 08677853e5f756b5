//! Catalog store: loaded once, read-only afterwards

use std::collections::HashSet;
use std::path::Path;

use crate::config::{VIN_LENGTH, VIN_MATCHES};
use crate::core::{CatalogItem, CatalogLoadError};

#[derive(Debug, Default)]
pub struct Catalog {
	items: Vec<CatalogItem>,
}

/// Parts suggested for a VIN
#[derive(Debug)]
pub struct VinMatch<'a> {
	pub vin: String,
	pub parts: Vec<&'a CatalogItem>,
}

impl Catalog {
	/// Read a JSON array of parts. Any failure here is fatal for the process.
	pub fn load(path: &Path) -> Result<Self, CatalogLoadError> {
		let raw = std::fs::read_to_string(path).map_err(|source| CatalogLoadError::Io {
			path: path.to_path_buf(),
			source,
		})?;

		let value: serde_json::Value =
			serde_json::from_str(&raw).map_err(|source| CatalogLoadError::Malformed {
				path: path.to_path_buf(),
				source,
			})?;
		if !value.is_array() {
			return Err(CatalogLoadError::NotAnArray { path: path.to_path_buf() });
		}

		let items: Vec<CatalogItem> =
			serde_json::from_value(value).map_err(|source| CatalogLoadError::Malformed {
				path: path.to_path_buf(),
				source,
			})?;
		Self::from_items(items)
	}

	pub fn from_items(items: Vec<CatalogItem>) -> Result<Self, CatalogLoadError> {
		let mut seen = HashSet::with_capacity(items.len());
		for item in &items {
			let key = item.id.to_string();
			if !seen.insert(key.clone()) {
				return Err(CatalogLoadError::DuplicateId(key));
			}
		}
		Ok(Self { items })
	}

	pub fn items(&self) -> &[CatalogItem] {
		&self.items
	}

	pub fn len(&self) -> usize {
		self.items.len()
	}

	pub fn is_empty(&self) -> bool {
		self.items.is_empty()
	}

	/// First `n` parts, unranked
	pub fn sample(&self, n: usize) -> &[CatalogItem] {
		&self.items[..n.min(self.items.len())]
	}

	pub fn get(&self, id: &str) -> Option<&CatalogItem> {
		let id = id.trim();
		self.items.iter().find(|item| item.id.to_string() == id)
	}

	/// Case-insensitive substring search over name, brand and OEM number
	pub fn filter(&self, query: &str) -> Vec<&CatalogItem> {
		let needle = query.trim().to_lowercase();
		if needle.is_empty() {
			return self.items.iter().collect();
		}
		self.items.iter().filter(|item| item.matches(&needle)).collect()
	}

	/// Suggest parts for a VIN.
	///
	/// Anything that is not a full 17-character VIN is treated as a text query.
	/// A full VIN picks a deterministic window of consecutive parts.
	pub fn by_vin(&self, vin: &str) -> Option<VinMatch<'_>> {
		let vin = vin.trim().to_uppercase();
		if vin.is_empty() {
			return None;
		}

		if vin.chars().count() != VIN_LENGTH {
			let parts = self.filter(&vin);
			return Some(VinMatch { vin, parts });
		}

		let sum = vin
			.encode_utf16()
			.fold(0u32, |acc, unit| acc.wrapping_mul(31).wrapping_add(u32::from(unit)));
		let parts = if self.items.is_empty() {
			Vec::new()
		} else {
			let start = sum as usize % self.items.len();
			(0..VIN_MATCHES.min(self.items.len()))
				.map(|i| &self.items[(start + i) % self.items.len()])
				.collect()
		};

		Some(VinMatch { vin, parts })
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::core::PartId;
	use std::io::Write;

	fn catalog(n: i64) -> Catalog {
		let items = (1..=n)
			.map(|i| CatalogItem::new(PartId::Number(i), format!("Part {}", i)))
			.collect();
		Catalog::from_items(items).unwrap()
	}

	fn write_json(contents: &str) -> tempfile::NamedTempFile {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		file.write_all(contents.as_bytes()).unwrap();
		file
	}

	#[test]
	fn loads_a_json_array() {
		let file = write_json(
			r#"[
				{"id": 1, "name": "Brake disc", "brand": "ATE", "image": "/images/disc.jpg"},
				{"id": 2, "name": "Air filter", "images": ["https://cdn.example.com/af.png"]}
			]"#,
		);
		let catalog = Catalog::load(file.path()).unwrap();
		assert_eq!(catalog.len(), 2);
		assert_eq!(catalog.get("2").unwrap().name, "Air filter");
	}

	#[test]
	fn non_array_is_rejected() {
		let file = write_json(r#"{"id": 1}"#);
		assert!(matches!(
			Catalog::load(file.path()),
			Err(CatalogLoadError::NotAnArray { .. })
		));
	}

	#[test]
	fn broken_json_is_rejected() {
		let file = write_json("[{\"id\": 1,");
		assert!(matches!(
			Catalog::load(file.path()),
			Err(CatalogLoadError::Malformed { .. })
		));
	}

	#[test]
	fn missing_file_is_rejected() {
		assert!(matches!(
			Catalog::load(Path::new("/no/such/parts.json")),
			Err(CatalogLoadError::Io { .. })
		));
	}

	#[test]
	fn duplicate_ids_are_rejected() {
		let file = write_json(r#"[{"id": 5, "name": "a"}, {"id": "5", "name": "b"}]"#);
		match Catalog::load(file.path()) {
			Err(CatalogLoadError::DuplicateId(id)) => assert_eq!(id, "5"),
			other => panic!("expected duplicate id error, got {:?}", other),
		}
	}

	#[test]
	fn sample_is_clamped() {
		let catalog = catalog(3);
		assert_eq!(catalog.sample(6).len(), 3);
		assert_eq!(catalog.sample(2).len(), 2);
	}

	#[test]
	fn empty_filter_returns_everything() {
		let catalog = catalog(4);
		assert_eq!(catalog.filter("   ").len(), 4);
		assert_eq!(catalog.filter("part 3").len(), 1);
	}

	#[test]
	fn short_vin_falls_back_to_text_search() {
		let catalog = catalog(20);
		let found = catalog.by_vin(" part 1 ").unwrap();
		assert_eq!(found.vin, "PART 1");
		// "part 1", "part 10" .. "part 19"
		assert_eq!(found.parts.len(), 11);
	}

	#[test]
	fn full_vin_picks_a_consecutive_window() {
		let catalog = catalog(20);
		let found = catalog.by_vin("wvwzzz1jz3w386752").unwrap();
		assert_eq!(found.vin, "WVWZZZ1JZ3W386752");
		assert_eq!(found.parts.len(), 12);

		let ids: Vec<i64> = found
			.parts
			.iter()
			.map(|p| match p.id {
				PartId::Number(n) => n,
				PartId::Text(_) => unreachable!(),
			})
			.collect();
		for pair in ids.windows(2) {
			assert_eq!(pair[1], pair[0] % 20 + 1);
		}

		let again = catalog.by_vin("WVWZZZ1JZ3W386752").unwrap();
		assert_eq!(again.parts[0].id, found.parts[0].id);
	}

	#[test]
	fn full_vin_on_small_catalog_wraps_around() {
		let catalog = catalog(5);
		let found = catalog.by_vin("1HGCM82633A004352").unwrap();
		assert_eq!(found.parts.len(), 5);
	}

	#[test]
	fn blank_vin_is_rejected() {
		assert!(catalog(3).by_vin("  ").is_none());
	}
}
