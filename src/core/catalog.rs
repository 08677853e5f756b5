//! Catalog records

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Part identifier as it appears in the catalog file (number or string)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PartId {
	Number(i64),
	Text(String),
}

impl fmt::Display for PartId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			PartId::Number(n) => write!(f, "{}", n),
			PartId::Text(s) => write!(f, "{}", s),
		}
	}
}

/// A sellable part. Immutable once loaded.
///
/// Fields the catalog carries beyond the known ones are kept in `extra` so
/// that indexed copies and search results reproduce the full record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogItem {
	pub id: PartId,
	#[serde(default)]
	pub name: String,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub brand: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub oem: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub price: Option<f64>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub currency: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub storage: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub supplier_url: Option<String>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub image: Option<String>,
	#[serde(default, skip_serializing_if = "Vec::is_empty")]
	pub images: Vec<String>,
	#[serde(flatten)]
	pub extra: Map<String, Value>,
}

impl CatalogItem {
	pub fn new(id: PartId, name: impl Into<String>) -> Self {
		Self {
			id,
			name: name.into(),
			brand: None,
			oem: None,
			price: None,
			currency: None,
			storage: None,
			supplier_url: None,
			image: None,
			images: Vec::new(),
			extra: Map::new(),
		}
	}

	/// Image references to index: `images` if non-empty, else `image`, else none
	pub fn image_refs(&self) -> Vec<&str> {
		if !self.images.is_empty() {
			self.images.iter().map(String::as_str).collect()
		} else if let Some(image) = self.image.as_deref() {
			vec![image]
		} else {
			Vec::new()
		}
	}

	/// Copy of this record pointing at one specific image
	pub fn with_image(&self, reference: &str) -> Self {
		let mut item = self.clone();
		item.image = Some(reference.to_string());
		item
	}

	/// Name for log lines; falls back to the id
	pub fn label(&self) -> String {
		if self.name.is_empty() {
			format!("#{}", self.id)
		} else {
			format!("{} (#{})", self.name, self.id)
		}
	}

	/// Case-insensitive match against name, brand and OEM number
	pub fn matches(&self, needle_lower: &str) -> bool {
		let hit = |field: Option<&str>| {
			field
				.map(|v| v.to_lowercase().contains(needle_lower))
				.unwrap_or(false)
		};
		hit(Some(&self.name)) || hit(self.brand.as_deref()) || hit(self.oem.as_deref())
	}
}
