//! Stable hashing of remote image URLs

use xxhash_rust::xxh3::xxh3_64;

/// Hash of a URL's text, used to name its cached download (16-character hex)
///
/// Keyed purely by the URL string: the same URL always maps to the same file,
/// whatever the server returns.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UrlHash(String);

impl UrlHash {
	pub fn compute(url: &str) -> Self {
		Self(format!("{:016x}", xxh3_64(url.as_bytes())))
	}

	pub fn as_str(&self) -> &str {
		&self.0
	}

	pub fn short(&self) -> &str {
		&self.0[..8]
	}
}

impl std::fmt::Display for UrlHash {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "{}", self.0)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn same_url_same_hash() {
		let a = UrlHash::compute("https://cdn.example.com/parts/123.png");
		let b = UrlHash::compute("https://cdn.example.com/parts/123.png");
		assert_eq!(a, b);
		assert_eq!(a.as_str().len(), 16);
		assert_eq!(a.short().len(), 8);
	}

	#[test]
	fn different_urls_differ() {
		let a = UrlHash::compute("https://cdn.example.com/parts/123.png");
		let b = UrlHash::compute("https://cdn.example.com/parts/124.png");
		assert_ne!(a, b);
	}
}
