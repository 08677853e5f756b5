//! Catalog commands - list, show and VIN lookup

use anyhow::{anyhow, Result};
use colored::*;

use crate::core::CatalogItem;
use crate::storage::Catalog;
use crate::ui;

/// One-line summary of a part for terminal output
pub fn describe(item: &CatalogItem) -> String {
	let mut line = format!("{}", item.name.bright_white());

	if let Some(brand) = &item.brand {
		line.push_str(&format!(" {}", brand.yellow()));
	}
	if let Some(oem) = &item.oem {
		line.push_str(&format!(" {}", format!("[{}]", oem).dimmed()));
	}
	if let Some(price) = item.price {
		let currency = item.currency.as_deref().unwrap_or("");
		line.push_str(&format!(" {}", format!("{:.2} {}", price, currency).trim_end().bright_green()));
	}

	format!("{} {}", format!("#{}", item.id).dimmed(), line)
}

fn print_items(title: &str, items: &[&CatalogItem], json: bool) -> Result<()> {
	if json {
		println!("{}", serde_json::to_string_pretty(items)?);
		return Ok(());
	}

	if items.is_empty() {
		ui::warn("No matching parts");
		return Ok(());
	}

	ui::header(title);
	for item in items {
		println!("  {}", describe(item));
	}
	println!();
	ui::success(&format!("{} parts", items.len()));
	Ok(())
}

pub fn list(catalog: &Catalog, query: Option<&str>, json: bool) -> Result<()> {
	let items = catalog.filter(query.unwrap_or(""));
	let title = match query {
		Some(q) if !q.trim().is_empty() => format!("Parts matching \"{}\"", q.trim()),
		_ => "Parts".to_string(),
	};
	print_items(&title, &items, json)
}

pub fn show(catalog: &Catalog, id: &str, json: bool) -> Result<()> {
	let item = catalog
		.get(id)
		.ok_or_else(|| anyhow!("No part with id {}", id.trim()))?;

	if json {
		println!("{}", serde_json::to_string_pretty(item)?);
		return Ok(());
	}

	ui::header(&item.label());
	let field = |name: &str, value: Option<String>| {
		if let Some(value) = value {
			println!("  {} {}", format!("{}:", name).bright_blue().bold(), value);
		}
	};
	field("Brand", item.brand.clone());
	field("OEM", item.oem.clone());
	field(
		"Price",
		item.price
			.map(|p| format!("{:.2} {}", p, item.currency.as_deref().unwrap_or("")).trim_end().to_string()),
	);
	field("Storage", item.storage.clone());
	field("Supplier", item.supplier_url.clone());
	for reference in item.image_refs() {
		field("Image", Some(reference.to_string()));
	}
	println!();
	Ok(())
}

pub fn vin(catalog: &Catalog, vin: &str, json: bool) -> Result<()> {
	let found = catalog.by_vin(vin).ok_or_else(|| anyhow!("VIN required"))?;

	if json {
		let body = serde_json::json!({ "vin": found.vin, "parts": found.parts });
		println!("{}", serde_json::to_string_pretty(&body)?);
		return Ok(());
	}

	print_items(&format!("Parts for {}", found.vin), &found.parts, false)
}
