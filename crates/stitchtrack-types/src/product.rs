//! Product catalog records.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A catalog product that orders reference.
///
/// The order side only snapshots `id`, `title`, and the computed total;
/// quantity bounds are enforced at placement time against the record
/// current at that moment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
	/// Unique identifier, server-assigned.
	pub id: String,
	/// Product title.
	pub title: String,
	/// Free-form description.
	#[serde(default)]
	pub description: String,
	/// Unit price.
	pub price: Decimal,
	/// Units available for ordering.
	pub available_quantity: u32,
	/// Smallest quantity a single order may carry.
	pub minimum_order_quantity: u32,
	/// Payment options offered by the storefront for this product.
	#[serde(default)]
	pub payment_options: Vec<String>,
	/// Unix timestamp (seconds) when the product was created.
	pub created_at: u64,
	/// Unix timestamp (seconds) when the product was last updated.
	pub updated_at: u64,
}

impl ProductRecord {
	/// Whether the given quantity falls within this product's order bounds.
	pub fn accepts_quantity(&self, quantity: u32) -> bool {
		quantity >= self.minimum_order_quantity && quantity <= self.available_quantity
	}
}
