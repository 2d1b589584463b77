//! Storage-related types for the tracker system.

use std::str::FromStr;

/// Named collections of persistent data.
///
/// This enum provides type safety for storage operations by replacing
/// string literals with strongly typed variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
	/// Orders with their embedded tracking history
	Orders,
	/// User accounts keyed by email
	Users,
	/// Product catalog records
	Products,
}

impl Collection {
	/// Returns the string representation of the collection.
	pub fn as_str(&self) -> &'static str {
		match self {
			Collection::Orders => "orders",
			Collection::Users => "users",
			Collection::Products => "products",
		}
	}

	/// Returns an iterator over all Collection variants.
	pub fn all() -> impl Iterator<Item = Self> {
		[Self::Orders, Self::Users, Self::Products].into_iter()
	}
}

impl FromStr for Collection {
	type Err = ();

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s {
			"orders" => Ok(Self::Orders),
			"users" => Ok(Self::Users),
			"products" => Ok(Self::Products),
			_ => Err(()),
		}
	}
}

impl From<Collection> for &'static str {
	fn from(collection: Collection) -> Self {
		collection.as_str()
	}
}
