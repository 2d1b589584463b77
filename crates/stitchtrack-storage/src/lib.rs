//! Order store abstraction for the stitchtrack system.
//!
//! This module provides the persistence boundary the progression engine
//! relies on: a raw key-value interface implemented by pluggable
//! backends, and a typed service layered on top. The interface carries a
//! compare-and-swap primitive so that approval decisions and tracking
//! appends can be made atomic read-verify-write cycles; two concurrent
//! writers cannot both succeed against the same witness.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use stitchtrack_types::{ConfigSchema, ImplementationRegistry};
use thiserror::Error;

/// Re-export implementations
pub mod implementations {
	pub mod file;
	pub mod memory;
}

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
	/// Error that occurs when a requested item is not found.
	#[error("Not found")]
	NotFound,
	/// Error that occurs when a compare-and-swap loses its race.
	#[error("Conflict: stored value changed since it was read")]
	Conflict,
	/// Error that occurs during serialization/deserialization.
	#[error("Serialization error: {0}")]
	Serialization(String),
	/// Error that occurs in the storage backend.
	#[error("Backend error: {0}")]
	Backend(String),
	/// Error that occurs during configuration validation.
	#[error("Configuration error: {0}")]
	Configuration(String),
}

/// Trait defining the low-level interface for storage backends.
///
/// Backends store raw bytes under string keys. `compare_and_swap` is the
/// primitive the rest of the system builds its optimistic concurrency
/// on: the write succeeds only if the stored bytes still equal the
/// witness the caller read.
#[async_trait]
pub trait StorageInterface: Send + Sync {
	/// Retrieves raw bytes for the given key.
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError>;

	/// Stores raw bytes unconditionally.
	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

	/// Stores raw bytes only if the current value matches the witness.
	///
	/// A witness of None asserts the key does not exist yet. Fails with
	/// `StorageError::Conflict` when the stored value has changed since
	/// the witness was read.
	async fn compare_and_swap(
		&self,
		key: &str,
		witness: Option<&[u8]>,
		value: Vec<u8>,
	) -> Result<(), StorageError>;

	/// Deletes the value associated with the given key.
	async fn delete(&self, key: &str) -> Result<(), StorageError>;

	/// Checks if a key exists in storage.
	async fn exists(&self, key: &str) -> Result<bool, StorageError>;

	/// Returns all values whose key starts with the given prefix.
	async fn scan(&self, prefix: &str) -> Result<Vec<Vec<u8>>, StorageError>;

	/// Returns the configuration schema for validation.
	fn config_schema(&self) -> Box<dyn ConfigSchema>;
}

/// Type alias for storage factory functions.
pub type StorageFactory = fn(&toml::Value) -> Result<Box<dyn StorageInterface>, StorageError>;

/// Registry trait for storage implementations.
pub trait StorageRegistry: ImplementationRegistry<Factory = StorageFactory> {}

/// Get all registered storage implementations.
///
/// Returns a vector of (name, factory) tuples for all available storage
/// implementations, used by the service binary to wire up whichever
/// backend the configuration names.
pub fn get_all_implementations() -> Vec<(&'static str, StorageFactory)> {
	use implementations::{file, memory};

	vec![
		(file::Registry::NAME, file::Registry::factory()),
		(memory::Registry::NAME, memory::Registry::factory()),
	]
}

/// Opaque snapshot of a stored value, used to detect lost write races.
///
/// A witness is handed out by `retrieve_with_witness` and later passed
/// to `swap`; it holds the raw bytes that were current at read time.
#[derive(Debug, Clone)]
pub struct Witness(Vec<u8>);

impl Witness {
	fn as_bytes(&self) -> &[u8] {
		&self.0
	}
}

/// High-level storage service that provides typed operations.
///
/// Wraps a low-level backend with JSON serialization and namespace
/// handling. Keys are formed as `namespace:id`.
pub struct StorageService {
	/// The underlying storage backend implementation.
	backend: Box<dyn StorageInterface>,
}

impl StorageService {
	/// Creates a new StorageService with the specified backend.
	pub fn new(backend: Box<dyn StorageInterface>) -> Self {
		Self { backend }
	}

	fn key(namespace: &str, id: &str) -> String {
		format!("{}:{}", namespace, id)
	}

	/// Stores a serializable value, creating or overwriting.
	pub async fn store<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend.set_bytes(&Self::key(namespace, id), bytes).await
	}

	/// Stores a serializable value only if the id is not yet taken.
	pub async fn insert<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.compare_and_swap(&Self::key(namespace, id), None, bytes)
			.await
	}

	/// Retrieves and deserializes a value from storage.
	pub async fn retrieve<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<T, StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization(e.to_string()))
	}

	/// Retrieves a value together with a witness for a later `swap`.
	///
	/// The witness captures the exact stored bytes; passing it back to
	/// `swap` makes the update an atomic check-and-set.
	pub async fn retrieve_with_witness<T: DeserializeOwned>(
		&self,
		namespace: &str,
		id: &str,
	) -> Result<(T, Witness), StorageError> {
		let bytes = self.backend.get_bytes(&Self::key(namespace, id)).await?;
		let value = serde_json::from_slice(&bytes)
			.map_err(|e| StorageError::Serialization(e.to_string()))?;
		Ok((value, Witness(bytes)))
	}

	/// Replaces a value only if it is unchanged since the witness was read.
	///
	/// Fails with `StorageError::Conflict` when a concurrent writer got
	/// there first; callers re-read and re-validate before retrying.
	pub async fn swap<T: Serialize>(
		&self,
		namespace: &str,
		id: &str,
		witness: &Witness,
		data: &T,
	) -> Result<(), StorageError> {
		let bytes =
			serde_json::to_vec(data).map_err(|e| StorageError::Serialization(e.to_string()))?;
		self.backend
			.compare_and_swap(&Self::key(namespace, id), Some(witness.as_bytes()), bytes)
			.await
	}

	/// Removes a value from storage.
	pub async fn remove(&self, namespace: &str, id: &str) -> Result<(), StorageError> {
		self.backend.delete(&Self::key(namespace, id)).await
	}

	/// Checks if a value exists in storage.
	pub async fn exists(&self, namespace: &str, id: &str) -> Result<bool, StorageError> {
		self.backend.exists(&Self::key(namespace, id)).await
	}

	/// Lists and deserializes every value in a namespace.
	///
	/// Ordering is backend-defined; callers sort as needed.
	pub async fn list<T: DeserializeOwned>(&self, namespace: &str) -> Result<Vec<T>, StorageError> {
		let prefix = format!("{}:", namespace);
		let raw = self.backend.scan(&prefix).await?;
		raw.into_iter()
			.map(|bytes| {
				serde_json::from_slice(&bytes)
					.map_err(|e| StorageError::Serialization(e.to_string()))
			})
			.collect()
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::implementations::memory::MemoryStorage;
	use serde::{Deserialize, Serialize};

	#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
	struct Doc {
		name: String,
		revision: u32,
	}

	fn service() -> StorageService {
		StorageService::new(Box::new(MemoryStorage::new()))
	}

	#[tokio::test]
	async fn typed_round_trip() {
		let storage = service();
		let doc = Doc {
			name: "jacket".to_string(),
			revision: 1,
		};

		storage.store("products", "p-1", &doc).await.unwrap();
		let loaded: Doc = storage.retrieve("products", "p-1").await.unwrap();
		assert_eq!(loaded, doc);

		storage.remove("products", "p-1").await.unwrap();
		assert!(!storage.exists("products", "p-1").await.unwrap());
	}

	#[tokio::test]
	async fn insert_refuses_existing_id() {
		let storage = service();
		let doc = Doc {
			name: "jacket".to_string(),
			revision: 1,
		};

		storage.insert("products", "p-1", &doc).await.unwrap();
		let again = storage.insert("products", "p-1", &doc).await;
		assert!(matches!(again, Err(StorageError::Conflict)));
	}

	#[tokio::test]
	async fn swap_detects_lost_race() {
		let storage = service();
		let doc = Doc {
			name: "jacket".to_string(),
			revision: 1,
		};
		storage.store("products", "p-1", &doc).await.unwrap();

		let (mut first, first_witness) = storage
			.retrieve_with_witness::<Doc>("products", "p-1")
			.await
			.unwrap();
		let (mut second, second_witness) = storage
			.retrieve_with_witness::<Doc>("products", "p-1")
			.await
			.unwrap();

		first.revision = 2;
		storage
			.swap("products", "p-1", &first_witness, &first)
			.await
			.unwrap();

		// The second writer read the old bytes; its swap must lose.
		second.revision = 3;
		let lost = storage
			.swap("products", "p-1", &second_witness, &second)
			.await;
		assert!(matches!(lost, Err(StorageError::Conflict)));

		let current: Doc = storage.retrieve("products", "p-1").await.unwrap();
		assert_eq!(current.revision, 2);
	}

	#[tokio::test]
	async fn list_scopes_to_namespace() {
		let storage = service();
		for i in 0..3 {
			let doc = Doc {
				name: format!("doc-{}", i),
				revision: i,
			};
			storage
				.store("orders", &format!("o-{}", i), &doc)
				.await
				.unwrap();
		}
		storage
			.store(
				"users",
				"u-1",
				&Doc {
					name: "someone".to_string(),
					revision: 0,
				},
			)
			.await
			.unwrap();

		let orders: Vec<Doc> = storage.list("orders").await.unwrap();
		assert_eq!(orders.len(), 3);
	}
}
