//! File-based storage backend.
//!
//! Stores each value as a JSON document on the filesystem, providing
//! simple persistence without external services. Plain writes are made
//! atomic with a temp-file-and-rename; compare-and-swap additionally
//! holds an exclusive advisory lock on a per-directory lock file so the
//! read-compare-write window is safe across processes sharing the
//! directory. An in-process mutex keeps concurrent tasks from queueing
//! on the file lock.

use crate::{StorageError, StorageFactory, StorageInterface, StorageRegistry};
use async_trait::async_trait;
use fs2::FileExt;
use stitchtrack_types::{ConfigSchema, Field, FieldType, ImplementationRegistry, Schema, ValidationError};
use std::path::PathBuf;
use tokio::fs;
use tokio::sync::Mutex;

/// Name of the advisory lock file guarding compare-and-swap windows.
const LOCK_FILE: &str = ".stitchtrack.lock";

/// File-based storage implementation.
pub struct FileStorage {
	/// Base directory path for storing documents.
	base_path: PathBuf,
	/// Serializes compare-and-swap windows within this process.
	cas_guard: Mutex<()>,
}

impl FileStorage {
	/// Creates a new FileStorage instance rooted at the given path.
	pub fn new(base_path: PathBuf) -> Self {
		Self {
			base_path,
			cas_guard: Mutex::new(()),
		}
	}

	/// Converts a storage key to a filesystem-safe file path.
	fn document_path(&self, key: &str) -> PathBuf {
		self.base_path.join(format!("{}.json", sanitize(key)))
	}
}

/// Replaces path-hostile characters so keys map onto flat file names.
fn sanitize(key: &str) -> String {
	key.replace(['/', ':'], "_")
}

#[async_trait]
impl StorageInterface for FileStorage {
	async fn get_bytes(&self, key: &str) -> Result<Vec<u8>, StorageError> {
		let path = self.document_path(key);

		match fs::read(&path).await {
			Ok(data) => Ok(data),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(StorageError::NotFound),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn set_bytes(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
		let path = self.document_path(key);

		if let Some(parent) = path.parent() {
			fs::create_dir_all(parent)
				.await
				.map_err(|e| StorageError::Backend(e.to_string()))?;
		}

		// Write atomically by writing to temp file then renaming
		let temp_path = path.with_extension("tmp");
		fs::write(&temp_path, value)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;
		fs::rename(&temp_path, &path)
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?;

		Ok(())
	}

	async fn compare_and_swap(
		&self,
		key: &str,
		witness: Option<&[u8]>,
		value: Vec<u8>,
	) -> Result<(), StorageError> {
		let _in_process = self.cas_guard.lock().await;

		let base_path = self.base_path.clone();
		let path = self.document_path(key);
		let witness = witness.map(|w| w.to_vec());

		// File locking and the compare itself are synchronous; run the
		// whole window on the blocking pool.
		tokio::task::spawn_blocking(move || {
			std::fs::create_dir_all(&base_path)
				.map_err(|e| StorageError::Backend(e.to_string()))?;

			let lock_file = std::fs::OpenOptions::new()
				.create(true)
				.write(true)
				.truncate(false)
				.open(base_path.join(LOCK_FILE))
				.map_err(|e| StorageError::Backend(e.to_string()))?;
			lock_file
				.lock_exclusive()
				.map_err(|e| StorageError::Backend(e.to_string()))?;

			let current = match std::fs::read(&path) {
				Ok(data) => Some(data),
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
				Err(e) => return Err(StorageError::Backend(e.to_string())),
			};

			if current.as_deref() != witness.as_deref() {
				return Err(StorageError::Conflict);
			}

			let temp_path = path.with_extension("tmp");
			std::fs::write(&temp_path, value)
				.map_err(|e| StorageError::Backend(e.to_string()))?;
			std::fs::rename(&temp_path, &path)
				.map_err(|e| StorageError::Backend(e.to_string()))?;

			// Lock releases when lock_file drops.
			Ok(())
		})
		.await
		.map_err(|e| StorageError::Backend(e.to_string()))?
	}

	async fn delete(&self, key: &str) -> Result<(), StorageError> {
		let path = self.document_path(key);

		match fs::remove_file(&path).await {
			Ok(_) => Ok(()),
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
			Err(e) => Err(StorageError::Backend(e.to_string())),
		}
	}

	async fn exists(&self, key: &str) -> Result<bool, StorageError> {
		let path = self.document_path(key);
		Ok(path.exists())
	}

	async fn scan(&self, prefix: &str) -> Result<Vec<Vec<u8>>, StorageError> {
		let file_prefix = sanitize(prefix);
		let mut found = Vec::new();

		let mut entries = match fs::read_dir(&self.base_path).await {
			Ok(entries) => entries,
			// A namespace nobody has written to yet is just empty.
			Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(found),
			Err(e) => return Err(StorageError::Backend(e.to_string())),
		};

		while let Some(entry) = entries
			.next_entry()
			.await
			.map_err(|e| StorageError::Backend(e.to_string()))?
		{
			let path = entry.path();
			if path.extension() != Some(std::ffi::OsStr::new("json")) {
				continue;
			}
			let matches_prefix = path
				.file_name()
				.and_then(|name| name.to_str())
				.is_some_and(|name| name.starts_with(&file_prefix));
			if !matches_prefix {
				continue;
			}
			match fs::read(&path).await {
				Ok(data) => found.push(data),
				Err(e) => {
					tracing::debug!("Skipping file {:?}: could not be read: {}", path, e);
				}
			}
		}

		Ok(found)
	}

	fn config_schema(&self) -> Box<dyn ConfigSchema> {
		Box::new(FileStorageSchema)
	}
}

/// Configuration schema for FileStorage.
pub struct FileStorageSchema;

impl ConfigSchema for FileStorageSchema {
	fn validate(&self, config: &toml::Value) -> Result<(), ValidationError> {
		let schema = Schema::new(
			vec![],
			vec![Field::new("storage_path", FieldType::String)],
		);
		schema.validate(config)
	}
}

/// Registry entry for the file backend.
pub struct Registry;

impl ImplementationRegistry for Registry {
	const NAME: &'static str = "file";
	type Factory = StorageFactory;

	fn factory() -> Self::Factory {
		create_storage
	}
}

impl StorageRegistry for Registry {}

/// Factory function to create a file storage backend from configuration.
///
/// Configuration parameters:
/// - `storage_path`: Base directory for documents (default: "./data/storage")
pub fn create_storage(config: &toml::Value) -> Result<Box<dyn StorageInterface>, StorageError> {
	let storage_path = config
		.get("storage_path")
		.and_then(|v| v.as_str())
		.unwrap_or("./data/storage")
		.to_string();

	Ok(Box::new(FileStorage::new(PathBuf::from(storage_path))))
}
