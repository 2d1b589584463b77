//! Product catalog operations.
//!
//! Products are administered by admins and managers; buyers only read
//! them. Order placement snapshots the title and price at placement
//! time, so later catalog edits never rewrite existing orders.

use crate::{access, now, truncate_id, EngineError, TrackerEngine, CAS_ATTEMPTS};
use stitchtrack_storage::StorageError;
use stitchtrack_types::{Collection, ProductRecord, ProductUpsertRequest, Role, UserRecord};
use uuid::Uuid;

impl TrackerEngine {
	/// Creates a new catalog product.
	pub async fn create_product(
		&self,
		actor: &UserRecord,
		request: ProductUpsertRequest,
	) -> Result<ProductRecord, EngineError> {
		access::ensure_role(actor, &[Role::Admin, Role::Manager])?;
		validate_product(&request)?;

		let timestamp = now();
		let product = ProductRecord {
			id: Uuid::new_v4().to_string(),
			title: request.title,
			description: request.description,
			price: request.price,
			available_quantity: request.available_quantity,
			minimum_order_quantity: request.minimum_order_quantity,
			payment_options: request.payment_options,
			created_at: timestamp,
			updated_at: timestamp,
		};

		self.storage()
			.insert(Collection::Products.as_str(), &product.id, &product)
			.await?;
		tracing::info!(product_id = %truncate_id(&product.id), title = %product.title, "Product created");

		Ok(product)
	}

	/// Fetches one catalog product.
	pub async fn get_product(&self, product_id: &str) -> Result<ProductRecord, EngineError> {
		self.storage()
			.retrieve(Collection::Products.as_str(), product_id)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => EngineError::NotFound(format!(
					"product {} not found",
					truncate_id(product_id)
				)),
				other => other.into(),
			})
	}

	/// Lists the catalog, newest first.
	pub async fn list_products(&self) -> Result<Vec<ProductRecord>, EngineError> {
		let mut products: Vec<ProductRecord> =
			self.storage().list(Collection::Products.as_str()).await?;
		products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
		Ok(products)
	}

	/// Replaces a product's editable fields.
	pub async fn update_product(
		&self,
		actor: &UserRecord,
		product_id: &str,
		request: ProductUpsertRequest,
	) -> Result<ProductRecord, EngineError> {
		access::ensure_role(actor, &[Role::Admin, Role::Manager])?;
		validate_product(&request)?;

		for _ in 0..CAS_ATTEMPTS {
			let (mut product, witness) = self
				.storage()
				.retrieve_with_witness::<ProductRecord>(Collection::Products.as_str(), product_id)
				.await
				.map_err(|e| match e {
					StorageError::NotFound => EngineError::NotFound(format!(
						"product {} not found",
						truncate_id(product_id)
					)),
					other => other.into(),
				})?;

			product.title = request.title.clone();
			product.description = request.description.clone();
			product.price = request.price;
			product.available_quantity = request.available_quantity;
			product.minimum_order_quantity = request.minimum_order_quantity;
			product.payment_options = request.payment_options.clone();
			product.updated_at = now();

			match self
				.storage()
				.swap(Collection::Products.as_str(), product_id, &witness, &product)
				.await
			{
				Ok(()) => {
					tracing::info!(product_id = %truncate_id(product_id), "Product updated");
					return Ok(product);
				}
				Err(StorageError::Conflict) => continue,
				Err(e) => return Err(e.into()),
			}
		}

		Err(EngineError::Conflict(format!(
			"product {} kept changing underneath the update; gave up after {} attempts",
			truncate_id(product_id),
			CAS_ATTEMPTS
		)))
	}

	/// Removes a product from the catalog.
	///
	/// Existing orders keep their snapshots; only future placements are
	/// affected.
	pub async fn delete_product(
		&self,
		actor: &UserRecord,
		product_id: &str,
	) -> Result<(), EngineError> {
		access::ensure_role(actor, &[Role::Admin, Role::Manager])?;

		// Surface a 404 rather than silently deleting nothing.
		self.get_product(product_id).await?;
		self.storage()
			.remove(Collection::Products.as_str(), product_id)
			.await?;
		tracing::info!(product_id = %truncate_id(product_id), "Product deleted");

		Ok(())
	}
}

/// Validates product fields shared by create and update.
fn validate_product(request: &ProductUpsertRequest) -> Result<(), EngineError> {
	if request.title.trim().is_empty() {
		return Err(EngineError::Validation("title is required".into()));
	}
	if request.price.is_sign_negative() || request.price.is_zero() {
		return Err(EngineError::Validation("price must be positive".into()));
	}
	if request.minimum_order_quantity == 0 {
		return Err(EngineError::Validation(
			"minimum order quantity must be positive".into(),
		));
	}
	if request.minimum_order_quantity > request.available_quantity {
		return Err(EngineError::Validation(
			"minimum order quantity cannot exceed the available quantity".into(),
		));
	}
	Ok(())
}
