//! User account administration.
//!
//! Accounts are keyed by email, the identity the external auth gateway
//! reports. Registration is upsert-on-first-sight after external
//! sign-in; everyone starts as an active buyer until an admin says
//! otherwise. Role and standing lookups serve the storefront's route
//! guards, which poll the status endpoint on a short interval.

use crate::{access, now, truncate_id, EngineError, TrackerEngine, CAS_ATTEMPTS};
use stitchtrack_storage::StorageError;
use stitchtrack_types::{
	AccountStatus, Collection, Role, TrackerEvent, UserEvent, UserRecord,
};
use uuid::Uuid;

impl TrackerEngine {
	/// Registers a user on first sight, returning the stored record.
	///
	/// Re-registering an existing email is a no-op that returns the
	/// current record; the storefront calls this after every external
	/// sign-in.
	pub async fn register_user(&self, email: &str, name: &str) -> Result<UserRecord, EngineError> {
		let email = email.trim().to_lowercase();
		if email.is_empty() {
			return Err(EngineError::Validation("email is required".into()));
		}

		if let Ok(existing) = self.get_user(&email).await {
			return Ok(existing);
		}

		let user = UserRecord {
			id: Uuid::new_v4().to_string(),
			email: email.clone(),
			name: name.trim().to_string(),
			role: Role::Buyer,
			status: AccountStatus::Active,
			suspend_reason: None,
			suspend_feedback: None,
			created_at: now(),
		};

		match self
			.storage()
			.insert(Collection::Users.as_str(), &email, &user)
			.await
		{
			Ok(()) => {
				self.event_bus()
					.publish(TrackerEvent::User(UserEvent::Registered {
						email: email.clone(),
					}))
					.ok();
				tracing::info!(email = %email, "User registered");
				Ok(user)
			}
			// Someone else registered the same email between our read
			// and write; theirs is the record of truth.
			Err(StorageError::Conflict) => self.get_user(&email).await,
			Err(e) => Err(e.into()),
		}
	}

	/// Looks up a user by email.
	pub async fn get_user(&self, email: &str) -> Result<UserRecord, EngineError> {
		let email = email.trim().to_lowercase();
		self.storage()
			.retrieve(Collection::Users.as_str(), &email)
			.await
			.map_err(|e| match e {
				StorageError::NotFound => {
					EngineError::NotFound(format!("user {} not found", email))
				}
				other => other.into(),
			})
	}

	/// Lists all user accounts. Admin only.
	pub async fn list_users(&self, actor: &UserRecord) -> Result<Vec<UserRecord>, EngineError> {
		access::ensure_role(actor, &[Role::Admin])?;
		let mut users: Vec<UserRecord> = self.storage().list(Collection::Users.as_str()).await?;
		users.sort_by(|a, b| a.email.cmp(&b.email));
		Ok(users)
	}

	/// Finds a user by id.
	///
	/// Admin operations address users by id; the store keys them by
	/// email, so this resolves through a listing.
	async fn find_user_by_id(&self, user_id: &str) -> Result<UserRecord, EngineError> {
		let users: Vec<UserRecord> = self.storage().list(Collection::Users.as_str()).await?;
		users
			.into_iter()
			.find(|user| user.id == user_id)
			.ok_or_else(|| {
				EngineError::NotFound(format!("user {} not found", truncate_id(user_id)))
			})
	}

	/// Changes a user's role. Admin only.
	pub async fn update_role(
		&self,
		actor: &UserRecord,
		user_id: &str,
		role: Role,
	) -> Result<UserRecord, EngineError> {
		access::ensure_role(actor, &[Role::Admin])?;
		let target = self.find_user_by_id(user_id).await?;

		for _ in 0..CAS_ATTEMPTS {
			let (mut user, witness) = self
				.storage()
				.retrieve_with_witness::<UserRecord>(Collection::Users.as_str(), &target.email)
				.await?;
			user.role = role;

			match self
				.storage()
				.swap(Collection::Users.as_str(), &target.email, &witness, &user)
				.await
			{
				Ok(()) => {
					self.event_bus()
						.publish(TrackerEvent::User(UserEvent::RoleUpdated {
							email: user.email.clone(),
							role,
						}))
						.ok();
					tracing::info!(email = %user.email, role = %role, "Role updated");
					return Ok(user);
				}
				Err(StorageError::Conflict) => continue,
				Err(e) => return Err(e.into()),
			}
		}

		Err(EngineError::Conflict(format!(
			"user {} kept changing underneath the role update",
			target.email
		)))
	}

	/// Suspends or reinstates a user. Admin only.
	///
	/// Suspension requires a reason; reinstating clears the stored
	/// reason and feedback.
	pub async fn update_status(
		&self,
		actor: &UserRecord,
		user_id: &str,
		status: AccountStatus,
		reason: Option<String>,
		feedback: Option<String>,
	) -> Result<UserRecord, EngineError> {
		access::ensure_role(actor, &[Role::Admin])?;

		if status == AccountStatus::Suspended
			&& reason.as_deref().map(str::trim).unwrap_or("").is_empty()
		{
			return Err(EngineError::Validation(
				"a suspension reason is required".into(),
			));
		}

		let target = self.find_user_by_id(user_id).await?;

		for _ in 0..CAS_ATTEMPTS {
			let (mut user, witness) = self
				.storage()
				.retrieve_with_witness::<UserRecord>(Collection::Users.as_str(), &target.email)
				.await?;

			user.status = status;
			match status {
				AccountStatus::Suspended => {
					user.suspend_reason = reason.clone();
					user.suspend_feedback = feedback.clone();
				}
				AccountStatus::Active => {
					user.suspend_reason = None;
					user.suspend_feedback = None;
				}
			}

			match self
				.storage()
				.swap(Collection::Users.as_str(), &target.email, &witness, &user)
				.await
			{
				Ok(()) => {
					self.event_bus()
						.publish(TrackerEvent::User(UserEvent::StatusUpdated {
							email: user.email.clone(),
							status,
						}))
						.ok();
					tracing::info!(email = %user.email, status = %status, "Status updated");
					return Ok(user);
				}
				Err(StorageError::Conflict) => continue,
				Err(e) => return Err(e.into()),
			}
		}

		Err(EngineError::Conflict(format!(
			"user {} kept changing underneath the status update",
			target.email
		)))
	}

	/// Deletes a user account. Admin only.
	pub async fn delete_user(&self, actor: &UserRecord, user_id: &str) -> Result<(), EngineError> {
		access::ensure_role(actor, &[Role::Admin])?;
		let target = self.find_user_by_id(user_id).await?;
		self.storage()
			.remove(Collection::Users.as_str(), &target.email)
			.await?;
		tracing::info!(email = %target.email, "User deleted");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::Arc;
	use stitchtrack_storage::{implementations::memory::MemoryStorage, StorageService};

	fn engine() -> TrackerEngine {
		let config = r#"
[service]
id = "stitchtrack-test"

[storage]
primary = "memory"
[storage.implementations.memory]
"#
		.parse()
		.unwrap();
		let storage = Arc::new(StorageService::new(Box::new(MemoryStorage::new())));
		TrackerEngine::new(config, storage)
	}

	async fn admin(engine: &TrackerEngine) -> UserRecord {
		let registered = engine
			.register_user("admin@example.com", "Admin")
			.await
			.unwrap();
		// Directly promote the seed admin; there is no admin yet to do it.
		let mut promoted = registered;
		promoted.role = Role::Admin;
		engine
			.storage()
			.store(Collection::Users.as_str(), &promoted.email, &promoted)
			.await
			.unwrap();
		promoted
	}

	#[tokio::test]
	async fn registration_defaults_to_active_buyer_and_is_idempotent() {
		let engine = engine();

		let first = engine
			.register_user("Buyer@Example.com", "Buyer")
			.await
			.unwrap();
		assert_eq!(first.email, "buyer@example.com");
		assert_eq!(first.role, Role::Buyer);
		assert_eq!(first.status, AccountStatus::Active);

		let second = engine
			.register_user("buyer@example.com", "Buyer Again")
			.await
			.unwrap();
		assert_eq!(second.id, first.id);
		assert_eq!(second.name, "Buyer");
	}

	#[tokio::test]
	async fn role_update_addresses_by_id() {
		let engine = engine();
		let admin = admin(&engine).await;
		let buyer = engine
			.register_user("buyer@example.com", "Buyer")
			.await
			.unwrap();

		let updated = engine
			.update_role(&admin, &buyer.id, Role::Manager)
			.await
			.unwrap();
		assert_eq!(updated.role, Role::Manager);

		let fetched = engine.get_user("buyer@example.com").await.unwrap();
		assert_eq!(fetched.role, Role::Manager);
	}

	#[tokio::test]
	async fn suspension_requires_reason_and_reinstating_clears_it() {
		let engine = engine();
		let admin = admin(&engine).await;
		let buyer = engine
			.register_user("buyer@example.com", "Buyer")
			.await
			.unwrap();

		let missing_reason = engine
			.update_status(&admin, &buyer.id, AccountStatus::Suspended, None, None)
			.await;
		assert!(matches!(missing_reason, Err(EngineError::Validation(_))));

		let suspended = engine
			.update_status(
				&admin,
				&buyer.id,
				AccountStatus::Suspended,
				Some("policy violation".to_string()),
				Some("contact support".to_string()),
			)
			.await
			.unwrap();
		assert_eq!(suspended.status, AccountStatus::Suspended);
		assert_eq!(suspended.suspend_reason.as_deref(), Some("policy violation"));

		let reinstated = engine
			.update_status(&admin, &buyer.id, AccountStatus::Active, None, None)
			.await
			.unwrap();
		assert_eq!(reinstated.status, AccountStatus::Active);
		assert!(reinstated.suspend_reason.is_none());
		assert!(reinstated.suspend_feedback.is_none());
	}

	#[tokio::test]
	async fn only_admins_administer_users() {
		let engine = engine();
		let buyer = engine
			.register_user("buyer@example.com", "Buyer")
			.await
			.unwrap();
		let other = engine
			.register_user("other@example.com", "Other")
			.await
			.unwrap();

		let refused = engine.update_role(&buyer, &other.id, Role::Manager).await;
		assert!(matches!(refused, Err(EngineError::Access(_))));

		let refused = engine.list_users(&buyer).await;
		assert!(matches!(refused, Err(EngineError::Access(_))));
	}

	#[tokio::test]
	async fn delete_removes_the_account() {
		let engine = engine();
		let admin = admin(&engine).await;
		let buyer = engine
			.register_user("buyer@example.com", "Buyer")
			.await
			.unwrap();

		engine.delete_user(&admin, &buyer.id).await.unwrap();
		assert!(matches!(
			engine.get_user("buyer@example.com").await,
			Err(EngineError::NotFound(_))
		));
	}
}
