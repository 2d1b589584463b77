//! Registry trait for self-registering implementations.
//!
//! Pluggable components (currently storage backends) register themselves
//! with the configuration name they answer to and a factory function.

/// Base trait for implementation registries.
///
/// Each backend module provides a Registry struct implementing this
/// trait, declaring the name used in the TOML configuration (for
/// example "memory" for `storage.implementations.memory`) and the
/// factory that constructs it.
pub trait ImplementationRegistry {
	/// The name used in configuration files to reference this implementation.
	const NAME: &'static str;

	/// The factory function type this implementation provides.
	type Factory;

	/// Get the factory function for this implementation.
	fn factory() -> Self::Factory;
}
