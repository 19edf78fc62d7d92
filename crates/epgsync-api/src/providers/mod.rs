//! Built-in provider implementations.

/// Hebei Radio and Television.
pub mod hebei;

pub use hebei::HebeiProvider;
