//! # Adapters
//!
//! Concrete implementations of the outbound ports.
//!
//! - `Secp256k1Signer` - In-process record signing key
//! - `SystemTimeSource` - Production time source using the system clock
//! - `StaticConfigProvider` / `TomlConfigProvider` - Configuration sources
//! - `UdpDiscovery` - UDP discovery engine
//!
//! ## Feature Flags
//!
//! - `network` - Enables the UDP engine and config file parsing

// Semantic submodules
/// Configuration providers
pub mod config;
/// Record signing
pub mod signer;
/// Time source adapters
pub mod time;

/// UDP discovery engine
#[cfg(feature = "network")]
pub mod discovery;

// Re-export public API
pub use config::StaticConfigProvider;
pub use signer::Secp256k1Signer;
pub use time::SystemTimeSource;

#[cfg(feature = "network")]
pub use config::TomlConfigProvider;

#[cfg(feature = "network")]
pub use discovery::UdpDiscovery;
