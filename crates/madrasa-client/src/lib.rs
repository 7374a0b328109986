//! madrasa-client — REST backend integration and configuration.
//!
//! Implements the `TestBackend` trait from `madrasa-core` over the platform's
//! REST API, loads the client configuration, and provides a scriptable mock
//! backend for tests.

pub mod config;
pub mod mock;
pub mod rest;

pub use config::{load_config, load_config_from, ClientConfig};
pub use mock::MockBackend;
pub use rest::RestBackend;
