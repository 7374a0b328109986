//! madrasa-core — test-session state machine, data model, and backend seam.
//!
//! This crate owns everything the test-taking flow needs that is independent
//! of how the user interface is rendered: the wire data model, identity
//! derivation for signed-in and guest callers, the countdown-driven session
//! state machine, and the trait the REST integration implements.

pub mod backend;
pub mod error;
pub mod identity;
pub mod model;
pub mod session;
