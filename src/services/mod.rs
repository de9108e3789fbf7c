//! Business logic services
//!
//! Flow handling separated from HTTP concerns, so every step can be driven
//! directly from tests.

pub mod options_flow;
pub mod setup_flow;
pub mod validation;
