//! Fleet Core Library
//!
//! Domain models and command logic for the instance lifecycle broadcaster.

pub mod command;
pub mod error;
pub mod event;
pub mod instance;

pub use error::{FleetError, FleetResult};
