//! Route handlers.

pub mod instances;
