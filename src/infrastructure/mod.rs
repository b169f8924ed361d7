//! Adapters: concrete implementations of the `domain::ports` traits,
//! plus the observability wiring the ambient stack needs.

pub mod ledger;
pub mod mock;
pub mod observability;
