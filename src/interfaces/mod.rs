//! Operational CLI surface (spec.md §6 "Operational surface"). The only
//! user-visible interface the core exposes; no HTTP listener.

pub mod cli;
