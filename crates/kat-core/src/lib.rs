//! # kat-core
//!
//! Core types, ID prefixes, and error types for Katalog.
//!
//! This crate provides the foundational types shared across all Katalog crates:
//! - Entity structs for the persisted catalog (projects, datasets, tables, columns)
//! - Sync run and changelog entry records
//! - The in-memory catalog snapshot tree used for reconciliation
//! - Change records produced by the reconciler
//! - Entity/change type enums and the sync stage state machine
//! - ID prefix constants
//! - Cross-cutting error types

pub mod change;
pub mod entities;
pub mod enums;
pub mod errors;
pub mod ids;
pub mod snapshot;
