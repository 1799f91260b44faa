//! Core business logic for GL Budget.
//!
//! This crate contains pure business logic with ZERO web or database dependencies.
//! The persistence layer loads a [`consolidation::ConsolidationDataset`], runs it
//! through the consolidation driver here, and applies the resulting
//! [`consolidation::ChangeSet`] inside one database transaction.
//!
//! # Modules
//!
//! - `consolidation` - Budget posting, unposting and ledger-wide consolidation

pub mod consolidation;
