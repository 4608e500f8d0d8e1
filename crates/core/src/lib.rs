//! Market Core - Shared types library.
//!
//! This crate provides the validated domain primitives used across the
//! market workspace: newtype IDs, usernames, email addresses, and item
//! names.
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access. The
//! `postgres` feature adds `sqlx` column mappings so the same newtypes can
//! be bound directly in queries.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, names, and emails

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
