//! Core types for the market workspace.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod email;
pub mod id;
pub mod item_name;
pub mod username;

pub use email::{Email, EmailError};
pub use id::*;
pub use item_name::{ItemName, ItemNameError};
pub use username::{Username, UsernameError};
