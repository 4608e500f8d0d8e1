//! Market ownership-transaction core.
//!
//! This crate implements the authenticated buy/sell core of the market as a
//! library: credential management, session-identity resolution via signed
//! tokens, and the atomic ownership/budget transfer protocol. The HTTP layer
//! is an external collaborator; everything here returns structured results
//! it can translate to responses without inspecting internals.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod config;
pub mod db;
pub mod models;
pub mod services;
