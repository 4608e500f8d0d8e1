//! Domain types.
//!
//! Validated domain objects, separate from database row types.

pub mod item;
pub mod session;
pub mod user;

pub use item::Item;
pub use session::Identity;
pub use user::User;
