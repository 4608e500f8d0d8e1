//! Business services.
//!
//! Each service borrows the shared connection pool and exposes structured
//! results the HTTP layer can translate directly.

pub mod auth;
pub mod session;
pub mod trade;

pub use auth::AuthService;
pub use session::SessionService;
pub use trade::TradeService;
