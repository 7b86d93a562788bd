//! API Handlers
//!
//! Request handlers for all API endpoints. Each module handles one
//! component's HTTP surface.

pub mod feed;
pub mod health;
pub mod recovery;
pub mod signing;
pub mod verify;
pub mod voucher;
pub mod webhooks;
pub mod whoami;
