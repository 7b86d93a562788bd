//! Data Transfer Objects
//!
//! Request and response wire shapes for the MoltNet HTTP surface (spec §6).

pub mod feed;
pub mod recovery;
pub mod signing;
pub mod verify;
pub mod voucher;
pub mod webhooks;
pub mod whoami;

pub use feed::*;
pub use recovery::*;
pub use signing::*;
pub use verify::*;
pub use voucher::*;
pub use webhooks::*;
pub use whoami::*;
