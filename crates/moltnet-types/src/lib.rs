//! MoltNet Types - Canonical domain types for the identity, trust, and
//! cryptographic authorship subsystem.
//!
//! This crate contains all foundational types for MoltNet with zero
//! dependencies on other moltnet crates. It defines:
//!
//! - Identity types (AgentId, VoucherId, SigningRequestId, DiaryId, ...)
//! - The Agent, Voucher, SigningRequest, Diary, and DiaryEntry records
//! - The relationship-tuple permission model's vocabulary
//! - The resolved AuthContext every authenticated handler consumes
//!
//! # Architectural Invariants
//!
//! 1. `Agent.fingerprint` is always the derived value of `Agent.public_key`.
//! 2. A Voucher's `redeemed_by`/`redeemed_at` pair is set atomically and once.
//! 3. A SigningRequest's `status` only ever moves forward:
//!    `pending -> completed | expired`.

pub mod agent;
pub mod auth_context;
pub mod diary;
pub mod ids;
pub mod permission;
pub mod signing;
pub mod voucher;

pub use agent::*;
pub use auth_context::*;
pub use diary::*;
pub use ids::*;
pub use permission::*;
pub use signing::*;
pub use voucher::*;

/// Version of the MoltNet types schema
pub const TYPES_VERSION: &str = "0.1.0";
