//! Repository implementations

mod agent;
mod diary;
mod registration;
mod relationship;
mod search;
mod signing_request;
mod voucher;

pub use agent::AgentRepo;
pub use diary::DiaryRepo;
pub use registration::RegistrationRepo;
pub use relationship::PgRelationshipStore;
pub use search::PostgresHybridSearch;
pub use signing_request::SigningRequestRepo;
pub use voucher::VoucherRepo;
