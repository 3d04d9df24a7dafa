pub mod activity;
pub mod documents;
pub mod error;
pub mod export;
pub mod pipeline;
pub mod pricing;
pub mod reminders;
pub mod remote;
pub mod stats;
pub mod store;
pub mod sync;
pub mod types;
pub mod view;

pub use error::CrmError;
pub use pipeline::LeadBook;
pub use store::{LeadStore, MemoryStore, SqliteLeadStore};
pub use types::Lead;
