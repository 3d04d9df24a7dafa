//! Error types for lead-book operations.
//!
//! Validation rejections (the completion gate) and missing records are
//! ordinary `Err` values returned to the caller; nothing in this crate
//! panics on bad input. Store failures carry their own taxonomy in
//! [`crate::store::StoreError`] and are wrapped here when they cross the
//! coordinator boundary.

use thiserror::Error;

use crate::store::StoreError;

#[derive(Debug, Error)]
pub enum CrmError {
    #[error("lead {0} not found")]
    LeadNotFound(i64),

    /// The single governed transition: a project cannot be marked complete
    /// while its balance is unpaid.
    #[error("balance must be settled before marking the project complete")]
    UnpaidBalance,

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

impl CrmError {
    /// Returns true for rejections the caller can resolve by changing the
    /// lead's state (as opposed to infrastructure failures).
    pub fn is_validation(&self) -> bool {
        matches!(self, CrmError::UnpaidBalance | CrmError::LeadNotFound(_))
    }
}
