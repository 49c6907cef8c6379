pub mod amortization;
pub mod classifier;
pub mod error;
pub mod policy;
pub mod recovery;
pub mod refinance;
pub mod types;

#[cfg(feature = "service")]
pub mod events;

#[cfg(feature = "service")]
pub mod ledger;

#[cfg(feature = "service")]
pub mod service;

#[cfg(feature = "service")]
pub mod wallet;

pub use error::LoanHealthError;
pub use types::*;

/// Standard result type for all loan-health operations
pub type LoanHealthResult<T> = Result<T, LoanHealthError>;
