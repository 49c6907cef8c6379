use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoanHealthError {
    #[error("Invalid input: {field} — {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Invalid term: {months} months (must be at least 1)")]
    InvalidTerm { months: i64 },

    #[error("Invalid principal: {amount} (must be positive)")]
    InvalidPrincipal { amount: Decimal },

    #[error("Loan {loan_id} is not eligible for refinance: {reason}")]
    IneligibleLoan { loan_id: String, reason: String },

    #[error("Insufficient funds: fee {required} exceeds available balance {available}")]
    InsufficientFunds {
        required: Decimal,
        available: Decimal,
    },

    #[error(
        "Stale quote: term {requested_term} no longer matches an offered option \
         (remaining term is now {remaining_term})"
    )]
    StaleQuote {
        requested_term: u32,
        remaining_term: u32,
    },

    #[error("Unknown loan: {0}")]
    UnknownLoan(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for LoanHealthError {
    fn from(e: serde_json::Error) -> Self {
        LoanHealthError::SerializationError(e.to_string())
    }
}
