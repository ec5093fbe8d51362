pub mod account;
pub mod booking;
pub mod inventory;
pub mod memory;
#[cfg(feature = "test-utils")]
pub mod mocks;
pub mod otp;
pub mod payment;
pub mod repository;
pub mod store;

pub use repository::RepositoryError;
pub use store::{ExpiringStore, StoreError, WindowCount};

/// Failure talking to a third-party collaborator.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("Provider rejected the request ({code}): {message}")]
    Rejected { code: i64, message: String },

    #[error("Provider unreachable: {0}")]
    Transport(String),

    #[error("Unexpected provider response: {0}")]
    Decode(String),

    #[error("{0} is not configured")]
    NotConfigured(&'static str),
}

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Validation failed: {0}")]
    Validation(String),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Otp(#[from] otp::OtpError),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

pub type CoreResult<T> = Result<T, CoreError>;
