use thiserror::Error;

/// Errors raised by key handling and signing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    #[error("Invalid public key: {message}")]
    InvalidPublicKey { message: String },

    #[error("Invalid private key: {message}")]
    InvalidPrivateKey { message: String },

    #[error("Invalid signature length: expected 64, got {0}")]
    InvalidSignatureLength(usize),

    #[error("Signing failed: {message}")]
    SignFailed { message: String },
}

pub type CryptoResult<T> = Result<T, CryptoError>;
