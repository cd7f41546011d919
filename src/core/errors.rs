use thiserror::Error;

/// Error taxonomy for the Verifier pipeline.
///
/// Protocol-input errors are fatal for the affected chain or message and
/// are never repaired locally. Insufficient-data conditions are not
/// failures; callers typically carry them into a `Verdict` rather than
/// propagate them. Timing and resource conditions are surfaced
/// immediately with no retry. Internal faults either downgrade a verdict
/// (numerical failure) or abort the operation (I/O fault).
#[derive(Error, Debug)]
pub enum VerifierError {
    #[error("malformed canonical encoding: {0}")]
    MalformedEncoding(String),

    #[error("invalid signature at index {0}")]
    InvalidSignature(u64),

    #[error("index gap at {index}, expected {expected}")]
    IndexGap { index: u64, expected: u64 },

    #[error("timestamp regression at index {0}")]
    TimestampRegress(u64),

    #[error("broken predecessor link at index {0}")]
    BrokenLink(u64),

    #[error("duplicate cell at index {0}")]
    DuplicateCell(u64),

    #[error("collection interval too short at index {0}")]
    IntervalTooShort(u64),

    #[error("per-cell cap exceeded for cell {0}")]
    CellCapExceeded(u64),

    #[error("nonce was already issued")]
    NonceReuse,

    #[error("response nonce does not match the issued nonce")]
    NonceMismatch,

    #[error("response chain-head hash does not match the verifier's stored head")]
    HeadHashMismatch,

    #[error("insufficient data: {have} samples, need at least {need}")]
    InsufficientData { have: usize, need: usize },

    #[error("challenge timed out waiting for a liveness response")]
    ChallengeTimeout,

    #[error("deadline exceeded for operation: {0}")]
    DeadlineExceeded(String),

    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("numerical failure in {0}: non-finite result")]
    NumericalFailure(String),

    #[error("persistence fault: {0}")]
    IoFault(#[from] std::io::Error),

    #[error("invalid identity key: expected 32 bytes, got {0}")]
    InvalidIdentitySize(usize),

    #[error("invalid signature size: expected 64 bytes, got {0}")]
    InvalidSignatureSize(usize),

    #[error("invalid nonce size: expected 16 bytes, got {0}")]
    InvalidNonceSize(usize),

    #[error("identity is not present in the trusted registry")]
    UntrustedIdentity,

    #[error("cryptographic operation failed: {0}")]
    CryptographicError(String),

    #[error("chain not found for identity")]
    ChainNotFound,

    #[error("no challenge outstanding for this identity")]
    NoChallengeOutstanding,

    #[error("a challenge is already outstanding for this identity")]
    ChallengeAlreadyOutstanding,

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type VerifierResult<T> = std::result::Result<T, VerifierError>;
