//! Domain errors for fork-aware discovery.

use thiserror::Error;

/// Failure to read a fork-identity entry out of a node record.
///
/// The compatibility gate turns every variant into a `Reject` decision;
/// none of them is ever fatal to the node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The record has no entry under the fork-identity key.
    #[error("record has no '{0}' entry")]
    MissingEntry(&'static str),

    /// The entry is not exactly the fixed encoded width.
    #[error("fork entry must be {expected} bytes, got {actual}")]
    InvalidLength {
        /// Fixed width of the encoding.
        expected: usize,
        /// Length actually received.
        actual: usize,
    },
}

/// Failure to parse or validate a node record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    /// Input ended before the record was complete.
    #[error("record truncated")]
    Truncated,

    /// Bytes left over after the signature.
    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),

    /// Encoded record exceeds the size limit.
    #[error("record is {size} bytes, limit is {limit}")]
    TooLarge {
        /// Encoded size.
        size: usize,
        /// Configured limit.
        limit: usize,
    },

    /// Unknown address family tag.
    #[error("invalid ip tag {0}")]
    InvalidIpTag(u8),

    /// Entry key is not valid UTF-8 or is empty.
    #[error("invalid entry key")]
    InvalidKey,

    /// The same key appears twice.
    #[error("duplicate entry key '{0}'")]
    DuplicateKey(String),

    /// Too many entries to encode.
    #[error("too many entries ({0})")]
    TooManyEntries(usize),

    /// Entry value longer than the encoding allows.
    #[error("entry '{0}' value too long")]
    ValueTooLong(String),

    /// Textual form lacks the `enr:` prefix.
    #[error("textual record must start with 'enr:'")]
    MissingPrefix,

    /// Textual form is not valid base64url.
    #[error("invalid base64 in textual record")]
    InvalidBase64,

    /// Signature does not verify against the record's public key.
    #[error("record signature is invalid")]
    InvalidSignature,
}

/// Failure to produce a record signature.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SigningError {
    /// The signer does not hold the key the record was built for.
    #[error("signer key does not match record public key")]
    KeyMismatch,

    /// The signing key is unavailable or the backend failed.
    #[error("signing failed: {0}")]
    Backend(String),
}

/// Invalid static network configuration. Surfaced at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// File I/O error.
    #[error("failed to read {path}: {error}")]
    Io {
        /// Path of the file that failed to load.
        path: String,
        /// Error message from the I/O operation.
        error: String,
    },

    /// TOML parse error.
    #[error("failed to parse config: {0}")]
    Parse(String),

    /// Fork schedule is empty or inconsistent.
    #[error("invalid fork schedule: {0}")]
    InvalidSchedule(String),

    /// Slot timing would divide by zero.
    #[error("invalid chain timing: {0}")]
    InvalidTiming(String),

    /// A hex value has the wrong shape.
    #[error("invalid hex value for {field}: {reason}")]
    InvalidHex {
        /// Config field name.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },

    /// Socket address did not parse.
    #[error("invalid address '{0}'")]
    InvalidAddress(String),

    /// Discovery parameter out of range.
    #[error("invalid discovery parameter {field}: {reason}")]
    InvalidDiscovery {
        /// Config field name.
        field: &'static str,
        /// What was wrong with it.
        reason: String,
    },
}

/// Failure in the local identity lifecycle.
///
/// A node must not advertise a record it could not sign, so these are fatal
/// to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdentityError {
    /// Re-signing the local record failed.
    #[error("could not sign local record: {0}")]
    Signing(#[from] SigningError),

    /// The freshly signed record does not encode.
    #[error("local record invalid: {0}")]
    Record(#[from] RecordError),

    /// Genesis data is immutable once known.
    #[error("genesis already set to a different value")]
    GenesisAlreadySet,
}

/// Failure of the discovery engine lifecycle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DiscoveryError {
    /// The UDP socket could not be bound. Fatal; not retried.
    #[error("failed to bind discovery socket on {addr}: {reason}")]
    Bind {
        /// Requested listen address.
        addr: String,
        /// OS error.
        reason: String,
    },

    /// A bootstrap string is not a valid signed textual record.
    #[error("invalid bootstrap record '{input}': {reason}")]
    InvalidBootstrapRecord {
        /// The offending input, as given.
        input: String,
        /// Why it failed to parse.
        reason: RecordError,
    },

    /// Updating the local record failed during startup.
    #[error(transparent)]
    Identity(#[from] IdentityError),
}
