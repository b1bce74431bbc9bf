//! Error types for codec construction, encoding and decoding.

use thiserror::Error;

/// Errors raised while constructing a [`crate::TagCodec`] or
/// [`crate::ExternalIdScheme`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// The alphabet has too few distinct characters.
    #[error("alphabet must contain at least {min} characters, got {len}")]
    AlphabetTooSmall { len: usize, min: usize },

    /// The alphabet contains the same character twice.
    #[error("alphabet contains duplicate character {0:?}")]
    DuplicateCharacter(char),

    /// The alphabet contains a character outside printable ASCII.
    #[error("alphabet character {0:?} is not printable ASCII")]
    UnprintableCharacter(char),

    /// The alphabet contains the provider separator.
    #[error("alphabet must not contain the provider separator '-'")]
    SeparatorInAlphabet,

    /// The alphabet contains both cases of the same letter. Decoding is
    /// case-insensitive, so the two would be indistinguishable.
    #[error("alphabet contains both cases of {0:?}")]
    MixedCaseAlphabet(char),

    /// The minimum length is outside the supported range.
    #[error("minimum length must be between {min} and {max}, got {value}")]
    MinLengthOutOfRange {
        value: usize,
        min: usize,
        max: usize,
    },

    /// The provider id is empty, non-alphanumeric, or contains a separator.
    #[error("provider id must be non-empty alphanumeric ASCII, got {0:?}")]
    InvalidProviderId(String),
}

/// Errors raised while encoding an internal id.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// The id does not fit the printable label range.
    #[error("tag id {id} is outside the range {min}..{max}")]
    IdOutOfRange { id: u64, min: u64, max: u64 },
}

/// Errors raised while decoding an external string.
///
/// All variants mean the same thing to a resolver: the string is not a
/// member of this codec's output space, and the next resolution strategy
/// may be attempted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The input is empty.
    #[error("external id is empty")]
    Empty,

    /// The input is shorter than any encoding this codec produces.
    #[error("external id is too short ({len} characters)")]
    TooShort { len: usize },

    /// The input contains a character outside the codec alphabet.
    #[error("invalid character {ch:?} in external id")]
    InvalidCharacter { ch: char },

    /// The keyed check character does not match. Typical for strings
    /// produced under a different salt.
    #[error("check character mismatch")]
    ChecksumMismatch,

    /// The decoded value falls outside the valid internal id range.
    #[error("decoded id is outside the valid range")]
    OutOfRange,

    /// The string decodes to an id whose canonical encoding differs,
    /// e.g. overlong zero padding.
    #[error("external id is not in canonical form")]
    NotCanonical,
}

/// A well-formed provider-prefixed id that belongs to a different provider.
///
/// Kept distinct from [`DecodeError`] so callers can surface "not for this
/// provider" instead of treating the input as malformed or unknown.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("tag belongs to provider {found:?}, this registry serves {expected:?}")]
pub struct ProviderMismatch {
    pub expected: String,
    pub found: String,
}

/// Error parsing a [`crate::TagVariant`] discriminator.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown tag variant {0:?}, expected \"tag\" or \"etag\"")]
pub struct VariantParseError(pub String);
