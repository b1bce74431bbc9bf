//! # tagmint-id
//!
//! The keyed identifier codec for the tagmint tag registry.
//!
//! ## Design Principles
//!
//! - Internal tag ids are small sequence integers; external ids are opaque
//!   alphanumeric strings derived from them on demand, never stored
//! - The transform is keyed by a private salt: without it, third parties
//!   cannot invert an external id or enumerate neighboring ids
//! - Encoding is deterministic and strictly reversible (round-trip law)
//! - Decoding is strict: strings outside the codec's output space are
//!   rejected, not coerced
//!
//! ## External Format
//!
//! A tag has one of two external forms:
//!
//! - bare: `3MP5M` (at least [`DEFAULT_MIN_LENGTH`] characters)
//! - provider-prefixed ("ETag"): `FO-3MP5M`
//!
//! Both embed the same internal id. The provider segment namespaces ids
//! across tag providers and is compared case-insensitively.

mod codec;
mod error;
mod external;

pub use codec::{TagCodec, DEFAULT_ALPHABET, DEFAULT_MIN_LENGTH, MAX_TAG_ID, MIN_TAG_ID};
pub use error::{CodecError, DecodeError, EncodeError, ProviderMismatch, VariantParseError};
pub use external::{Candidate, ExternalIdScheme, TagVariant, PROVIDER_SEPARATOR};
