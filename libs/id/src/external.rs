//! External identifier scheme: bare vs provider-prefixed forms, and the
//! classification step the resolver runs before any store lookup.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::codec::TagCodec;
use crate::error::{CodecError, EncodeError, ProviderMismatch, VariantParseError};

/// Separator between the provider segment and the encoded id.
pub const PROVIDER_SEPARATOR: char = '-';

/// How a tag's external id is rendered.
///
/// The registry stores this as a plain discriminator column; the difference
/// in external representation is dispatched here, not through subtyping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TagVariant {
    /// Bare keyed encoding, e.g. `3MP5M`.
    #[serde(rename = "tag")]
    Bare,
    /// Provider-prefixed encoding ("ETag"), e.g. `FO-3MP5M`.
    #[serde(rename = "etag")]
    Provider,
}

impl TagVariant {
    /// Storage/snapshot discriminator string.
    pub fn as_str(&self) -> &'static str {
        match self {
            TagVariant::Bare => "tag",
            TagVariant::Provider => "etag",
        }
    }
}

impl fmt::Display for TagVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TagVariant {
    type Err = VariantParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "tag" => Ok(TagVariant::Bare),
            "etag" => Ok(TagVariant::Provider),
            other => Err(VariantParseError(other.to_string())),
        }
    }
}

/// Result of classifying a lookup candidate, in resolution precedence order.
///
/// `ProviderId` and `BareId` carry a decoded internal id; `Secondary` means
/// both decode strategies failed structurally and the string may only match
/// a tag's secondary (NFC) key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Candidate<'a> {
    /// Decoded from this provider's prefixed form.
    ProviderId(u64),
    /// Decoded from the bare form.
    BareId(u64),
    /// Not decodable; candidate for secondary-id equality.
    Secondary(&'a str),
}

/// A codec bound to a provider namespace.
///
/// Pass one instance into the resolver at startup; configuration is explicit
/// so several schemes can coexist in tests or multi-tenant setups.
#[derive(Debug, Clone)]
pub struct ExternalIdScheme {
    codec: TagCodec,
    provider_id: String,
}

impl ExternalIdScheme {
    /// Binds `codec` to `provider_id` (stored uppercase, compared
    /// case-insensitively).
    pub fn new(codec: TagCodec, provider_id: &str) -> Result<Self, CodecError> {
        if provider_id.is_empty()
            || !provider_id.chars().all(|c| c.is_ascii_alphanumeric())
        {
            return Err(CodecError::InvalidProviderId(provider_id.to_string()));
        }
        Ok(Self {
            codec,
            provider_id: provider_id.to_ascii_uppercase(),
        })
    }

    /// The configured provider namespace, uppercase.
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// The underlying codec.
    pub fn codec(&self) -> &TagCodec {
        &self.codec
    }

    /// Renders the external id for an internal id under the given variant.
    pub fn render(&self, id: u64, variant: TagVariant) -> Result<String, EncodeError> {
        let bare = self.codec.encode(id)?;
        Ok(match variant {
            TagVariant::Bare => bare,
            TagVariant::Provider => {
                format!("{}{}{}", self.provider_id, PROVIDER_SEPARATOR, bare)
            }
        })
    }

    /// Classifies a lookup candidate without touching the store.
    ///
    /// Strategy order, first success wins:
    ///
    /// 1. provider-prefixed decode (prefix must match this provider);
    /// 2. bare decode, only when step 1 failed structurally;
    /// 3. secondary-id candidate, only when both decodes failed.
    ///
    /// A string shaped like a provider-prefixed id for a *different*
    /// provider is a hard [`ProviderMismatch`]: it must never fall through
    /// to the secondary strategy, or ids would leak across providers.
    pub fn classify<'a>(&self, candidate: &'a str) -> Result<Candidate<'a>, ProviderMismatch> {
        if let Some((prefix, rest)) = candidate.split_once(PROVIDER_SEPARATOR) {
            if prefix.eq_ignore_ascii_case(&self.provider_id) {
                if let Ok(id) = self.codec.decode(rest) {
                    return Ok(Candidate::ProviderId(id));
                }
            } else if self.foreign_provider_shaped(prefix, rest) {
                return Err(ProviderMismatch {
                    expected: self.provider_id.clone(),
                    found: prefix.to_ascii_uppercase(),
                });
            }
        }

        if let Ok(id) = self.codec.decode(candidate) {
            return Ok(Candidate::BareId(id));
        }

        Ok(Candidate::Secondary(candidate))
    }

    /// A prefix-shaped candidate counts as "well-formed for another
    /// provider" when the prefix is alphanumeric and the remainder has the
    /// shape of an encoding: alphabet characters at minimum length. We hold
    /// no foreign salt, so shape is the strongest check available.
    fn foreign_provider_shaped(&self, prefix: &str, rest: &str) -> bool {
        !prefix.is_empty()
            && prefix.chars().all(|c| c.is_ascii_alphanumeric())
            && rest.len() >= self.codec.min_length()
            && self.codec.spans_alphabet(rest)
    }
}
