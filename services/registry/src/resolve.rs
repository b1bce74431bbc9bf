//! Dual-scheme tag resolution.
//!
//! Turns an opaque path segment into a stored tag: keyed decode first
//! (provider-prefixed, then bare), secondary-id equality as the fallback.
//! Classification is pure; only the winning strategy touches the store.

use async_trait::async_trait;
use thiserror::Error;
use tracing::debug;

use tagmint_id::{Candidate, EncodeError, ExternalIdScheme, ProviderMismatch};

use crate::db::{DbError, TagRow, TagStore};

/// Store lookups the resolver needs.
///
/// A seam for unit tests; [`TagStore`] is the production implementation.
#[async_trait]
pub trait TagLookup: Send + Sync {
    async fn by_id(&self, id: i64) -> Result<Option<TagRow>, DbError>;
    async fn by_secondary(&self, secondary: &str) -> Result<Option<TagRow>, DbError>;
}

#[async_trait]
impl TagLookup for TagStore {
    async fn by_id(&self, id: i64) -> Result<Option<TagRow>, DbError> {
        self.get(id).await
    }

    async fn by_secondary(&self, secondary: &str) -> Result<Option<TagRow>, DbError> {
        self.get_by_secondary(secondary).await
    }
}

/// Why resolution failed.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// Well-formed id for a different provider. Never retried against the
    /// secondary index.
    #[error(transparent)]
    ProviderMismatch(#[from] ProviderMismatch),

    /// No tag matches under any strategy.
    #[error("tag not found")]
    NotFound,

    /// A stored row's id cannot be re-rendered. Indicates data outside the
    /// codec range, which the table check constraint should prevent.
    #[error("stored tag id cannot be rendered: {0}")]
    Render(#[from] EncodeError),

    #[error(transparent)]
    Db(#[from] DbError),
}

/// A resolved tag together with its canonical external id.
#[derive(Debug, Clone)]
pub struct ResolvedTag {
    pub row: TagRow,
    pub external_id: String,
}

impl ResolvedTag {
    /// The device URL this tag redirects to, when linked.
    pub fn redirect_target(&self) -> Option<String> {
        self.row
            .link_target
            .as_ref()
            .map(|base| format!("{base}/tags/{}/device", self.external_id))
    }
}

/// Resolves external strings to stored tags under one provider scheme.
#[derive(Clone)]
pub struct TagResolver {
    scheme: ExternalIdScheme,
}

impl TagResolver {
    pub fn new(scheme: ExternalIdScheme) -> Self {
        Self { scheme }
    }

    pub fn scheme(&self) -> &ExternalIdScheme {
        &self.scheme
    }

    /// Resolves `code` against the store.
    ///
    /// A successful decode commits to the id strategy: a decoded id that is
    /// not stored is `NotFound` and never retried against the secondary
    /// index. Only structurally undecodable strings reach that index.
    pub async fn resolve(
        &self,
        lookup: &dyn TagLookup,
        code: &str,
    ) -> Result<ResolvedTag, ResolveError> {
        match self.scheme.classify(code)? {
            Candidate::ProviderId(id) | Candidate::BareId(id) => {
                match lookup.by_id(id as i64).await? {
                    Some(row) => self.finish(row),
                    None => {
                        debug!(id, code, "decoded id not stored");
                        Err(ResolveError::NotFound)
                    }
                }
            }
            Candidate::Secondary(secondary) => match lookup.by_secondary(secondary).await? {
                Some(row) => self.finish(row),
                None => Err(ResolveError::NotFound),
            },
        }
    }

    fn finish(&self, row: TagRow) -> Result<ResolvedTag, ResolveError> {
        let external_id = self.scheme.render(row.id as u64, row.variant)?;
        Ok(ResolvedTag { row, external_id })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Utc;
    use tagmint_id::{TagCodec, TagVariant, DEFAULT_ALPHABET, DEFAULT_MIN_LENGTH};

    use super::*;

    struct MemoryLookup {
        rows: HashMap<i64, TagRow>,
    }

    impl MemoryLookup {
        fn new(rows: Vec<TagRow>) -> Self {
            Self {
                rows: rows.into_iter().map(|row| (row.id, row)).collect(),
            }
        }
    }

    #[async_trait]
    impl TagLookup for MemoryLookup {
        async fn by_id(&self, id: i64) -> Result<Option<TagRow>, DbError> {
            Ok(self.rows.get(&id).cloned())
        }

        async fn by_secondary(&self, secondary: &str) -> Result<Option<TagRow>, DbError> {
            Ok(self
                .rows
                .values()
                .find(|row| row.secondary.as_deref() == Some(secondary))
                .cloned())
        }
    }

    fn row(id: i64, variant: TagVariant, secondary: Option<&str>, target: Option<&str>) -> TagRow {
        let now = Utc::now();
        TagRow {
            id,
            secondary: secondary.map(str::to_string),
            variant,
            link_target: target.map(str::to_string),
            created_at: now,
            updated_at: now,
        }
    }

    fn resolver() -> TagResolver {
        let codec = TagCodec::new("So salty", DEFAULT_MIN_LENGTH, DEFAULT_ALPHABET).unwrap();
        TagResolver::new(ExternalIdScheme::new(codec, "FO").unwrap())
    }

    #[tokio::test]
    async fn resolves_bare_encoding() {
        let resolver = resolver();
        let lookup = MemoryLookup::new(vec![row(1, TagVariant::Bare, None, Some("https://dh.example"))]);
        let code = resolver.scheme().render(1, TagVariant::Bare).unwrap();

        let resolved = resolver.resolve(&lookup, &code).await.unwrap();
        assert_eq!(resolved.row.id, 1);
        assert_eq!(resolved.external_id, code);
        assert_eq!(
            resolved.redirect_target().unwrap(),
            format!("https://dh.example/tags/{code}/device")
        );
    }

    #[tokio::test]
    async fn resolves_provider_encoding_and_renders_prefixed_external_id() {
        let resolver = resolver();
        let lookup = MemoryLookup::new(vec![row(7, TagVariant::Provider, None, None)]);
        let code = resolver.scheme().render(7, TagVariant::Provider).unwrap();

        let resolved = resolver.resolve(&lookup, &code).await.unwrap();
        assert!(resolved.external_id.starts_with("FO-"));
        assert!(resolved.redirect_target().is_none());
    }

    #[tokio::test]
    async fn stored_variant_wins_over_lookup_form() {
        // A provider tag found via its bare form still renders prefixed.
        let resolver = resolver();
        let lookup = MemoryLookup::new(vec![row(7, TagVariant::Provider, None, None)]);
        let bare = resolver.scheme().render(7, TagVariant::Bare).unwrap();

        let resolved = resolver.resolve(&lookup, &bare).await.unwrap();
        assert_eq!(
            resolved.external_id,
            resolver.scheme().render(7, TagVariant::Provider).unwrap()
        );
    }

    #[tokio::test]
    async fn falls_back_to_secondary_index() {
        let resolver = resolver();
        let lookup = MemoryLookup::new(vec![row(3, TagVariant::Bare, Some("NFC123"), None)]);

        let resolved = resolver.resolve(&lookup, "NFC123").await.unwrap();
        assert_eq!(resolved.row.id, 3);
    }

    #[tokio::test]
    async fn foreign_provider_never_reaches_the_secondary_index() {
        let resolver = resolver();
        let bare = resolver.scheme().render(5, TagVariant::Bare).unwrap();
        let foreign = format!("XX-{bare}");
        // Even a secondary id equal to the foreign string must not match.
        let lookup = MemoryLookup::new(vec![row(5, TagVariant::Bare, Some(foreign.as_str()), None)]);

        let err = resolver.resolve(&lookup, &foreign).await.unwrap_err();
        assert!(matches!(err, ResolveError::ProviderMismatch(_)));
    }

    #[tokio::test]
    async fn decoded_id_miss_does_not_retry_the_secondary_index() {
        let resolver = resolver();
        let code = resolver.scheme().render(8, TagVariant::Bare).unwrap();
        // A secondary equal to a decodable string is shadowed by the decode
        // strategy.
        let lookup = MemoryLookup::new(vec![row(3, TagVariant::Bare, Some(code.as_str()), None)]);

        assert!(matches!(
            resolver.resolve(&lookup, &code).await.unwrap_err(),
            ResolveError::NotFound
        ));
    }

    #[tokio::test]
    async fn unknown_code_is_not_found() {
        let resolver = resolver();
        let lookup = MemoryLookup::new(vec![]);
        let code = resolver.scheme().render(42, TagVariant::Bare).unwrap();

        assert!(matches!(
            resolver.resolve(&lookup, &code).await.unwrap_err(),
            ResolveError::NotFound
        ));
        assert!(matches!(
            resolver.resolve(&lookup, "no-such-secondary").await.unwrap_err(),
            ResolveError::NotFound
        ));
    }
}
