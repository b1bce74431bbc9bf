//! Shared application state.

use std::collections::HashMap;
use std::sync::Arc;

use crate::db::Database;
use crate::resolve::TagResolver;

/// Shared state handed to every request handler.
///
/// Cheap to clone; the inner data lives behind one `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    db: Database,
    resolver: TagResolver,
    devicehubs: HashMap<String, String>,
}

impl AppState {
    pub fn new(db: Database, resolver: TagResolver, devicehubs: HashMap<String, String>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                db,
                resolver,
                devicehubs,
            }),
        }
    }

    pub fn db(&self) -> &Database {
        &self.inner.db
    }

    pub fn resolver(&self) -> &TagResolver {
        &self.inner.resolver
    }

    /// The devicehub base URL a bearer token authorizes, if any.
    pub fn devicehub_for_token(&self, token: &str) -> Option<&str> {
        self.inner.devicehubs.get(token).map(String::as_str)
    }
}
