//! Tag endpoints: redirect, batch creation, claim.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::api::auth::devicehub_from_bearer;
use crate::api::error::ApiError;
use crate::state::AppState;

use tagmint_id::TagVariant;

/// Largest batch a single POST may mint.
pub const MAX_BATCH: i64 = 100;

/// `GET /{code}`: resolves the tag and redirects to its device page.
///
/// Unlinked tags are a client error, not a redirect: a printed label whose
/// tag was never assigned to a devicehub cannot lead anywhere yet.
pub async fn redirect_tag(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Response, ApiError> {
    let resolved = state
        .resolver()
        .resolve(&state.db().tag_store(), &code)
        .await?;

    match resolved.redirect_target() {
        Some(target) => {
            let location = header::HeaderValue::from_str(&target).map_err(|_| {
                ApiError::internal("internal_error", "Stored link target is invalid")
            })?;
            Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
        }
        None => Err(ApiError::bad_request(
            "not_linked",
            "The tag is not linked to a devicehub yet.",
        )),
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateParams {
    num: Option<i64>,
}

/// `POST /?num=N`: mints `N` tags pre-linked to the caller's devicehub.
///
/// Returns the external ids in allocation order. The whole batch is one
/// statement, so a failure mints nothing.
pub async fn create_tags(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<CreateParams>,
) -> Result<Json<Vec<String>>, ApiError> {
    let devicehub = devicehub_from_bearer(&state, &headers)?;

    let num = params.num.unwrap_or(0);
    if !(1..=MAX_BATCH).contains(&num) {
        return Err(ApiError::unprocessable(
            "count_out_of_bounds",
            format!("num must be between 1 and {MAX_BATCH}, got {num}."),
        ));
    }

    let rows = state
        .db()
        .tag_store()
        .create_batch(num, TagVariant::Bare, Some(&devicehub))
        .await?;

    let scheme = state.resolver().scheme();
    let mut external_ids = Vec::with_capacity(rows.len());
    for row in &rows {
        let id = scheme.render(row.id as u64, row.variant).map_err(|e| {
            tracing::error!(error = %e, id = row.id, "minted tag cannot be rendered");
            ApiError::internal("internal_error", "Minted tag is invalid")
        })?;
        external_ids.push(id);
    }

    info!(count = rows.len(), devicehub = %devicehub, "minted tags");
    Ok(Json(external_ids))
}

/// `PUT /{code}`: write-once claim of an existing tag for the caller's
/// devicehub.
///
/// Succeeds exactly once per tag; a second claim is a conflict even with the
/// same target. Batch reassignment goes through the CLI relink path instead.
pub async fn claim_tag(
    State(state): State<AppState>,
    Path(code): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let devicehub = devicehub_from_bearer(&state, &headers)?;

    let store = state.db().tag_store();
    let resolved = state.resolver().resolve(&store, &code).await?;

    store.claim(resolved.row.id, &devicehub).await?;

    info!(tag = %resolved.external_id, devicehub = %devicehub, "tag claimed");
    Ok(StatusCode::NO_CONTENT)
}
