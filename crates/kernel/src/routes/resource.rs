//! Generic list and detail endpoints for any [`Resource`].
//!
//! Query parameters are parsed against the resource's allow-list; whatever
//! does not validate is dropped and logged, never reported to the client.

use axum::Router;
use axum::extract::rejection::PathRejection;
use axum::extract::{Path, Query, State};
use axum::routing::get;

use crate::error::{AppError, AppResult};
use crate::query::parse_query_pairs;
use crate::resources::Resource;
use crate::response::{Envelope, Listing};
use crate::state::AppState;

/// `GET {path}` and `GET {path}/{id}`.
pub fn router<R: Resource>(path: &str) -> Router<AppState> {
    Router::new()
        .route(path, get(list::<R>))
        .route(&format!("{path}/{{id}}"), get(detail::<R>))
}

/// Extract a numeric id, rendering a bad one as an envelope.
pub fn parse_id(path: Result<Path<i64>, PathRejection>) -> AppResult<i64> {
    path.map(|Path(id)| id)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

async fn list<R: Resource>(
    State(state): State<AppState>,
    Query(pairs): Query<Vec<(String, String)>>,
) -> AppResult<Listing<R::Response>> {
    let parsed = parse_query_pairs(pairs, R::allow_list(), state.page_limits());

    for rejection in &parsed.rejections {
        tracing::debug!(resource = R::NAME, %rejection, "dropped query parameter");
    }

    let page = state.repository().list::<R>(&parsed.params).await?;
    Ok(Listing(page))
}

async fn detail<R: Resource>(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
) -> AppResult<Envelope<R::Response>> {
    let id = parse_id(path)?;
    let aggregate = state.repository().get::<R>(id).await?;
    Ok(Envelope::ok(aggregate))
}
