//! Payment term write endpoint.

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::routing::patch;
use axum::{Json, Router};

use crate::error::{AppError, AppResult};
use crate::resources::payment_term::{self, PaymentTermResponse, UpdatePaymentTerm};
use crate::response::Envelope;
use crate::routes::resource::parse_id;
use crate::state::AppState;

/// Partially update a payment term and return the refreshed aggregate.
async fn update_payment_term(
    State(state): State<AppState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<UpdatePaymentTerm>, JsonRejection>,
) -> AppResult<Envelope<PaymentTermResponse>> {
    let id = parse_id(path)?;
    let Json(request) = body.map_err(|rejection| AppError::BadRequest(rejection.body_text()))?;

    let updated = payment_term::update(state.repository(), id, request).await?;
    Ok(Envelope::ok(updated))
}

/// Add PATCH alongside the generic GET on the same detail path.
pub fn with_update(router: Router<AppState>) -> Router<AppState> {
    router.route("/payment-terms/{id}", patch(update_payment_term))
}
