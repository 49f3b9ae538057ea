//! HTTP route handlers.

pub mod health;
pub mod payment_term;
pub mod resource;

use axum::Router;

use crate::resources::{JournalEntry, PaymentTerm, Quotation, SalesOrder};
use crate::state::AppState;

/// Every route, without middleware layers or state.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(payment_term::with_update(resource::router::<PaymentTerm>(
            "/payment-terms",
        )))
        .merge(resource::router::<JournalEntry>("/journal-entries"))
        .merge(resource::router::<Quotation>("/quotations"))
        .merge(resource::router::<SalesOrder>("/sales-orders"))
}
