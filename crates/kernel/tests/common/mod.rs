#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common test utilities for integration tests.
//!
//! Database-backed tests build a [`TestApp`] over the real router and a real
//! PostgreSQL pool. When `DATABASE_URL` is unset, [`TestApp::connect`]
//! returns `None` and the test returns early.

#![allow(dead_code)]

use std::time::Duration;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, header};
use axum::response::Response;
use http_body_util::BodyExt;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use tower::ServiceExt;

use ledgerline_kernel::db;
use ledgerline_kernel::query::PageLimits;
use ledgerline_kernel::routes;
use ledgerline_kernel::state::AppState;
use ledgerline_test_utils::test_database_url;

/// Test application: the full router plus direct pool access for fixtures.
pub struct TestApp {
    pub router: Router,
    pub db: PgPool,
}

impl TestApp {
    /// Connect and migrate, or `None` without `DATABASE_URL`.
    pub async fn connect() -> Option<Self> {
        let Some(url) = test_database_url() else {
            eprintln!("DATABASE_URL not set; skipping database test");
            return None;
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .expect("Failed to connect to test database");
        db::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let state = AppState::from_pool(
            pool.clone(),
            PageLimits::default(),
            Duration::from_secs(10),
        );
        Some(Self {
            router: routes::router().with_state(state),
            db: pool,
        })
    }

    /// Send a request to the test application.
    pub async fn request(&self, request: Request<Body>) -> Response {
        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    pub async fn get(&self, uri: &str) -> Response {
        self.request(Request::get(uri).body(Body::empty()).unwrap())
            .await
    }

    pub async fn patch_json(&self, uri: &str, body: serde_json::Value) -> Response {
        let request = Request::patch(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        self.request(request).await
    }

    // -------------------------------------------------------------------------
    // Fixtures
    // -------------------------------------------------------------------------

    pub async fn insert_payment_term(&self, name: &str, lines: &[(i32, &str, i64, i32)]) -> i64 {
        let id: i64 =
            sqlx::query_scalar("INSERT INTO payment_terms (name) VALUES ($1) RETURNING id")
                .bind(name)
                .fetch_one(&self.db)
                .await
                .unwrap();
        for (sequence, value_type, value, days) in lines {
            sqlx::query(
                "INSERT INTO payment_term_lines (payment_term_id, sequence, value_type, value, days)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(id)
            .bind(sequence)
            .bind(value_type)
            .bind(value)
            .bind(days)
            .execute(&self.db)
            .await
            .unwrap();
        }
        id
    }

    pub async fn insert_account(&self, code: &str, name: &str, kind: &str) -> i64 {
        sqlx::query_scalar("INSERT INTO accounts (code, name, kind) VALUES ($1, $2, $3) RETURNING id")
            .bind(code)
            .bind(name)
            .bind(kind)
            .fetch_one(&self.db)
            .await
            .unwrap()
    }

    /// Insert an entry with `(account_id, debit, credit)` lines.
    pub async fn insert_journal_entry(
        &self,
        number: &str,
        entry_date: chrono::NaiveDate,
        posted: bool,
        lines: &[(i64, i64, i64)],
    ) -> i64 {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO journal_entries (number, entry_date, posted)
             VALUES ($1, $2, $3) RETURNING id",
        )
        .bind(number)
        .bind(entry_date)
        .bind(posted)
        .fetch_one(&self.db)
        .await
        .unwrap();
        for (account_id, debit, credit) in lines {
            sqlx::query(
                "INSERT INTO journal_lines (journal_entry_id, account_id, debit, credit)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(account_id)
            .bind(debit)
            .bind(credit)
            .execute(&self.db)
            .await
            .unwrap();
        }
        id
    }

    pub async fn insert_customer(&self, name: &str) -> i64 {
        sqlx::query_scalar("INSERT INTO customers (name) VALUES ($1) RETURNING id")
            .bind(name)
            .fetch_one(&self.db)
            .await
            .unwrap()
    }

    pub async fn insert_quotation(
        &self,
        number: &str,
        customer_id: i64,
        payment_term_id: Option<i64>,
        items: &[(&str, i32, i64)],
    ) -> i64 {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO quotations (number, quotation_date, customer_id, payment_term_id)
             VALUES ($1, CURRENT_DATE, $2, $3) RETURNING id",
        )
        .bind(number)
        .bind(customer_id)
        .bind(payment_term_id)
        .fetch_one(&self.db)
        .await
        .unwrap();
        for (product_name, quantity, unit_price) in items {
            sqlx::query(
                "INSERT INTO quotation_items (quotation_id, product_name, quantity, unit_price)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(product_name)
            .bind(quantity)
            .bind(unit_price)
            .execute(&self.db)
            .await
            .unwrap();
        }
        id
    }

    pub async fn insert_sales_order(
        &self,
        number: &str,
        order_date: chrono::NaiveDate,
        quotation_id: i64,
        customer_id: i64,
        items: &[(&str, i32, i64)],
    ) -> i64 {
        let id: i64 = sqlx::query_scalar(
            "INSERT INTO sales_orders (number, order_date, quotation_id, customer_id)
             VALUES ($1, $2, $3, $4) RETURNING id",
        )
        .bind(number)
        .bind(order_date)
        .bind(quotation_id)
        .bind(customer_id)
        .fetch_one(&self.db)
        .await
        .unwrap();
        for (product_name, quantity, unit_price) in items {
            sqlx::query(
                "INSERT INTO sales_order_items (sales_order_id, product_name, quantity, unit_price)
                 VALUES ($1, $2, $3, $4)",
            )
            .bind(id)
            .bind(product_name)
            .bind(quantity)
            .bind(unit_price)
            .execute(&self.db)
            .await
            .unwrap();
        }
        id
    }
}

/// Collect a response body as JSON.
pub async fn body_json(response: Response) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

/// `X-Total-Count` as a number.
pub fn total_count(response: &Response) -> i64 {
    response.headers()["x-total-count"]
        .to_str()
        .unwrap()
        .parse()
        .unwrap()
}
