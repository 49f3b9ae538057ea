#![allow(clippy::unwrap_used, clippy::expect_used)]
//! End-to-end listing tests over HTTP against PostgreSQL.
//!
//! Each test tags its fixtures with a unique string and filters on it, so
//! runs can share a database.

mod common;

use axum::http::StatusCode;
use ledgerline_test_utils::{assert_non_decreasing, date, unique_tag};

use common::{TestApp, body_json, total_count};

// -----------------------------------------------------------------------------
// Payment terms
// -----------------------------------------------------------------------------

#[tokio::test]
async fn like_filter_pages_parents_and_reports_total() {
    let Some(app) = TestApp::connect().await else {
        return;
    };
    let tag = unique_tag("pt");

    let net30 = app
        .insert_payment_term(
            &format!("{tag} Net 30"),
            &[(1, "percent", 3_000, 0), (2, "balance", 0, 30)],
        )
        .await;
    app.insert_payment_term(&format!("{tag} 30 days EOM"), &[(1, "balance", 0, 30)])
        .await;
    app.insert_payment_term(&format!("{tag} Net 60"), &[]).await;

    let response = app
        .get(&format!("/payment-terms?name:like={tag}&name:like=30&limit=1"))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(total_count(&response), 2);

    let body = body_json(response).await;
    assert_eq!(body["code"], 200);
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1, "limit counts parents, not joined rows");
    assert_eq!(data[0]["id"], net30);
    assert_eq!(data[0]["lines"].as_array().unwrap().len(), 2);
    assert_eq!(data[0]["allocated_percent"], 3_000);
}

#[tokio::test]
async fn unknown_parameters_are_ignored() {
    let Some(app) = TestApp::connect().await else {
        return;
    };
    let tag = unique_tag("pt");
    app.insert_payment_term(&format!("{tag} A"), &[]).await;
    app.insert_payment_term(&format!("{tag} B"), &[]).await;

    let response = app
        .get(&format!(
            "/payment-terms?name:like={tag}&secret:eq=1&id:gt=abc&name:regex=x&sort:password=asc&limit=0"
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(total_count(&response), 2);
}

#[tokio::test]
async fn unbindable_values_are_dropped_not_failed() {
    let Some(app) = TestApp::connect().await else {
        return;
    };
    let tag = unique_tag("pt");
    app.insert_payment_term(&format!("{tag} A"), &[]).await;

    let response = app
        .get(&format!(
            "/payment-terms?name:like={tag}&offset=9223372036854775808&name:eq=a%00b"
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(total_count(&response), 1);
    assert_eq!(body_json(response).await["data"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn user_sort_precedes_default_ordering() {
    let Some(app) = TestApp::connect().await else {
        return;
    };
    let tag = unique_tag("pt");
    for name in ["b", "c", "a"] {
        app.insert_payment_term(&format!("{tag} {name}"), &[(1, "balance", 0, 0)])
            .await;
    }

    let response = app
        .get(&format!("/payment-terms?name:like={tag}&sort:name=desc"))
        .await;
    let body = body_json(response).await;
    let names: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|term| term["name"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(
        names,
        vec![format!("{tag} c"), format!("{tag} b"), format!("{tag} a")]
    );
}

#[tokio::test]
async fn term_without_lines_has_empty_collection() {
    let Some(app) = TestApp::connect().await else {
        return;
    };
    let tag = unique_tag("pt");
    let id = app.insert_payment_term(&format!("{tag} empty"), &[]).await;

    let body = body_json(app.get(&format!("/payment-terms/{id}")).await).await;
    assert_eq!(body["data"]["lines"], serde_json::json!([]));
}

#[tokio::test]
async fn detail_of_missing_term_is_not_found() {
    let Some(app) = TestApp::connect().await else {
        return;
    };
    let response = app.get("/payment-terms/9223372036854775807").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let body = body_json(response).await;
    assert_eq!(body["code"], 404);
    assert!(body["data"].is_null());
}

#[tokio::test]
async fn non_numeric_id_is_bad_request() {
    let Some(app) = TestApp::connect().await else {
        return;
    };
    let response = app.get("/payment-terms/abc").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], 400);
}

#[tokio::test]
async fn patch_updates_only_given_fields() {
    let Some(app) = TestApp::connect().await else {
        return;
    };
    let tag = unique_tag("pt");
    let id = app
        .insert_payment_term(&format!("{tag} old"), &[(1, "balance", 0, 0)])
        .await;

    let response = app
        .patch_json(
            &format!("/payment-terms/{id}"),
            serde_json::json!({ "description": "Pay on delivery" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["data"]["name"], format!("{tag} old"));
    assert_eq!(body["data"]["description"], "Pay on delivery");
    assert_eq!(body["data"]["lines"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn patch_of_missing_term_is_not_found() {
    let Some(app) = TestApp::connect().await else {
        return;
    };
    let response = app
        .patch_json(
            "/payment-terms/9223372036854775807",
            serde_json::json!({ "name": "ghost" }),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// -----------------------------------------------------------------------------
// Journal entries
// -----------------------------------------------------------------------------

#[tokio::test]
async fn journal_entries_filter_on_posted_and_entry_date() {
    let Some(app) = TestApp::connect().await else {
        return;
    };
    let tag = unique_tag("je");
    let cash = app
        .insert_account(&format!("{tag}-1000"), "Cash", "asset")
        .await;
    let sales = app
        .insert_account(&format!("{tag}-4000"), "Sales", "revenue")
        .await;

    let balanced = app
        .insert_journal_entry(
            &format!("{tag}-1"),
            date(2024, 3, 5),
            true,
            &[(cash, 1_500, 0), (sales, 0, 1_500)],
        )
        .await;
    app.insert_journal_entry(&format!("{tag}-2"), date(2024, 3, 6), false, &[(cash, 900, 0)])
        .await;
    app.insert_journal_entry(
        &format!("{tag}-3"),
        date(2024, 2, 1),
        true,
        &[(cash, 100, 0), (sales, 0, 100)],
    )
    .await;

    let response = app
        .get(&format!(
            "/journal-entries?number:like={tag}&posted:eq=true&entry-date:gte=2024-03-01"
        ))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(total_count(&response), 1);

    let body = body_json(response).await;
    let data = body["data"].as_array().unwrap();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0]["id"], balanced);
    assert_eq!(data[0]["posted"], true);
    assert_eq!(data[0]["total_debit"], 1_500);
    assert_eq!(data[0]["total_credit"], 1_500);
    assert_eq!(data[0]["balanced"], true);

    let response = app
        .get(&format!("/journal-entries?number:like={tag}&posted:eq=false"))
        .await;
    assert_eq!(total_count(&response), 1);
    let body = body_json(response).await;
    assert_eq!(body["data"][0]["number"], format!("{tag}-2"));
}

#[tokio::test]
async fn journal_entry_detail_nests_accounts_under_lines() {
    let Some(app) = TestApp::connect().await else {
        return;
    };
    let tag = unique_tag("je");
    let cash = app
        .insert_account(&format!("{tag}-1000"), "Cash", "asset")
        .await;
    let entry = app
        .insert_journal_entry(&format!("{tag}-1"), date(2024, 4, 2), false, &[(cash, 250, 0)])
        .await;

    let response = app.get(&format!("/journal-entries/{entry}")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    let data = &body["data"];
    assert_eq!(data["entry_date"], "2024-04-02");
    assert_eq!(data["lines"].as_array().unwrap().len(), 1);
    assert_eq!(data["lines"][0]["account"]["id"], cash);
    assert_eq!(data["lines"][0]["account"]["code"], format!("{tag}-1000"));
    assert_eq!(data["lines"][0]["debit"], 250);
    assert_eq!(data["total_credit"], 0);
    assert_eq!(data["balanced"], false);

    let empty = app
        .insert_journal_entry(&format!("{tag}-2"), date(2024, 4, 3), false, &[])
        .await;
    let body = body_json(app.get(&format!("/journal-entries/{empty}")).await).await;
    assert_eq!(body["data"]["lines"], serde_json::json!([]));
    assert_eq!(body["data"]["balanced"], true);
}

// -----------------------------------------------------------------------------
// Quotations and sales orders
// -----------------------------------------------------------------------------

#[tokio::test]
async fn quotation_carries_customer_and_totals() {
    let Some(app) = TestApp::connect().await else {
        return;
    };
    let tag = unique_tag("q");
    let customer = app.insert_customer(&format!("{tag} Initech")).await;
    let quotation = app
        .insert_quotation(
            &format!("{tag}-1"),
            customer,
            None,
            &[("Stapler", 2, 1_250), ("Desk", 1, 30_000)],
        )
        .await;

    let response = app
        .get(&format!("/quotations?number:eq={tag}-1"))
        .await;
    assert_eq!(total_count(&response), 1);

    let body = body_json(response).await;
    let found = &body["data"][0];
    assert_eq!(found["id"], quotation);
    assert_eq!(found["customer"]["id"], customer);
    assert!(found["payment_term"].is_null());
    assert_eq!(found["subtotal"], 32_500);
    assert_eq!(found["total"], 32_500);
}

#[tokio::test]
async fn sales_order_schedule_over_cross_product() {
    let Some(app) = TestApp::connect().await else {
        return;
    };
    let tag = unique_tag("so");
    let term = app
        .insert_payment_term(
            &format!("{tag} 40/60"),
            &[(1, "percent", 4_000, 0), (2, "balance", 0, 30)],
        )
        .await;
    let customer = app.insert_customer(&format!("{tag} Umbrella")).await;
    let quotation = app
        .insert_quotation(&format!("{tag}-Q"), customer, Some(term), &[])
        .await;
    let order = app
        .insert_sales_order(
            &format!("{tag}-SO"),
            date(2024, 4, 1),
            quotation,
            customer,
            &[("Bolt", 10, 50), ("Nut", 10, 50), ("Washer", 5, 100)],
        )
        .await;

    let body = body_json(app.get(&format!("/sales-orders/{order}")).await).await;
    let data = &body["data"];
    assert_eq!(data["items"].as_array().unwrap().len(), 3);
    assert_eq!(data["payment_term_lines"].as_array().unwrap().len(), 2);
    assert_eq!(data["total"], 1_500);
    assert_eq!(data["schedule"][0]["amount"], 600);
    assert_eq!(data["schedule"][1]["amount"], 900);
    assert_eq!(data["schedule"][1]["due_date"], "2024-05-01");
}

#[tokio::test]
async fn sales_orders_sort_by_order_date_ascending() {
    let Some(app) = TestApp::connect().await else {
        return;
    };
    let tag = unique_tag("so");
    let customer = app.insert_customer(&format!("{tag} Hooli")).await;
    let quotation = app
        .insert_quotation(&format!("{tag}-Q"), customer, None, &[])
        .await;
    for (n, day) in [(1, 3), (2, 1), (3, 2)] {
        app.insert_sales_order(
            &format!("{tag}-{n}"),
            date(2024, 7, day),
            quotation,
            customer,
            &[("Widget", 1, 100)],
        )
        .await;
    }

    let response = app
        .get(&format!("/sales-orders?number:like={tag}&sort:order-date=asc"))
        .await;
    assert_eq!(total_count(&response), 3);

    let body = body_json(response).await;
    let dates: Vec<String> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|order| order["order_date"].as_str().unwrap().to_string())
        .collect();
    assert_non_decreasing(&dates);
}
