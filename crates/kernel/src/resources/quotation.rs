//! Quotations with their customer, payment term and item lines.
//!
//! The customer is INNER JOINed in the source query: a quotation whose
//! customer row is missing is never listed. The payment term is optional.

use chrono::NaiveDate;
use sea_query::{Alias, Asterisk, Expr, Order, Query, SelectStatement};
use serde::Serialize;

use super::Resource;
use super::common::{CustomerSummary, LineItem, PaymentTermRef, Totals, parents};
use super::schema::{Customers, PaymentTerms, QuotationItems, Quotations};
use crate::denorm::{AggregateShape, Children};
use crate::query::{
    AllowList, AllowedFilter, AllowedSort, FieldKind, FilterOperator as Op, OrderKey,
    SOURCE_ALIAS,
};

static ALLOW: AllowList = AllowList {
    filters: &[
        AllowedFilter::new("id", &[Op::Eq, Op::In, Op::Nin], FieldKind::Integer),
        AllowedFilter::new(
            "number",
            &[Op::Eq, Op::Ne, Op::Like, Op::Ilike, Op::In, Op::Nin],
            FieldKind::Text,
        ),
        AllowedFilter::new(
            "quotation-date",
            &[Op::Eq, Op::Gt, Op::Lt, Op::Gte, Op::Lte],
            FieldKind::Date,
        ),
        AllowedFilter::new(
            "valid-until",
            &[Op::Gt, Op::Lt, Op::Gte, Op::Lte],
            FieldKind::Date,
        ),
        AllowedFilter::new(
            "status",
            &[Op::Eq, Op::Ne, Op::In, Op::Nin],
            FieldKind::Text,
        ),
        AllowedFilter::new("customer-id", &[Op::Eq, Op::In], FieldKind::Integer),
        AllowedFilter::new(
            "customer-name",
            &[Op::Eq, Op::Like, Op::Ilike],
            FieldKind::Text,
        ),
        AllowedFilter::new("payment-term-id", &[Op::Eq, Op::In], FieldKind::Integer),
    ],
    sorts: &[
        AllowedSort::new("id"),
        AllowedSort::new("number"),
        AllowedSort::new("quotation-date"),
        AllowedSort::new("customer-name"),
    ],
};

static DEFAULT_ORDER: [OrderKey; 2] = [OrderKey::desc("quotation_date"), OrderKey::asc("id")];

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct QuotationRow {
    pub id: i64,
    pub number: String,
    pub quotation_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub status: String,
    pub discount: i64,
    pub delivery_fee: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub payment_term_id: Option<i64>,
    pub payment_term_name: Option<String>,
    pub item_id: Option<i64>,
    pub item_product_name: Option<String>,
    pub item_quantity: Option<i32>,
    pub item_unit_price: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuotationHeader {
    pub id: i64,
    pub number: String,
    pub quotation_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub status: String,
    pub discount: i64,
    pub delivery_fee: i64,
    pub customer: CustomerSummary,
    pub payment_term: Option<PaymentTermRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotationResponse {
    pub id: i64,
    pub number: String,
    pub quotation_date: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub status: String,
    pub customer: CustomerSummary,
    pub payment_term: Option<PaymentTermRef>,
    pub items: Vec<LineItem>,
    #[serde(flatten)]
    pub totals: Totals,
}

pub fn to_response(header: QuotationHeader, items: Vec<LineItem>) -> QuotationResponse {
    let totals = Totals::compute(&items, header.discount, header.delivery_fee);
    QuotationResponse {
        id: header.id,
        number: header.number,
        quotation_date: header.quotation_date,
        valid_until: header.valid_until,
        status: header.status,
        customer: header.customer,
        payment_term: header.payment_term,
        items,
        totals,
    }
}

pub struct QuotationShell {
    header: QuotationHeader,
    items: Children<i64, LineItem>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct QuotationShape;

impl AggregateShape for QuotationShape {
    type Row = QuotationRow;
    type Key = i64;
    type Shell = QuotationShell;
    type Output = QuotationResponse;

    fn key(&self, row: &QuotationRow) -> i64 {
        row.id
    }

    fn open(&self, row: &QuotationRow) -> QuotationShell {
        QuotationShell {
            header: QuotationHeader {
                id: row.id,
                number: row.number.clone(),
                quotation_date: row.quotation_date,
                valid_until: row.valid_until,
                status: row.status.clone(),
                discount: row.discount,
                delivery_fee: row.delivery_fee,
                customer: CustomerSummary {
                    id: row.customer_id,
                    name: row.customer_name.clone(),
                    email: row.customer_email.clone(),
                },
                payment_term: PaymentTermRef::from_parts(
                    row.payment_term_id,
                    row.payment_term_name.as_deref(),
                ),
            },
            items: Children::new(),
        }
    }

    fn absorb(&self, shell: &mut QuotationShell, row: QuotationRow) {
        let item = LineItem::from_parts(
            row.item_id,
            row.item_product_name.as_deref(),
            row.item_quantity,
            row.item_unit_price,
        );
        if let Some(item) = item {
            shell.items.upsert_last(Some(item.id), || item);
        }
    }

    fn seal(&self, shell: QuotationShell) -> QuotationResponse {
        to_response(shell.header, shell.items.into_vec())
    }
}

pub struct Quotation;

impl Resource for Quotation {
    const NAME: &'static str = "quotation";

    type Row = QuotationRow;
    type Response = QuotationResponse;
    type Shape = QuotationShape;

    fn allow_list() -> &'static AllowList {
        &ALLOW
    }

    fn default_order() -> &'static [OrderKey] {
        &DEFAULT_ORDER
    }

    fn source() -> SelectStatement {
        let mut query = Query::select();
        query
            .columns([
                (Quotations::Table, Quotations::Id),
                (Quotations::Table, Quotations::Number),
                (Quotations::Table, Quotations::QuotationDate),
                (Quotations::Table, Quotations::ValidUntil),
                (Quotations::Table, Quotations::Status),
                (Quotations::Table, Quotations::Discount),
                (Quotations::Table, Quotations::DeliveryFee),
                (Quotations::Table, Quotations::CustomerId),
                (Quotations::Table, Quotations::PaymentTermId),
            ])
            .expr_as(
                Expr::col((Customers::Table, Customers::Name)),
                Alias::new("customer_name"),
            )
            .expr_as(
                Expr::col((Customers::Table, Customers::Email)),
                Alias::new("customer_email"),
            )
            .expr_as(
                Expr::col((PaymentTerms::Table, PaymentTerms::Name)),
                Alias::new("payment_term_name"),
            )
            .from(Quotations::Table)
            .inner_join(
                Customers::Table,
                Expr::col((Customers::Table, Customers::Id))
                    .equals((Quotations::Table, Quotations::CustomerId)),
            )
            .left_join(
                PaymentTerms::Table,
                Expr::col((PaymentTerms::Table, PaymentTerms::Id))
                    .equals((Quotations::Table, Quotations::PaymentTermId)),
            );
        query
    }

    fn expand(parents_page: SelectStatement) -> SelectStatement {
        let item = |column: QuotationItems| Expr::col((QuotationItems::Table, column));

        let mut query = Query::select();
        query
            .column((parents(), Asterisk))
            .expr_as(item(QuotationItems::Id), Alias::new("item_id"))
            .expr_as(
                item(QuotationItems::ProductName),
                Alias::new("item_product_name"),
            )
            .expr_as(item(QuotationItems::Quantity), Alias::new("item_quantity"))
            .expr_as(
                item(QuotationItems::UnitPrice),
                Alias::new("item_unit_price"),
            )
            .from_subquery(parents_page, Alias::new(SOURCE_ALIAS))
            .left_join(
                QuotationItems::Table,
                Expr::col((QuotationItems::Table, QuotationItems::QuotationId))
                    .equals((parents(), Quotations::Id)),
            );
        query
    }

    fn child_order(query: &mut SelectStatement) {
        query.order_by((QuotationItems::Table, QuotationItems::Id), Order::Asc);
    }
}
