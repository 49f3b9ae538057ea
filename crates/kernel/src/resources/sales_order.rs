//! Sales orders with items, payment-term lines and an installment schedule.
//!
//! Items and term lines are sibling collections joined side by side, so the
//! flat rows are their cross product: every term line repeats once per item.
//! Items are ordered first and dedupe on the last-seen id; term lines dedupe
//! on membership within the open order.

use chrono::{Days, NaiveDate};
use sea_query::{Alias, Asterisk, Expr, Order, Query, SelectStatement};
use serde::Serialize;

use super::Resource;
use super::common::{CustomerSummary, LineItem, PaymentTermRef, Totals, parents};
use super::payment_term::{PaymentTermLine, ValueType};
use super::schema::{
    Customers, PaymentTermLines, PaymentTerms, Quotations, SalesOrderItems, SalesOrders,
};
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
            "order-date",
            &[Op::Eq, Op::Gt, Op::Lt, Op::Gte, Op::Lte],
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
        AllowedFilter::new("quotation-id", &[Op::Eq, Op::In], FieldKind::Integer),
        AllowedFilter::new(
            "quotation-number",
            &[Op::Eq, Op::Like, Op::Ilike],
            FieldKind::Text,
        ),
    ],
    sorts: &[
        AllowedSort::new("id"),
        AllowedSort::new("number"),
        AllowedSort::new("order-date"),
        AllowedSort::new("customer-name"),
    ],
};

static DEFAULT_ORDER: [OrderKey; 2] = [OrderKey::desc("order_date"), OrderKey::asc("id")];

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct SalesOrderRow {
    pub id: i64,
    pub number: String,
    pub order_date: NaiveDate,
    pub status: String,
    pub discount: i64,
    pub delivery_fee: i64,
    pub customer_id: i64,
    pub customer_name: String,
    pub customer_email: Option<String>,
    pub quotation_id: i64,
    pub quotation_number: String,
    pub payment_term_id: Option<i64>,
    pub payment_term_name: Option<String>,
    pub item_id: Option<i64>,
    pub item_product_name: Option<String>,
    pub item_quantity: Option<i32>,
    pub item_unit_price: Option<i64>,
    pub term_line_id: Option<i64>,
    pub term_line_sequence: Option<i32>,
    pub term_line_value_type: Option<ValueType>,
    pub term_line_value: Option<i64>,
    pub term_line_days: Option<i32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuotationRef {
    pub id: i64,
    pub number: String,
}

/// One due amount of the order total.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Installment {
    pub sequence: i32,
    pub due_date: NaiveDate,
    pub amount: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SalesOrderHeader {
    pub id: i64,
    pub number: String,
    pub order_date: NaiveDate,
    pub status: String,
    pub discount: i64,
    pub delivery_fee: i64,
    pub customer: CustomerSummary,
    pub quotation: QuotationRef,
    pub payment_term: Option<PaymentTermRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SalesOrderResponse {
    pub id: i64,
    pub number: String,
    pub order_date: NaiveDate,
    pub status: String,
    pub customer: CustomerSummary,
    pub quotation: QuotationRef,
    pub payment_term: Option<PaymentTermRef>,
    pub items: Vec<LineItem>,
    pub payment_term_lines: Vec<PaymentTermLine>,
    #[serde(flatten)]
    pub totals: Totals,
    pub schedule: Vec<Installment>,
}

/// Split `total` across the term lines, in sequence order.
///
/// Percent lines take `total * bps / 10000` rounded down, fixed lines take
/// their value, and a balance line takes whatever the earlier lines left.
/// Without a balance line the rounding remainder stays unscheduled.
pub fn installments(order_date: NaiveDate, total: i64, lines: &[PaymentTermLine]) -> Vec<Installment> {
    let mut ordered: Vec<&PaymentTermLine> = lines.iter().collect();
    ordered.sort_by_key(|line| (line.sequence, line.id));

    let mut allocated = 0i64;
    ordered
        .into_iter()
        .map(|line| {
            let amount = match line.value_type {
                ValueType::Percent => percent_of(total, line.value),
                ValueType::Fixed => line.value,
                ValueType::Balance => total.saturating_sub(allocated),
            };
            allocated = allocated.saturating_add(amount);
            Installment {
                sequence: line.sequence,
                due_date: due_date(order_date, line.days),
                amount,
            }
        })
        .collect()
}

/// `total * bps / 10000`, truncated, saturating at the `i64` bounds.
fn percent_of(total: i64, bps: i64) -> i64 {
    let share = i128::from(total) * i128::from(bps) / 10_000;
    i64::try_from(share).unwrap_or(if share < 0 { i64::MIN } else { i64::MAX })
}

fn due_date(order_date: NaiveDate, days: i32) -> NaiveDate {
    u64::try_from(days)
        .ok()
        .and_then(|days| order_date.checked_add_days(Days::new(days)))
        .unwrap_or(order_date)
}

pub fn to_response(
    header: SalesOrderHeader,
    items: Vec<LineItem>,
    payment_term_lines: Vec<PaymentTermLine>,
) -> SalesOrderResponse {
    let totals = Totals::compute(&items, header.discount, header.delivery_fee);
    let schedule = installments(header.order_date, totals.total, &payment_term_lines);

    SalesOrderResponse {
        id: header.id,
        number: header.number,
        order_date: header.order_date,
        status: header.status,
        customer: header.customer,
        quotation: header.quotation,
        payment_term: header.payment_term,
        items,
        payment_term_lines,
        totals,
        schedule,
    }
}

pub struct SalesOrderShell {
    header: SalesOrderHeader,
    items: Children<i64, LineItem>,
    term_lines: Children<i64, PaymentTermLine>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SalesOrderShape;

impl AggregateShape for SalesOrderShape {
    type Row = SalesOrderRow;
    type Key = i64;
    type Shell = SalesOrderShell;
    type Output = SalesOrderResponse;

    fn key(&self, row: &SalesOrderRow) -> i64 {
        row.id
    }

    fn open(&self, row: &SalesOrderRow) -> SalesOrderShell {
        SalesOrderShell {
            header: SalesOrderHeader {
                id: row.id,
                number: row.number.clone(),
                order_date: row.order_date,
                status: row.status.clone(),
                discount: row.discount,
                delivery_fee: row.delivery_fee,
                customer: CustomerSummary {
                    id: row.customer_id,
                    name: row.customer_name.clone(),
                    email: row.customer_email.clone(),
                },
                quotation: QuotationRef {
                    id: row.quotation_id,
                    number: row.quotation_number.clone(),
                },
                payment_term: PaymentTermRef::from_parts(
                    row.payment_term_id,
                    row.payment_term_name.as_deref(),
                ),
            },
            items: Children::new(),
            term_lines: Children::new(),
        }
    }

    fn absorb(&self, shell: &mut SalesOrderShell, row: SalesOrderRow) {
        let item = LineItem::from_parts(
            row.item_id,
            row.item_product_name.as_deref(),
            row.item_quantity,
            row.item_unit_price,
        );
        if let Some(item) = item {
            shell.items.upsert_last(Some(item.id), || item);
        }

        let term_line = PaymentTermLine::from_parts(
            row.term_line_id,
            row.term_line_sequence,
            row.term_line_value_type,
            row.term_line_value,
            row.term_line_days,
        );
        if let Some(term_line) = term_line {
            shell.term_lines.insert_unique(Some(term_line.id), || term_line);
        }
    }

    fn seal(&self, shell: SalesOrderShell) -> SalesOrderResponse {
        to_response(
            shell.header,
            shell.items.into_vec(),
            shell.term_lines.into_vec(),
        )
    }
}

pub struct SalesOrder;

impl Resource for SalesOrder {
    const NAME: &'static str = "sales order";

    type Row = SalesOrderRow;
    type Response = SalesOrderResponse;
    type Shape = SalesOrderShape;

    fn allow_list() -> &'static AllowList {
        &ALLOW
    }

    fn default_order() -> &'static [OrderKey] {
        &DEFAULT_ORDER
    }

    // Customer and quotation are INNER JOINed: orders missing either are
    // never listed. The payment term hangs off the quotation.
    fn source() -> SelectStatement {
        let mut query = Query::select();
        query
            .columns([
                (SalesOrders::Table, SalesOrders::Id),
                (SalesOrders::Table, SalesOrders::Number),
                (SalesOrders::Table, SalesOrders::OrderDate),
                (SalesOrders::Table, SalesOrders::Status),
                (SalesOrders::Table, SalesOrders::Discount),
                (SalesOrders::Table, SalesOrders::DeliveryFee),
                (SalesOrders::Table, SalesOrders::CustomerId),
                (SalesOrders::Table, SalesOrders::QuotationId),
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
                Expr::col((Quotations::Table, Quotations::Number)),
                Alias::new("quotation_number"),
            )
            .expr_as(
                Expr::col((Quotations::Table, Quotations::PaymentTermId)),
                Alias::new("payment_term_id"),
            )
            .expr_as(
                Expr::col((PaymentTerms::Table, PaymentTerms::Name)),
                Alias::new("payment_term_name"),
            )
            .from(SalesOrders::Table)
            .inner_join(
                Customers::Table,
                Expr::col((Customers::Table, Customers::Id))
                    .equals((SalesOrders::Table, SalesOrders::CustomerId)),
            )
            .inner_join(
                Quotations::Table,
                Expr::col((Quotations::Table, Quotations::Id))
                    .equals((SalesOrders::Table, SalesOrders::QuotationId)),
            )
            .left_join(
                PaymentTerms::Table,
                Expr::col((PaymentTerms::Table, PaymentTerms::Id))
                    .equals((Quotations::Table, Quotations::PaymentTermId)),
            );
        query
    }

    fn expand(parents_page: SelectStatement) -> SelectStatement {
        let item = |column: SalesOrderItems| Expr::col((SalesOrderItems::Table, column));
        let term = |column: PaymentTermLines| Expr::col((PaymentTermLines::Table, column));

        let mut query = Query::select();
        query
            .column((parents(), Asterisk))
            .expr_as(item(SalesOrderItems::Id), Alias::new("item_id"))
            .expr_as(
                item(SalesOrderItems::ProductName),
                Alias::new("item_product_name"),
            )
            .expr_as(item(SalesOrderItems::Quantity), Alias::new("item_quantity"))
            .expr_as(
                item(SalesOrderItems::UnitPrice),
                Alias::new("item_unit_price"),
            )
            .expr_as(term(PaymentTermLines::Id), Alias::new("term_line_id"))
            .expr_as(
                term(PaymentTermLines::Sequence),
                Alias::new("term_line_sequence"),
            )
            .expr_as(
                term(PaymentTermLines::ValueType),
                Alias::new("term_line_value_type"),
            )
            .expr_as(term(PaymentTermLines::Value), Alias::new("term_line_value"))
            .expr_as(term(PaymentTermLines::Days), Alias::new("term_line_days"))
            .from_subquery(parents_page, Alias::new(SOURCE_ALIAS))
            .left_join(
                SalesOrderItems::Table,
                Expr::col((SalesOrderItems::Table, SalesOrderItems::SalesOrderId))
                    .equals((parents(), SalesOrders::Id)),
            )
            .left_join(
                PaymentTermLines::Table,
                Expr::col((PaymentTermLines::Table, PaymentTermLines::PaymentTermId))
                    .equals((parents(), Alias::new("payment_term_id"))),
            );
        query
    }

    fn child_order(query: &mut SelectStatement) {
        query
            .order_by((SalesOrderItems::Table, SalesOrderItems::Id), Order::Asc)
            .order_by(
                (PaymentTermLines::Table, PaymentTermLines::Sequence),
                Order::Asc,
            )
            .order_by((PaymentTermLines::Table, PaymentTermLines::Id), Order::Asc);
    }
}
