//! Journal entries with their debit/credit lines.

use chrono::NaiveDate;
use sea_query::{Alias, Asterisk, Expr, Order, Query, SelectStatement};
use serde::Serialize;

use super::Resource;
use super::common::parents;
use super::schema::{Accounts, JournalEntries, JournalLines};
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
            "entry-date",
            &[Op::Eq, Op::Gt, Op::Lt, Op::Gte, Op::Lte],
            FieldKind::Date,
        ),
        AllowedFilter::new("posted", &[Op::Eq, Op::Ne], FieldKind::Boolean),
        AllowedFilter::new("description", &[Op::Like, Op::Ilike], FieldKind::Text),
    ],
    sorts: &[
        AllowedSort::new("id"),
        AllowedSort::new("number"),
        AllowedSort::new("entry-date"),
    ],
};

static DEFAULT_ORDER: [OrderKey; 1] = [OrderKey::asc("id")];

/// An entry joined with at most one line and that line's account.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JournalEntryRow {
    pub id: i64,
    pub number: String,
    pub entry_date: NaiveDate,
    pub description: Option<String>,
    pub posted: bool,
    pub line_id: Option<i64>,
    pub line_debit: Option<i64>,
    pub line_credit: Option<i64>,
    pub line_memo: Option<String>,
    pub account_id: Option<i64>,
    pub account_code: Option<String>,
    pub account_name: Option<String>,
    pub account_kind: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccountSummary {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalLine {
    pub id: i64,
    pub account: AccountSummary,
    pub debit: i64,
    pub credit: i64,
    pub memo: Option<String>,
}

impl JournalLine {
    fn from_row(row: &JournalEntryRow) -> Option<Self> {
        let account = AccountSummary {
            id: row.account_id?,
            code: row.account_code.clone()?,
            name: row.account_name.clone()?,
            kind: row.account_kind.clone()?,
        };
        Some(Self {
            id: row.line_id?,
            account,
            debit: row.line_debit?,
            credit: row.line_credit?,
            memo: row.line_memo.clone(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalEntryHeader {
    pub id: i64,
    pub number: String,
    pub entry_date: NaiveDate,
    pub description: Option<String>,
    pub posted: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalEntryResponse {
    pub id: i64,
    pub number: String,
    pub entry_date: NaiveDate,
    pub description: Option<String>,
    pub posted: bool,
    pub lines: Vec<JournalLine>,
    pub total_debit: i64,
    pub total_credit: i64,
    pub balanced: bool,
}

pub fn to_response(header: JournalEntryHeader, lines: Vec<JournalLine>) -> JournalEntryResponse {
    let (total_debit, total_credit) = lines.iter().fold((0i64, 0i64), |(debit, credit), line| {
        (
            debit.saturating_add(line.debit),
            credit.saturating_add(line.credit),
        )
    });

    JournalEntryResponse {
        id: header.id,
        number: header.number,
        entry_date: header.entry_date,
        description: header.description,
        posted: header.posted,
        lines,
        total_debit,
        total_credit,
        balanced: total_debit == total_credit,
    }
}

pub struct JournalEntryShell {
    header: JournalEntryHeader,
    lines: Children<i64, JournalLine>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct JournalEntryShape;

impl AggregateShape for JournalEntryShape {
    type Row = JournalEntryRow;
    type Key = i64;
    type Shell = JournalEntryShell;
    type Output = JournalEntryResponse;

    fn key(&self, row: &JournalEntryRow) -> i64 {
        row.id
    }

    fn open(&self, row: &JournalEntryRow) -> JournalEntryShell {
        JournalEntryShell {
            header: JournalEntryHeader {
                id: row.id,
                number: row.number.clone(),
                entry_date: row.entry_date,
                description: row.description.clone(),
                posted: row.posted,
            },
            lines: Children::new(),
        }
    }

    fn absorb(&self, shell: &mut JournalEntryShell, row: JournalEntryRow) {
        if let Some(line) = JournalLine::from_row(&row) {
            shell.lines.upsert_last(Some(line.id), || line);
        }
    }

    fn seal(&self, shell: JournalEntryShell) -> JournalEntryResponse {
        to_response(shell.header, shell.lines.into_vec())
    }
}

pub struct JournalEntry;

impl Resource for JournalEntry {
    const NAME: &'static str = "journal entry";

    type Row = JournalEntryRow;
    type Response = JournalEntryResponse;
    type Shape = JournalEntryShape;

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
                JournalEntries::Id,
                JournalEntries::Number,
                JournalEntries::EntryDate,
                JournalEntries::Description,
                JournalEntries::Posted,
            ])
            .from(JournalEntries::Table);
        query
    }

    // Each line carries exactly one account, so the account join is 1:1
    // under the line and adds no fan-out.
    fn expand(parents_page: SelectStatement) -> SelectStatement {
        let line = |column: JournalLines| Expr::col((JournalLines::Table, column));
        let account = |column: Accounts| Expr::col((Accounts::Table, column));

        let mut query = Query::select();
        query
            .column((parents(), Asterisk))
            .expr_as(line(JournalLines::Id), Alias::new("line_id"))
            .expr_as(line(JournalLines::Debit), Alias::new("line_debit"))
            .expr_as(line(JournalLines::Credit), Alias::new("line_credit"))
            .expr_as(line(JournalLines::Memo), Alias::new("line_memo"))
            .expr_as(account(Accounts::Id), Alias::new("account_id"))
            .expr_as(account(Accounts::Code), Alias::new("account_code"))
            .expr_as(account(Accounts::Name), Alias::new("account_name"))
            .expr_as(account(Accounts::Kind), Alias::new("account_kind"))
            .from_subquery(parents_page, Alias::new(SOURCE_ALIAS))
            .left_join(
                JournalLines::Table,
                Expr::col((JournalLines::Table, JournalLines::JournalEntryId))
                    .equals((parents(), JournalEntries::Id)),
            )
            .left_join(
                Accounts::Table,
                Expr::col((Accounts::Table, Accounts::Id))
                    .equals((JournalLines::Table, JournalLines::AccountId)),
            );
        query
    }

    fn child_order(query: &mut SelectStatement) {
        query.order_by((JournalLines::Table, JournalLines::Id), Order::Asc);
    }
}
