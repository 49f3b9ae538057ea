//! Table and column identifiers.

use sea_query::Iden;

#[derive(Iden, Clone, Copy)]
pub enum PaymentTerms {
    Table,
    Id,
    Name,
    Description,
    CreatedAt,
}

#[derive(Iden, Clone, Copy)]
pub enum PaymentTermLines {
    Table,
    Id,
    PaymentTermId,
    Sequence,
    ValueType,
    Value,
    Days,
}

#[derive(Iden, Clone, Copy)]
pub enum Accounts {
    Table,
    Id,
    Code,
    Name,
    Kind,
}

#[derive(Iden, Clone, Copy)]
pub enum JournalEntries {
    Table,
    Id,
    Number,
    EntryDate,
    Description,
    Posted,
}

#[derive(Iden, Clone, Copy)]
pub enum JournalLines {
    Table,
    Id,
    JournalEntryId,
    AccountId,
    Debit,
    Credit,
    Memo,
}

#[derive(Iden, Clone, Copy)]
pub enum Customers {
    Table,
    Id,
    Name,
    Email,
}

#[derive(Iden, Clone, Copy)]
pub enum Quotations {
    Table,
    Id,
    Number,
    QuotationDate,
    ValidUntil,
    CustomerId,
    PaymentTermId,
    Discount,
    DeliveryFee,
    Status,
}

#[derive(Iden, Clone, Copy)]
pub enum QuotationItems {
    Table,
    Id,
    QuotationId,
    ProductName,
    Quantity,
    UnitPrice,
}

#[derive(Iden, Clone, Copy)]
pub enum SalesOrders {
    Table,
    Id,
    Number,
    OrderDate,
    Status,
    QuotationId,
    CustomerId,
    Discount,
    DeliveryFee,
}

#[derive(Iden, Clone, Copy)]
pub enum SalesOrderItems {
    Table,
    Id,
    SalesOrderId,
    ProductName,
    Quantity,
    UnitPrice,
}
