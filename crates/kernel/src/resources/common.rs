//! Response pieces shared by several resources.

use sea_query::Alias;
use serde::Serialize;

use crate::query::SOURCE_ALIAS;

/// The derived-table alias children join against.
pub fn parents() -> Alias {
    Alias::new(SOURCE_ALIAS)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CustomerSummary {
    pub id: i64,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentTermRef {
    pub id: i64,
    pub name: String,
}

impl PaymentTermRef {
    /// Present only when the optional join matched.
    pub fn from_parts(id: Option<i64>, name: Option<&str>) -> Option<Self> {
        Some(Self {
            id: id?,
            name: name?.to_string(),
        })
    }
}

/// A quoted or ordered product line. Amounts are in cents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineItem {
    pub id: i64,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_total: i64,
}

impl LineItem {
    /// Build from the nullable LEFT JOIN columns; `None` when the join missed.
    pub fn from_parts(
        id: Option<i64>,
        product_name: Option<&str>,
        quantity: Option<i32>,
        unit_price: Option<i64>,
    ) -> Option<Self> {
        let quantity = quantity?;
        let unit_price = unit_price?;
        Some(Self {
            id: id?,
            product_name: product_name?.to_string(),
            quantity,
            unit_price,
            line_total: i64::from(quantity).saturating_mul(unit_price),
        })
    }
}

/// Document totals in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Totals {
    pub subtotal: i64,
    pub discount: i64,
    pub delivery_fee: i64,
    pub total: i64,
}

impl Totals {
    /// `total = subtotal - discount + delivery_fee`.
    pub fn compute(items: &[LineItem], discount: i64, delivery_fee: i64) -> Self {
        let subtotal = items
            .iter()
            .fold(0i64, |sum, item| sum.saturating_add(item.line_total));
        Self {
            subtotal,
            discount,
            delivery_fee,
            total: subtotal.saturating_sub(discount).saturating_add(delivery_fee),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn line_item_needs_every_column() {
        assert!(LineItem::from_parts(None, None, None, None).is_none());
        assert!(LineItem::from_parts(Some(1), Some("Widget"), None, Some(250)).is_none());

        let item = LineItem::from_parts(Some(1), Some("Widget"), Some(3), Some(250)).unwrap();
        assert_eq!(item.line_total, 750);
    }

    #[test]
    fn totals_apply_discount_and_delivery() {
        let items = [
            LineItem::from_parts(Some(1), Some("A"), Some(2), Some(1_000)).unwrap(),
            LineItem::from_parts(Some(2), Some("B"), Some(1), Some(550)).unwrap(),
        ];
        let totals = Totals::compute(&items, 300, 125);
        assert_eq!(totals.subtotal, 2_550);
        assert_eq!(totals.total, 2_375);
    }

    #[test]
    fn extreme_amounts_saturate() {
        let item = LineItem::from_parts(Some(1), Some("Yacht"), Some(i32::MAX), Some(i64::MAX)).unwrap();
        assert_eq!(item.line_total, i64::MAX);

        let totals = Totals::compute(&[item.clone(), item], -5, 10);
        assert_eq!(totals.subtotal, i64::MAX);
        assert_eq!(totals.total, i64::MAX);
    }

    #[test]
    fn totals_of_nothing() {
        assert_eq!(Totals::compute(&[], 0, 0), Totals::default());
    }

    #[test]
    fn payment_term_ref_requires_match() {
        assert!(PaymentTermRef::from_parts(Some(4), None).is_none());
        assert_eq!(
            PaymentTermRef::from_parts(Some(4), Some("Net 30")),
            Some(PaymentTermRef {
                id: 4,
                name: "Net 30".to_string()
            })
        );
    }
}
