//! Order ledger types: sales, line items, and activated warranties.

use chrono::{DateTime, Days, NaiveDate, Utc};
use common::{CustomerId, Money, ProductId, SaleId, WarrantyTemplateId};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::cart::PricedLine;
use crate::catalog::WarrantyTemplate;

/// Lifecycle status of a sale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SaleStatus {
    Pending,
    Completed,
    Failed,
}

impl SaleStatus {
    /// Returns the canonical string form stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Pending => "PENDING",
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::Failed => "FAILED",
        }
    }
}

impl std::fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SaleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(SaleStatus::Pending),
            "COMPLETED" => Ok(SaleStatus::Completed),
            "FAILED" => Ok(SaleStatus::Failed),
            other => Err(format!("unknown sale status: {other}")),
        }
    }
}

/// A sale (order) in the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: SaleId,
    pub customer_id: CustomerId,
    /// Total charged, as reported by the payment gateway.
    pub total: Money,
    pub status: SaleStatus,
    /// External payment reference (intent id). Unique across all sales;
    /// this uniqueness is the sole idempotency guard for webhook replays.
    pub payment_ref: String,
    pub created_at: DateTime<Utc>,
}

/// A line item belonging to exactly one sale.
///
/// `unit_price` is the price captured at purchase time, decoupled from the
/// live catalog price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleDetail {
    pub sale_id: SaleId,
    pub product_id: ProductId,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price: Money,
}

impl SaleDetail {
    /// Returns quantity × captured unit price.
    pub fn line_total(&self) -> Money {
        self.unit_price.multiply(self.quantity)
    }
}

/// A warranty instantiated from a template when a covered product was sold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivatedWarranty {
    pub id: Uuid,
    pub customer_id: CustomerId,
    pub sale_id: SaleId,
    pub product_id: ProductId,
    pub warranty_template_id: WarrantyTemplateId,
    pub start_date: NaiveDate,
    pub expiration_date: NaiveDate,
}

impl ActivatedWarranty {
    /// Activates a warranty: start date = sale date, expiration = start +
    /// template duration in days.
    pub fn activate(
        customer_id: CustomerId,
        sale_id: SaleId,
        product_id: ProductId,
        template: &WarrantyTemplate,
        start_date: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            customer_id,
            sale_id,
            product_id,
            warranty_template_id: template.id,
            start_date,
            expiration_date: start_date + Days::new(u64::from(template.duration_days)),
        }
    }
}

/// A confirmed order ready to be committed to the ledger.
///
/// Built from a succeeded payment event: the lines come from the intent's
/// cart snapshot and the total from the gateway-reported amount. The store
/// turns this into Sale + SaleDetails + ActivatedWarranties + stock
/// decrements inside one transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmedSale {
    pub customer_id: CustomerId,
    pub payment_ref: String,
    pub total: Money,
    pub lines: Vec<PricedLine>,
}

impl ConfirmedSale {
    /// Sums the snapshot line totals (should match `total` up to gateway
    /// rounding).
    pub fn lines_total(&self) -> Money {
        crate::cart::cart_total(&self.lines)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(days: u32) -> WarrantyTemplate {
        WarrantyTemplate {
            id: WarrantyTemplateId::new(),
            title: "Standard coverage".to_string(),
            terms: String::new(),
            duration_days: days,
        }
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [SaleStatus::Pending, SaleStatus::Completed, SaleStatus::Failed] {
            let parsed: SaleStatus = status.as_str().parse().unwrap();
            assert_eq!(parsed, status);
        }
        assert!("completado".parse::<SaleStatus>().is_err());
    }

    #[test]
    fn warranty_expiration_is_start_plus_duration() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let warranty = ActivatedWarranty::activate(
            CustomerId::new(),
            SaleId::new(),
            ProductId::new(),
            &template(365),
            start,
        );
        assert_eq!(
            warranty.expiration_date,
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
        );
        assert_eq!(warranty.start_date, start);
    }

    #[test]
    fn warranty_duration_crosses_month_boundaries() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let warranty = ActivatedWarranty::activate(
            CustomerId::new(),
            SaleId::new(),
            ProductId::new(),
            &template(30),
            start,
        );
        assert_eq!(
            warranty.expiration_date,
            NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
        );
    }

    #[test]
    fn detail_line_total() {
        let detail = SaleDetail {
            sale_id: SaleId::new(),
            product_id: ProductId::new(),
            product_name: "Widget".to_string(),
            quantity: 3,
            unit_price: Money::from_cents(1000),
        };
        assert_eq!(detail.line_total().cents(), 3000);
    }

    #[test]
    fn confirmed_sale_lines_total_matches_hand_sum() {
        let confirmed = ConfirmedSale {
            customer_id: CustomerId::new(),
            payment_ref: "pi_test_1".to_string(),
            total: Money::from_cents(13000),
            lines: vec![
                PricedLine {
                    product_id: ProductId::new(),
                    name: "A".to_string(),
                    quantity: 2,
                    unit_price: Money::from_cents(5000),
                },
                PricedLine {
                    product_id: ProductId::new(),
                    name: "B".to_string(),
                    quantity: 1,
                    unit_price: Money::from_cents(3000),
                },
            ],
        };
        assert_eq!(confirmed.lines_total(), confirmed.total);
    }
}
