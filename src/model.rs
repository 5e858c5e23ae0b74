//! Order-graph records consumed by the reducer.
//!
//! These are the typed form of the nested `orders -> order_items -> products
//! -> stores` join. Optional references are `Option`s; the reducer skips
//! whatever is absent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Closed set of fulfillment stages an order can be counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Pending,
    Processing,
    Delivering,
    Completed,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Delivering,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
    ];

    /// Maps a raw status string onto the enumeration. Matching is exact;
    /// anything else yields `None`.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(OrderStatus::Pending),
            "processing" => Some(OrderStatus::Processing),
            "delivering" => Some(OrderStatus::Delivering),
            "completed" => Some(OrderStatus::Completed),
            "cancelled" => Some(OrderStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Processing => "processing",
            OrderStatus::Delivering => "delivering",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

/// The product a line item points at, with its owning store flattened in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRef {
    pub id: String,
    pub name: Option<String>,
    pub store_id: Option<String>,
    pub store_name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Whole units ordered. Kept as `f64` so a malformed upstream value can
    /// be carried as NaN instead of being rejected.
    pub quantity: f64,
    pub unit_price: f64,
    pub product: Option<ProductRef>,
}

impl LineItem {
    pub fn line_total(&self) -> f64 {
        self.unit_price * self.quantity
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub id: String,
    pub total_amount: f64,
    /// `None` when the stored status is outside [`OrderStatus`].
    pub status: Option<OrderStatus>,
    /// `None` when the timestamp was missing or unreadable; such orders
    /// still count toward overall totals but fall in no window.
    pub created_at: Option<DateTime<Utc>>,
    pub items: Vec<LineItem>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_known_values() {
        for status in OrderStatus::ALL {
            assert_eq!(OrderStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_status_parse_is_exact() {
        assert_eq!(OrderStatus::parse("Completed"), None);
        assert_eq!(OrderStatus::parse("refunded"), None);
        assert_eq!(OrderStatus::parse(""), None);
    }

    #[test]
    fn test_line_total() {
        let item = LineItem {
            quantity: 3.0,
            unit_price: 12.5,
            product: None,
        };
        assert_eq!(item.line_total(), 37.5);
    }

    #[test]
    fn test_line_total_nan_quantity_poisons() {
        let item = LineItem {
            quantity: f64::NAN,
            unit_price: 10.0,
            product: None,
        };
        assert!(item.line_total().is_nan());
    }
}
