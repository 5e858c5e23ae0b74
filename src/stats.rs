use std::collections::HashSet;

use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use tracing::debug;

use crate::analyzers::leaderboard::AggregateTable;
use crate::analyzers::types::{ProductAggregate, StatusCounts, StoreAggregate, Totals};
use crate::analyzers::window::{Window, WindowBounds};
use crate::model::{OrderRecord, ProductRef};

/// Length of both leaderboards.
pub const LEADERBOARD_SIZE: usize = 10;

pub const UNKNOWN_STORE: &str = "Unknown store";
pub const UNKNOWN_PRODUCT: &str = "Unknown product";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatisticsSummary {
    pub generated_at: DateTime<Utc>,
    pub windows: WindowBounds,

    // revenue/order totals
    pub total: Totals,
    pub today: Totals,
    pub week: Totals,
    pub month: Totals,

    pub status_counts: StatusCounts,

    // leaderboards
    pub top_stores: Vec<StoreAggregate>,
    pub top_products: Vec<ProductAggregate>,
}

impl StatisticsSummary {
    fn empty(generated_at: DateTime<Utc>, windows: WindowBounds) -> Self {
        StatisticsSummary {
            generated_at,
            windows,
            total: Totals::default(),
            today: Totals::default(),
            week: Totals::default(),
            month: Totals::default(),
            status_counts: StatusCounts::default(),
            top_stores: Vec::new(),
            top_products: Vec::new(),
        }
    }

    /// True when a malformed quantity or price has turned any reported
    /// revenue or quantity into NaN/infinity.
    pub fn is_poisoned(&self) -> bool {
        let totals = [self.total, self.today, self.week, self.month];
        totals.iter().any(|t| !t.revenue.is_finite())
            || self.top_stores.iter().any(|s| !s.revenue.is_finite())
            || self
                .top_products
                .iter()
                .any(|p| !p.revenue.is_finite() || !p.quantity_sold.is_finite())
    }
}

fn new_store(store_id: &str, product: &ProductRef) -> StoreAggregate {
    StoreAggregate {
        store_id: store_id.to_string(),
        store_name: display_name(product.store_name.as_deref(), UNKNOWN_STORE),
        revenue: 0.0,
        order_count: 0,
    }
}

fn new_product(product: &ProductRef) -> ProductAggregate {
    ProductAggregate {
        product_id: product.id.clone(),
        name: display_name(product.name.as_deref(), UNKNOWN_PRODUCT),
        quantity_sold: 0.0,
        revenue: 0.0,
    }
}

fn display_name(name: Option<&str>, fallback: &str) -> String {
    name.filter(|n| !n.is_empty()).unwrap_or(fallback).to_string()
}

/// Folds an order snapshot into a [`StatisticsSummary`].
///
/// `now` fixes both the window cutoffs and the zone "local midnight" is
/// taken in. The input is only read; every call starts from zeroed state.
///
/// Store and product revenue come from `unit_price * quantity` of the line
/// items and are not reconciled against `total_amount`. A NaN quantity or
/// price is carried into the affected aggregates unchanged.
pub fn reduce<Tz: TimeZone>(orders: &[OrderRecord], now: &DateTime<Tz>) -> StatisticsSummary {
    let windows = WindowBounds::from_now(now);
    let mut s = StatisticsSummary::empty(now.with_timezone(&Utc), windows);

    let mut stores: AggregateTable<StoreAggregate> = AggregateTable::new();
    let mut products: AggregateTable<ProductAggregate> = AggregateTable::new();

    for order in orders {
        let amount = order.total_amount;
        s.total.record(amount);

        if windows.contains(Window::Today, order.created_at) {
            s.today.record(amount);
        }
        if windows.contains(Window::Week, order.created_at) {
            s.week.record(amount);
        }
        if windows.contains(Window::Month, order.created_at) {
            s.month.record(amount);
        }

        s.status_counts.record(order.status);

        let mut touched: HashSet<&str> = HashSet::new();

        for item in &order.items {
            let Some(product) = &item.product else {
                continue;
            };
            let line_total = item.line_total();

            if let Some(store_id) = product.store_id.as_deref().filter(|id| !id.is_empty()) {
                stores
                    .get_or_insert_with(store_id, || new_store(store_id, product))
                    .revenue += line_total;
                touched.insert(store_id);
            }

            if !product.id.is_empty() {
                let entry = products.get_or_insert_with(&product.id, || new_product(product));
                entry.quantity_sold += item.quantity;
                entry.revenue += line_total;
            }
        }

        // one order per store, however many of its lines the order holds
        for store_id in touched {
            if let Some(store) = stores.get_mut(store_id) {
                store.order_count += 1;
            }
        }
    }

    debug!(
        orders = orders.len(),
        stores = stores.len(),
        products = products.len(),
        "Order snapshot reduced"
    );

    s.top_stores = stores.top(LEADERBOARD_SIZE);
    s.top_products = products.top(LEADERBOARD_SIZE);
    s
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{LineItem, OrderStatus};
    use chrono::{Duration, FixedOffset};

    #[test]
    fn test_reduce_empty() {
        let now = fixed_now();
        let s = reduce(&[], &now);

        assert_eq!(s.total, Totals::default());
        assert_eq!(s.today, Totals::default());
        assert_eq!(s.week, Totals::default());
        assert_eq!(s.month, Totals::default());
        assert_eq!(s.status_counts, StatusCounts::default());
        assert!(s.top_stores.is_empty());
        assert!(s.top_products.is_empty());
        assert!(!s.is_poisoned());
    }

    #[test]
    fn test_reduce_two_order_scenario() {
        let now = fixed_now();
        let orders = vec![
            order(
                "A",
                100.0,
                Some(OrderStatus::Completed),
                Some(utc(&now)),
                vec![item(2.0, 30.0, Some(product("P1", "Apple", "S1", "Fresh")))],
            ),
            order(
                "B",
                50.0,
                Some(OrderStatus::Pending),
                Some(utc(&now) - Duration::days(40)),
                vec![item(1.0, 50.0, Some(product("P2", "Bread", "S1", "Fresh")))],
            ),
        ];

        let s = reduce(&orders, &now);

        assert_eq!(s.total.revenue, 150.0);
        assert_eq!(s.total.order_count, 2);
        assert_eq!(s.today.order_count, 1);
        assert_eq!(s.week.order_count, 1);
        assert_eq!(s.month.order_count, 1);
        assert_eq!(s.month.revenue, 100.0);
        assert_eq!(s.status_counts.completed, 1);
        assert_eq!(s.status_counts.pending, 1);

        assert_eq!(s.top_stores.len(), 1);
        assert_eq!(s.top_stores[0].store_id, "S1");
        assert_eq!(s.top_stores[0].store_name, "Fresh");
        assert_eq!(s.top_stores[0].revenue, 110.0);
        assert_eq!(s.top_stores[0].order_count, 2);

        let products: Vec<_> = s
            .top_products
            .iter()
            .map(|p| (p.product_id.as_str(), p.name.as_str(), p.revenue))
            .collect();
        assert_eq!(products, vec![("P1", "Apple", 60.0), ("P2", "Bread", 50.0)]);
        assert_eq!(s.top_products[0].quantity_sold, 2.0);
    }

    #[test]
    fn test_store_counted_once_per_order() {
        let now = fixed_now();
        let orders = vec![order(
            "A",
            70.0,
            Some(OrderStatus::Processing),
            Some(utc(&now)),
            vec![
                item(1.0, 20.0, Some(product("P1", "Apple", "S1", "Fresh"))),
                item(1.0, 50.0, Some(product("P2", "Bread", "S1", "Fresh"))),
            ],
        )];

        let s = reduce(&orders, &now);

        assert_eq!(s.top_stores[0].order_count, 1);
        assert_eq!(s.top_stores[0].revenue, 70.0);
    }

    #[test]
    fn test_order_touching_two_stores() {
        let now = fixed_now();
        let orders = vec![order(
            "A",
            30.0,
            None,
            Some(utc(&now)),
            vec![
                item(1.0, 10.0, Some(product("P1", "Apple", "S1", "Fresh"))),
                item(1.0, 20.0, Some(product("P9", "Soap", "S2", "Home"))),
            ],
        )];

        let s = reduce(&orders, &now);

        let stores: Vec<_> = s
            .top_stores
            .iter()
            .map(|st| (st.store_id.as_str(), st.order_count))
            .collect();
        assert_eq!(stores, vec![("S2", 1), ("S1", 1)]);
    }

    #[test]
    fn test_unknown_status_counts_toward_totals_only() {
        let now = fixed_now();
        let orders = vec![
            order("A", 10.0, Some(OrderStatus::Delivering), Some(utc(&now)), vec![]),
            order("B", 5.0, None, Some(utc(&now)), vec![]),
        ];

        let s = reduce(&orders, &now);

        assert_eq!(s.total.order_count, 2);
        assert_eq!(s.total.revenue, 15.0);
        assert_eq!(s.status_counts.delivering, 1);
        assert_eq!(s.status_counts.total(), 1);
    }

    #[test]
    fn test_status_partition_is_exact_for_known_statuses() {
        let now = fixed_now();
        let orders: Vec<_> = OrderStatus::ALL
            .iter()
            .enumerate()
            .map(|(i, st)| order(&format!("o{i}"), 1.0, Some(*st), Some(utc(&now)), vec![]))
            .collect();

        let s = reduce(&orders, &now);

        assert_eq!(s.status_counts.total(), s.total.order_count);
        for status in OrderStatus::ALL {
            assert_eq!(s.status_counts.get(status), 1);
        }
    }

    #[test]
    fn test_missing_product_and_store_are_skipped() {
        let now = fixed_now();
        let mut storeless = product("P3", "Loose", "", "");
        storeless.store_id = None;

        let orders = vec![order(
            "A",
            99.0,
            Some(OrderStatus::Completed),
            Some(utc(&now)),
            vec![item(1.0, 40.0, None), item(2.0, 5.0, Some(storeless))],
        )];

        let s = reduce(&orders, &now);

        assert_eq!(s.total.order_count, 1);
        assert!(s.top_stores.is_empty());
        assert_eq!(s.top_products.len(), 1);
        assert_eq!(s.top_products[0].revenue, 10.0);
    }

    #[test]
    fn test_empty_product_id_still_feeds_store() {
        let now = fixed_now();
        let orders = vec![order(
            "A",
            8.0,
            None,
            Some(utc(&now)),
            vec![item(2.0, 4.0, Some(product("", "Ghost", "S1", "Fresh")))],
        )];

        let s = reduce(&orders, &now);

        assert!(s.top_products.is_empty());
        assert_eq!(s.top_stores[0].revenue, 8.0);
        assert_eq!(s.top_stores[0].order_count, 1);
    }

    #[test]
    fn test_missing_names_fall_back() {
        let now = fixed_now();
        let orders = vec![order(
            "A",
            1.0,
            None,
            Some(utc(&now)),
            vec![item(1.0, 1.0, Some(product("P1", "", "S1", "")))],
        )];

        let s = reduce(&orders, &now);

        assert_eq!(s.top_stores[0].store_name, UNKNOWN_STORE);
        assert_eq!(s.top_products[0].name, UNKNOWN_PRODUCT);
    }

    #[test]
    fn test_first_seen_name_wins() {
        let now = fixed_now();
        let orders = vec![order(
            "A",
            1.0,
            None,
            Some(utc(&now)),
            vec![
                item(1.0, 1.0, Some(product("P1", "Apple", "S1", "Fresh"))),
                item(1.0, 1.0, Some(product("P1", "Renamed", "S1", "Other"))),
            ],
        )];

        let s = reduce(&orders, &now);

        assert_eq!(s.top_products[0].name, "Apple");
        assert_eq!(s.top_stores[0].store_name, "Fresh");
        assert_eq!(s.top_products[0].quantity_sold, 2.0);
    }

    #[test]
    fn test_leaderboards_capped_at_ten() {
        let now = fixed_now();
        let orders: Vec<_> = (0..12)
            .map(|i| {
                order(
                    &format!("o{i}"),
                    1.0,
                    None,
                    Some(utc(&now)),
                    vec![item(
                        1.0,
                        f64::from(i),
                        Some(product(&format!("P{i}"), "x", &format!("S{i}"), "y")),
                    )],
                )
            })
            .collect();

        let s = reduce(&orders, &now);

        assert_eq!(s.top_stores.len(), LEADERBOARD_SIZE);
        assert_eq!(s.top_products.len(), LEADERBOARD_SIZE);
        assert_eq!(s.top_stores[0].store_id, "S11");
        assert_eq!(s.top_products[9].product_id, "P2");
        assert!(
            s.top_products
                .windows(2)
                .all(|w| w[0].revenue >= w[1].revenue)
        );
    }

    #[test]
    fn test_windows_nest() {
        let now = fixed_now();
        let offsets = [0, 1, 3, 6, 8, 15, 29, 31, 45];
        let orders: Vec<_> = offsets
            .iter()
            .map(|d| {
                order(
                    &format!("o{d}"),
                    10.0,
                    None,
                    Some(utc(&now) - Duration::days(*d)),
                    vec![],
                )
            })
            .collect();

        let s = reduce(&orders, &now);

        assert!(s.today.order_count <= s.week.order_count);
        assert!(s.week.order_count <= s.month.order_count);
        assert!(s.month.order_count <= s.total.order_count);
        assert!(s.today.revenue <= s.week.revenue);
        assert!(s.week.revenue <= s.month.revenue);
        assert_eq!(s.total.order_count, offsets.len());
    }

    #[test]
    fn test_order_without_timestamp_only_in_totals() {
        let now = fixed_now();
        let orders = vec![order("A", 12.0, None, None, vec![])];

        let s = reduce(&orders, &now);

        assert_eq!(s.total.order_count, 1);
        assert_eq!(s.month.order_count, 0);
    }

    #[test]
    fn test_nan_quantity_poisons_aggregates() {
        let now = fixed_now();
        let orders = vec![
            order(
                "A",
                10.0,
                None,
                Some(utc(&now)),
                vec![item(f64::NAN, 10.0, Some(product("P1", "Apple", "S1", "Fresh")))],
            ),
            order(
                "B",
                10.0,
                None,
                Some(utc(&now)),
                vec![item(1.0, 10.0, Some(product("P1", "Apple", "S1", "Fresh")))],
            ),
        ];

        let s = reduce(&orders, &now);

        assert_eq!(s.total.revenue, 20.0);
        assert!(s.top_products[0].revenue.is_nan());
        assert!(s.top_stores[0].revenue.is_nan());
        assert_eq!(s.top_stores[0].order_count, 2);
        assert!(s.is_poisoned());
    }

    #[test]
    fn test_input_is_untouched_and_rerun_is_identical() {
        let now = fixed_now();
        let orders = vec![order(
            "A",
            5.0,
            Some(OrderStatus::Completed),
            Some(utc(&now)),
            vec![item(1.0, 5.0, Some(product("P1", "Apple", "S1", "Fresh")))],
        )];
        let before = orders.clone();

        let first = reduce(&orders, &now);
        let second = reduce(&orders, &now);

        assert_eq!(orders, before);
        assert_eq!(first, second);
    }

    // Helper functions for tests
    fn fixed_now() -> DateTime<FixedOffset> {
        FixedOffset::east_opt(5 * 3600)
            .unwrap()
            .with_ymd_and_hms(2025, 6, 15, 14, 0, 0)
            .unwrap()
    }

    fn utc(now: &DateTime<FixedOffset>) -> DateTime<Utc> {
        now.with_timezone(&Utc)
    }

    fn product(id: &str, name: &str, store_id: &str, store_name: &str) -> ProductRef {
        ProductRef {
            id: id.to_string(),
            name: Some(name.to_string()),
            store_id: Some(store_id.to_string()),
            store_name: Some(store_name.to_string()),
        }
    }

    fn item(quantity: f64, unit_price: f64, product: Option<ProductRef>) -> LineItem {
        LineItem {
            quantity,
            unit_price,
            product,
        }
    }

    fn order(
        id: &str,
        total_amount: f64,
        status: Option<OrderStatus>,
        created_at: Option<DateTime<Utc>>,
        items: Vec<LineItem>,
    ) -> OrderRecord {
        OrderRecord {
            id: id.to_string(),
            total_amount,
            status,
            created_at,
            items,
        }
    }
}
