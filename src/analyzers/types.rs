//! Aggregate types produced by the reducer.

use serde::Serialize;

use crate::model::OrderStatus;

/// Revenue and order count over some set of orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Totals {
    pub revenue: f64,
    pub order_count: usize,
}

impl Totals {
    pub(crate) fn record(&mut self, amount: f64) {
        self.revenue += amount;
        self.order_count += 1;
    }
}

/// Orders per known status. Orders with no recognized status are not counted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub processing: usize,
    pub delivering: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl StatusCounts {
    pub(crate) fn record(&mut self, status: Option<OrderStatus>) {
        match status {
            Some(OrderStatus::Pending) => self.pending += 1,
            Some(OrderStatus::Processing) => self.processing += 1,
            Some(OrderStatus::Delivering) => self.delivering += 1,
            Some(OrderStatus::Completed) => self.completed += 1,
            Some(OrderStatus::Cancelled) => self.cancelled += 1,
            None => {}
        }
    }

    pub fn get(&self, status: OrderStatus) -> usize {
        match status {
            OrderStatus::Pending => self.pending,
            OrderStatus::Processing => self.processing,
            OrderStatus::Delivering => self.delivering,
            OrderStatus::Completed => self.completed,
            OrderStatus::Cancelled => self.cancelled,
        }
    }

    pub fn total(&self) -> usize {
        OrderStatus::ALL.iter().map(|s| self.get(*s)).sum()
    }
}

/// Per-store revenue from line items, and the number of distinct orders
/// that touched the store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreAggregate {
    pub store_id: String,
    pub store_name: String,
    pub revenue: f64,
    pub order_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductAggregate {
    pub product_id: String,
    pub name: String,
    pub quantity_sold: f64,
    pub revenue: f64,
}
