//! Aggregate business metrics over a table of orders.

use std::collections::{BTreeMap, HashMap};

use chrono::{Datelike, Duration, NaiveDate};
use serde::Serialize;

use crate::OrderRecord;

pub const DELIVERED_STATUS: &str = "Delivered";
pub const CANCELLED_STATUS: &str = "Cancelled";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardMetrics {
    pub total_orders: usize,
    pub total_sales: f64,
    pub avg_rating: Option<f64>,
    pub completion_rate: f64,
    pub delivered_orders: usize,
    pub cancelled_orders: usize,
    pub avg_kpt_minutes: Option<f64>,
    pub avg_rider_wait_minutes: Option<f64>,
}

impl DashboardMetrics {
    pub fn compute(orders: &[OrderRecord]) -> Self {
        let total_orders = orders.len();
        let delivered_orders = count_status(orders, DELIVERED_STATUS);
        let cancelled_orders = count_status(orders, CANCELLED_STATUS);
        let completion_rate = if total_orders > 0 {
            delivered_orders as f64 / total_orders as f64 * 100.0
        } else {
            0.0
        };

        Self {
            total_orders,
            total_sales: orders.iter().filter_map(|o| o.total).sum(),
            avg_rating: mean(orders.iter().filter_map(|o| o.rating)),
            completion_rate,
            delivered_orders,
            cancelled_orders,
            avg_kpt_minutes: mean(orders.iter().filter_map(|o| o.kpt_duration_minutes)),
            avg_rider_wait_minutes: mean(orders.iter().filter_map(|o| o.rider_wait_minutes)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SalesPoint {
    pub label: String,
    pub total_sales: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusCount {
    pub status: String,
    pub count: usize,
}

/// Sum of `Total` per calendar day; orders with an unknown time are left out.
pub fn daily_sales(orders: &[OrderRecord]) -> Vec<SalesPoint> {
    let mut by_day: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for order in orders {
        if let (Some(ts), Some(total)) = (order.order_placed_at, order.total) {
            *by_day.entry(ts.date()).or_default() += total;
        }
    }
    by_day
        .into_iter()
        .map(|(day, total_sales)| SalesPoint {
            label: day.to_string(),
            total_sales,
        })
        .collect()
}

/// Sum of `Total` per Monday-to-Sunday week, labelled `start/end`.
pub fn weekly_sales(orders: &[OrderRecord]) -> Vec<SalesPoint> {
    let mut by_week: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for order in orders {
        if let (Some(ts), Some(total)) = (order.order_placed_at, order.total) {
            *by_week.entry(week_start(ts.date())).or_default() += total;
        }
    }
    by_week
        .into_iter()
        .map(|(start, total_sales)| SalesPoint {
            label: format!("{}/{}", start, start + Duration::days(6)),
            total_sales,
        })
        .collect()
}

pub fn week_start(day: NaiveDate) -> NaiveDate {
    day - Duration::days(i64::from(day.weekday().num_days_from_monday()))
}

/// Orders per status, most frequent first.
pub fn status_distribution(orders: &[OrderRecord]) -> Vec<StatusCount> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for status in orders.iter().filter_map(|o| o.order_status.as_deref()) {
        *counts.entry(status).or_default() += 1;
    }
    let mut out = counts
        .into_iter()
        .map(|(status, count)| StatusCount {
            status: status.to_string(),
            count,
        })
        .collect::<Vec<_>>();
    out.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.status.cmp(&b.status)));
    out
}

/// Restaurants ranked by summed `Total`, highest first.
pub fn top_restaurants(orders: &[OrderRecord], limit: usize) -> Vec<SalesPoint> {
    let mut sales: HashMap<&str, f64> = HashMap::new();
    for order in orders {
        if let Some(name) = order.restaurant_name.as_deref() {
            *sales.entry(name).or_default() += order.total.unwrap_or(0.0);
        }
    }
    let mut ranked = sales
        .into_iter()
        .map(|(name, total_sales)| SalesPoint {
            label: name.to_string(),
            total_sales,
        })
        .collect::<Vec<_>>();
    ranked.sort_by(|a, b| {
        b.total_sales
            .total_cmp(&a.total_sales)
            .then_with(|| a.label.cmp(&b.label))
    });
    ranked.truncate(limit);
    ranked
}

/// Plain-text context handed to the assistant ahead of the user's question.
pub fn assistant_summary(orders: &[OrderRecord]) -> String {
    if orders.is_empty() {
        return "No stored order data available.".to_string();
    }
    let metrics = DashboardMetrics::compute(orders);
    let mut lines = vec![
        format!("Total Orders: {}", metrics.total_orders),
        format!("Total Sales: {:.2}", metrics.total_sales),
        format!("Average Rating: {:.2}/5.0", metrics.avg_rating.unwrap_or(0.0)),
    ];
    let top = top_restaurants(orders, 5);
    if !top.is_empty() {
        lines.push("Top restaurants (by sales):".to_string());
        for point in top {
            lines.push(format!("- {}: {:.0}", point.label, point.total_sales));
        }
    }
    lines.join("\n")
}

fn count_status(orders: &[OrderRecord], status: &str) -> usize {
    orders
        .iter()
        .filter(|o| o.order_status.as_deref() == Some(status))
        .count()
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize_order_placed_at;

    fn order(id: &str, restaurant: &str, placed: &str, status: &str, total: f64, rating: Option<f64>) -> OrderRecord {
        OrderRecord {
            order_id: Some(id.to_string()),
            restaurant_name: Some(restaurant.to_string()),
            order_placed_at: normalize_order_placed_at(placed),
            order_status: Some(status.to_string()),
            total: Some(total),
            rating,
            ..Default::default()
        }
    }

    fn sample() -> Vec<OrderRecord> {
        vec![
            order("A1", "Biryani Box", "07:04 PM, September 01 2025", "Delivered", 400.0, Some(4.0)),
            order("A2", "Biryani Box", "08:10 PM, September 01 2025", "Delivered", 200.0, None),
            order("A3", "Wrap Co", "01:00 PM, September 03 2025", "Cancelled", 150.0, Some(3.0)),
            order("A4", "Wrap Co", "12:15 PM, September 08 2025", "Delivered", 50.0, Some(5.0)),
        ]
    }

    #[test]
    fn kpis_follow_the_dashboard_definitions() {
        let metrics = DashboardMetrics::compute(&sample());
        assert_eq!(metrics.total_orders, 4);
        assert_eq!(metrics.total_sales, 800.0);
        assert_eq!(metrics.avg_rating, Some(4.0));
        assert_eq!(metrics.delivered_orders, 3);
        assert_eq!(metrics.cancelled_orders, 1);
        assert_eq!(metrics.completion_rate, 75.0);
        assert_eq!(metrics.avg_kpt_minutes, None);
    }

    #[test]
    fn empty_table_has_zero_completion_and_unknown_rating() {
        let metrics = DashboardMetrics::compute(&[]);
        assert_eq!(metrics.total_orders, 0);
        assert_eq!(metrics.completion_rate, 0.0);
        assert_eq!(metrics.avg_rating, None);
    }

    #[test]
    fn sales_group_by_day_and_by_monday_week() {
        let daily = daily_sales(&sample());
        assert_eq!(daily.len(), 3);
        assert_eq!(daily[0].label, "2025-09-01");
        assert_eq!(daily[0].total_sales, 600.0);

        let weekly = weekly_sales(&sample());
        assert_eq!(weekly.len(), 2);
        assert_eq!(weekly[0].label, "2025-09-01/2025-09-07");
        assert_eq!(weekly[0].total_sales, 750.0);
        assert_eq!(weekly[1].label, "2025-09-08/2025-09-14");
    }

    #[test]
    fn rankings_sort_descending() {
        let status = status_distribution(&sample());
        assert_eq!(status[0], StatusCount { status: "Delivered".into(), count: 3 });

        let top = top_restaurants(&sample(), 1);
        assert_eq!(top.len(), 1);
        assert_eq!(top[0].label, "Biryani Box");
        assert_eq!(top[0].total_sales, 600.0);
    }

    #[test]
    fn summary_lists_kpis_and_top_restaurants() {
        let summary = assistant_summary(&sample());
        assert!(summary.starts_with("Total Orders: 4\nTotal Sales: 800.00\nAverage Rating: 4.00/5.0"));
        assert!(summary.contains("- Biryani Box: 600"));
        assert_eq!(assistant_summary(&[]), "No stored order data available.");
    }
}
