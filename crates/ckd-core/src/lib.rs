//! Core order model, destination column list and diagnostics for the cloud kitchen dashboard.

use std::fmt;

use serde::{Deserialize, Serialize};

pub mod metrics;
pub mod timestamp;

pub use timestamp::{normalize_order_placed_at, CanonicalTimestamp};

pub const CRATE_NAME: &str = "ckd-core";

/// Destination table name.
pub const ORDERS_TABLE: &str = "orders";

pub const ORDER_COLUMN_COUNT: usize = 29;

/// Storage kind of a destination column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ColumnKind {
    Text,
    Number,
    Timestamp,
}

/// The fixed, ordered destination column list of the `orders` table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OrderColumn {
    RestaurantId,
    RestaurantName,
    Subzone,
    City,
    OrderId,
    OrderPlacedAt,
    OrderStatus,
    Delivery,
    Distance,
    ItemsInOrder,
    Instructions,
    DiscountConstruct,
    BillSubtotal,
    PackagingCharges,
    PromoDiscount,
    FlatOffsDiscount,
    GoldDiscount,
    BrandPackDiscount,
    Total,
    Rating,
    Review,
    CancellationReason,
    RestaurantCompensation,
    RestaurantPenalty,
    KptDurationMinutes,
    RiderWaitMinutes,
    OrderReadyMarked,
    CustomerComplaintTag,
    CustomerId,
}

impl OrderColumn {
    pub const ALL: [OrderColumn; ORDER_COLUMN_COUNT] = [
        OrderColumn::RestaurantId,
        OrderColumn::RestaurantName,
        OrderColumn::Subzone,
        OrderColumn::City,
        OrderColumn::OrderId,
        OrderColumn::OrderPlacedAt,
        OrderColumn::OrderStatus,
        OrderColumn::Delivery,
        OrderColumn::Distance,
        OrderColumn::ItemsInOrder,
        OrderColumn::Instructions,
        OrderColumn::DiscountConstruct,
        OrderColumn::BillSubtotal,
        OrderColumn::PackagingCharges,
        OrderColumn::PromoDiscount,
        OrderColumn::FlatOffsDiscount,
        OrderColumn::GoldDiscount,
        OrderColumn::BrandPackDiscount,
        OrderColumn::Total,
        OrderColumn::Rating,
        OrderColumn::Review,
        OrderColumn::CancellationReason,
        OrderColumn::RestaurantCompensation,
        OrderColumn::RestaurantPenalty,
        OrderColumn::KptDurationMinutes,
        OrderColumn::RiderWaitMinutes,
        OrderColumn::OrderReadyMarked,
        OrderColumn::CustomerComplaintTag,
        OrderColumn::CustomerId,
    ];

    /// Header as it appears in the CSV export and as the SQL column name.
    pub fn header(self) -> &'static str {
        match self {
            OrderColumn::RestaurantId => "Restaurant ID",
            OrderColumn::RestaurantName => "Restaurant name",
            OrderColumn::Subzone => "Subzone",
            OrderColumn::City => "City",
            OrderColumn::OrderId => "Order ID",
            OrderColumn::OrderPlacedAt => "Order Placed At",
            OrderColumn::OrderStatus => "Order Status",
            OrderColumn::Delivery => "Delivery",
            OrderColumn::Distance => "Distance",
            OrderColumn::ItemsInOrder => "Items in order",
            OrderColumn::Instructions => "Instructions",
            OrderColumn::DiscountConstruct => "Discount construct",
            OrderColumn::BillSubtotal => "Bill subtotal",
            OrderColumn::PackagingCharges => "Packaging charges",
            OrderColumn::PromoDiscount => "Restaurant discount (Promo)",
            OrderColumn::FlatOffsDiscount => "Restaurant discount (Flat offs, Freebies & others)",
            OrderColumn::GoldDiscount => "Gold discount",
            OrderColumn::BrandPackDiscount => "Brand pack discount",
            OrderColumn::Total => "Total",
            OrderColumn::Rating => "Rating",
            OrderColumn::Review => "Review",
            OrderColumn::CancellationReason => "Cancellation / Rejection reason",
            OrderColumn::RestaurantCompensation => "Restaurant compensation (Cancellation)",
            OrderColumn::RestaurantPenalty => "Restaurant penalty (Rejection)",
            OrderColumn::KptDurationMinutes => "KPT duration (minutes)",
            OrderColumn::RiderWaitMinutes => "Rider wait time (minutes)",
            OrderColumn::OrderReadyMarked => "Order Ready Marked",
            OrderColumn::CustomerComplaintTag => "Customer complaint tag",
            OrderColumn::CustomerId => "Customer ID",
        }
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            OrderColumn::OrderPlacedAt => ColumnKind::Timestamp,
            OrderColumn::BillSubtotal
            | OrderColumn::PackagingCharges
            | OrderColumn::PromoDiscount
            | OrderColumn::FlatOffsDiscount
            | OrderColumn::GoldDiscount
            | OrderColumn::BrandPackDiscount
            | OrderColumn::Total
            | OrderColumn::Rating
            | OrderColumn::RestaurantCompensation
            | OrderColumn::RestaurantPenalty
            | OrderColumn::KptDurationMinutes
            | OrderColumn::RiderWaitMinutes => ColumnKind::Number,
            _ => ColumnKind::Text,
        }
    }

    /// Exact match against an already-normalized header.
    pub fn from_header(header: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.header() == header)
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for OrderColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}

/// One bound value of a parameter tuple. Null is carried per kind so the driver can type it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamValue {
    Text(Option<String>),
    Number(Option<f64>),
    Timestamp(Option<CanonicalTimestamp>),
}

impl ParamValue {
    pub fn number(value: Option<f64>) -> Self {
        ParamValue::Number(value.filter(|v| v.is_finite()))
    }

    pub fn null(kind: ColumnKind) -> Self {
        match kind {
            ColumnKind::Text => ParamValue::Text(None),
            ColumnKind::Number => ParamValue::Number(None),
            ColumnKind::Timestamp => ParamValue::Timestamp(None),
        }
    }

    pub fn is_null(&self) -> bool {
        match self {
            ParamValue::Text(v) => v.is_none(),
            ParamValue::Number(v) => v.is_none(),
            ParamValue::Timestamp(v) => v.is_none(),
        }
    }

    pub fn into_text(self) -> Option<String> {
        match self {
            ParamValue::Text(v) => v,
            ParamValue::Number(v) => v.filter(|n| n.is_finite()).map(|n| n.to_string()),
            ParamValue::Timestamp(v) => v.map(|t| t.to_string()),
        }
    }

    pub fn into_number(self) -> Option<f64> {
        match self {
            ParamValue::Number(v) => v.filter(|n| n.is_finite()),
            ParamValue::Text(v) => v
                .and_then(|s| s.trim().parse::<f64>().ok())
                .filter(|n| n.is_finite()),
            ParamValue::Timestamp(_) => None,
        }
    }

    pub fn into_timestamp(self) -> Option<CanonicalTimestamp> {
        match self {
            ParamValue::Timestamp(v) => v,
            ParamValue::Text(v) => v.as_deref().and_then(normalize_order_placed_at),
            ParamValue::Number(_) => None,
        }
    }
}

/// Parameter tuple matching [`OrderColumn::ALL`] position for position.
pub type OrderParams = [ParamValue; ORDER_COLUMN_COUNT];

/// One food-delivery order. Every field is optional; absent source values stay `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub restaurant_id: Option<String>,
    pub restaurant_name: Option<String>,
    pub subzone: Option<String>,
    pub city: Option<String>,
    pub order_id: Option<String>,
    pub order_placed_at: Option<CanonicalTimestamp>,
    pub order_status: Option<String>,
    pub delivery: Option<String>,
    pub distance: Option<String>,
    pub items_in_order: Option<String>,
    pub instructions: Option<String>,
    pub discount_construct: Option<String>,
    pub bill_subtotal: Option<f64>,
    pub packaging_charges: Option<f64>,
    pub promo_discount: Option<f64>,
    pub flat_offs_discount: Option<f64>,
    pub gold_discount: Option<f64>,
    pub brand_pack_discount: Option<f64>,
    pub total: Option<f64>,
    pub rating: Option<f64>,
    pub review: Option<String>,
    pub cancellation_reason: Option<String>,
    pub restaurant_compensation: Option<f64>,
    pub restaurant_penalty: Option<f64>,
    pub kpt_duration_minutes: Option<f64>,
    pub rider_wait_minutes: Option<f64>,
    pub order_ready_marked: Option<String>,
    pub customer_complaint_tag: Option<String>,
    pub customer_id: Option<String>,
}

impl OrderRecord {
    pub fn param(&self, column: OrderColumn) -> ParamValue {
        let text = |v: &Option<String>| ParamValue::Text(v.clone());
        let number = |v: &Option<f64>| ParamValue::number(*v);
        match column {
            OrderColumn::RestaurantId => text(&self.restaurant_id),
            OrderColumn::RestaurantName => text(&self.restaurant_name),
            OrderColumn::Subzone => text(&self.subzone),
            OrderColumn::City => text(&self.city),
            OrderColumn::OrderId => text(&self.order_id),
            OrderColumn::OrderPlacedAt => ParamValue::Timestamp(self.order_placed_at),
            OrderColumn::OrderStatus => text(&self.order_status),
            OrderColumn::Delivery => text(&self.delivery),
            OrderColumn::Distance => text(&self.distance),
            OrderColumn::ItemsInOrder => text(&self.items_in_order),
            OrderColumn::Instructions => text(&self.instructions),
            OrderColumn::DiscountConstruct => text(&self.discount_construct),
            OrderColumn::BillSubtotal => number(&self.bill_subtotal),
            OrderColumn::PackagingCharges => number(&self.packaging_charges),
            OrderColumn::PromoDiscount => number(&self.promo_discount),
            OrderColumn::FlatOffsDiscount => number(&self.flat_offs_discount),
            OrderColumn::GoldDiscount => number(&self.gold_discount),
            OrderColumn::BrandPackDiscount => number(&self.brand_pack_discount),
            OrderColumn::Total => number(&self.total),
            OrderColumn::Rating => number(&self.rating),
            OrderColumn::Review => text(&self.review),
            OrderColumn::CancellationReason => text(&self.cancellation_reason),
            OrderColumn::RestaurantCompensation => number(&self.restaurant_compensation),
            OrderColumn::RestaurantPenalty => number(&self.restaurant_penalty),
            OrderColumn::KptDurationMinutes => number(&self.kpt_duration_minutes),
            OrderColumn::RiderWaitMinutes => number(&self.rider_wait_minutes),
            OrderColumn::OrderReadyMarked => text(&self.order_ready_marked),
            OrderColumn::CustomerComplaintTag => text(&self.customer_complaint_tag),
            OrderColumn::CustomerId => text(&self.customer_id),
        }
    }

    pub fn set_param(&mut self, column: OrderColumn, value: ParamValue) {
        match column {
            OrderColumn::RestaurantId => self.restaurant_id = value.into_text(),
            OrderColumn::RestaurantName => self.restaurant_name = value.into_text(),
            OrderColumn::Subzone => self.subzone = value.into_text(),
            OrderColumn::City => self.city = value.into_text(),
            OrderColumn::OrderId => self.order_id = value.into_text(),
            OrderColumn::OrderPlacedAt => self.order_placed_at = value.into_timestamp(),
            OrderColumn::OrderStatus => self.order_status = value.into_text(),
            OrderColumn::Delivery => self.delivery = value.into_text(),
            OrderColumn::Distance => self.distance = value.into_text(),
            OrderColumn::ItemsInOrder => self.items_in_order = value.into_text(),
            OrderColumn::Instructions => self.instructions = value.into_text(),
            OrderColumn::DiscountConstruct => self.discount_construct = value.into_text(),
            OrderColumn::BillSubtotal => self.bill_subtotal = value.into_number(),
            OrderColumn::PackagingCharges => self.packaging_charges = value.into_number(),
            OrderColumn::PromoDiscount => self.promo_discount = value.into_number(),
            OrderColumn::FlatOffsDiscount => self.flat_offs_discount = value.into_number(),
            OrderColumn::GoldDiscount => self.gold_discount = value.into_number(),
            OrderColumn::BrandPackDiscount => self.brand_pack_discount = value.into_number(),
            OrderColumn::Total => self.total = value.into_number(),
            OrderColumn::Rating => self.rating = value.into_number(),
            OrderColumn::Review => self.review = value.into_text(),
            OrderColumn::CancellationReason => self.cancellation_reason = value.into_text(),
            OrderColumn::RestaurantCompensation => {
                self.restaurant_compensation = value.into_number()
            }
            OrderColumn::RestaurantPenalty => self.restaurant_penalty = value.into_number(),
            OrderColumn::KptDurationMinutes => self.kpt_duration_minutes = value.into_number(),
            OrderColumn::RiderWaitMinutes => self.rider_wait_minutes = value.into_number(),
            OrderColumn::OrderReadyMarked => self.order_ready_marked = value.into_text(),
            OrderColumn::CustomerComplaintTag => self.customer_complaint_tag = value.into_text(),
            OrderColumn::CustomerId => self.customer_id = value.into_text(),
        }
    }

    pub fn to_params(&self) -> OrderParams {
        OrderColumn::ALL.map(|column| self.param(column))
    }

    pub fn from_params(params: &OrderParams) -> Self {
        let mut record = Self::default();
        for (column, value) in OrderColumn::ALL.into_iter().zip(params.iter()) {
            record.set_param(column, value.clone());
        }
        record
    }

    /// Cell text for previews and CSV export; null renders as an empty string.
    pub fn display_value(&self, column: OrderColumn) -> String {
        self.param(column).into_text().unwrap_or_default()
    }
}

/// Result of one synchronization call. `inserted + skipped` always equals the input row count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub inserted: u64,
    pub skipped: u64,
}

impl SyncOutcome {
    pub fn from_inserted(total_rows: usize, inserted: u64) -> Self {
        let total = total_rows as u64;
        let inserted = inserted.min(total);
        Self {
            inserted,
            skipped: total - inserted,
        }
    }

    pub fn total(&self) -> u64 {
        self.inserted + self.skipped
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// User-visible message produced at a component boundary instead of a propagated error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: DiagnosticLevel,
    pub message: String,
}

impl Diagnostic {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: DiagnosticLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == DiagnosticLevel::Error
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = match self.level {
            DiagnosticLevel::Info => "info",
            DiagnosticLevel::Success => "ok",
            DiagnosticLevel::Warning => "warning",
            DiagnosticLevel::Error => "error",
        };
        write!(f, "[{tag}] {}", self.message)
    }
}
