//! Order model
//!
//! An order is a detached snapshot of a finalized cart. After creation it
//! is advanced only through status transitions; the timeline records every
//! transition and is append-only. Historical entries are never rewritten.

use crate::models::cart::CustomizationGroup;
use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Order status
///
/// Forward-only chain with a cancellation escape limited to the phases
/// before the restaurant hands food to a courier:
///
/// ```text
/// Pending -> Confirmed -> Preparing -> Ready -> PickedUp -> OutForDelivery -> Delivered
///     \           \           \
///      `-----------`-----------`---> Cancelled
/// ```
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    #[default]
    Pending,
    Confirmed,
    Preparing,
    Ready,
    PickedUp,
    OutForDelivery,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// The single forward successor in the delivery chain, if any
    fn next_in_chain(self) -> Option<OrderStatus> {
        match self {
            OrderStatus::Pending => Some(OrderStatus::Confirmed),
            OrderStatus::Confirmed => Some(OrderStatus::Preparing),
            OrderStatus::Preparing => Some(OrderStatus::Ready),
            OrderStatus::Ready => Some(OrderStatus::PickedUp),
            OrderStatus::PickedUp => Some(OrderStatus::OutForDelivery),
            OrderStatus::OutForDelivery => Some(OrderStatus::Delivered),
            OrderStatus::Delivered | OrderStatus::Cancelled => None,
        }
    }

    /// Whether `next` is a legal transition from this status.
    ///
    /// Only the adjacent forward step is allowed (no skipping), plus
    /// Cancelled from any cancellable status.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        if next == OrderStatus::Cancelled {
            return self.can_cancel();
        }
        self.next_in_chain() == Some(next)
    }

    /// Whether the order may still be cancelled at this status
    pub fn can_cancel(self) -> bool {
        matches!(
            self,
            OrderStatus::Pending | OrderStatus::Confirmed | OrderStatus::Preparing
        )
    }

    /// Terminal statuses permit no further transitions
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }
}

impl std::fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Confirmed => "Confirmed",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::Ready => "Ready",
            OrderStatus::PickedUp => "PickedUp",
            OrderStatus::OutForDelivery => "OutForDelivery",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        };
        write!(f, "{}", name)
    }
}

/// One audit entry in the order timeline
///
/// `status` is a label, not always an [`OrderStatus`]: courier assignment
/// appends an "Assigned" entry without changing the order status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub status: String,
    pub timestamp: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Where the order is delivered
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAddress {
    pub street: String,
    pub city: String,
    pub zip_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

/// Payment method chosen at checkout
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentMethod {
    Cash,
    Card,
    Wallet,
    Online,
}

/// Payment status at the gateway boundary
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Refunded,
}

/// Payment block on the order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub method: PaymentMethod,
    pub status: PaymentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<Timestamp>,
}

impl PaymentInfo {
    pub fn new(method: PaymentMethod) -> Self {
        Self {
            method,
            status: PaymentStatus::Pending,
            transaction_id: None,
            paid_at: None,
        }
    }
}

/// Price breakdown, frozen at order creation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderPricing {
    pub subtotal: f64,
    pub delivery_fee: f64,
    pub tax: f64,
    pub discount: f64,
    pub tip: f64,
    /// `subtotal + delivery_fee + tax - discount + tip`
    pub total: f64,
}

/// Line item copied out of the cart at conversion (not a reference)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub menu_item_id: String,
    pub name: String,
    pub quantity: i32,
    pub unit_price: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub customizations: Vec<CustomizationGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    pub line_total: f64,
}

/// Customer rating captured after delivery
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRating {
    pub restaurant: i32,
    pub delivery: i32,
    pub food: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    pub rated_at: Timestamp,
}

/// Order document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: String,
    /// Human-facing unique reference, time-ordered
    pub order_number: String,
    pub customer_id: String,
    pub restaurant_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_person_id: Option<String>,
    pub items: Vec<OrderItem>,
    pub delivery_address: DeliveryAddress,
    pub pricing: OrderPricing,
    pub payment: PaymentInfo,
    pub status: OrderStatus,
    /// Append-only audit log; entry 0 is written at creation
    pub timeline: Vec<TimelineEntry>,
    pub estimated_delivery_time: Timestamp,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actual_delivery_time: Option<Timestamp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cancellation_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub customer_rating: Option<CustomerRating>,
    pub created_at: Timestamp,
    /// CAS counter, bumped by the store on each successful save
    #[serde(default)]
    pub version: u64,
}

impl Order {
    /// Whether the order is still moving through the delivery chain
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }

    pub fn can_cancel(&self) -> bool {
        self.status.can_cancel()
    }

    /// Minutes between creation and actual delivery, if delivered
    pub fn delivery_duration_minutes(&self) -> Option<i64> {
        self.actual_delivery_time
            .map(|t| (t - self.created_at) / 60_000)
    }
}
