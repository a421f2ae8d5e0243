//! Cart model
//!
//! A cart belongs to exactly one customer and is bound to exactly one
//! restaurant at a time. Line items carry the full customization tree so
//! two selections of the same menu item with different options stay
//! separate lines, while equivalent selections merge by quantity.

use crate::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Maximum length of per-line special instructions
pub const MAX_SPECIAL_INSTRUCTIONS: usize = 200;

/// A single selected option within a customization group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionSelection {
    pub name: String,
    /// Price delta added to the unit price
    pub price: f64,
}

/// One customization group with its selected options
/// (e.g. "Size" -> ["Large"], "Extras" -> ["Cheese", "Bacon"])
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomizationGroup {
    pub group_name: String,
    pub selected_options: Vec<OptionSelection>,
}

/// One distinct product configuration in a cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLineItem {
    /// Line ID (assigned when the line is first created)
    pub line_id: String,
    /// Menu item this line refers to
    pub menu_item_id: String,
    /// Menu item name snapshot
    pub name: String,
    /// Base price per unit, before customizations
    pub unit_price: f64,
    pub quantity: i32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub customizations: Vec<CustomizationGroup>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_instructions: Option<String>,
    /// `(unit_price + customization total) * quantity`
    pub line_total: f64,
}

/// Cart status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CartStatus {
    #[default]
    Active,
    Checkout,
    Completed,
    Abandoned,
}

/// Shopping cart document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cart {
    pub id: String,
    pub customer_id: String,
    pub restaurant_id: String,
    pub items: Vec<CartLineItem>,
    /// Sum of all line totals
    pub subtotal: f64,
    pub status: CartStatus,
    /// Last mutation timestamp, drives the abandonment sweep
    pub last_updated: Timestamp,
    pub created_at: Timestamp,
    /// CAS counter, bumped by the store on each successful save
    #[serde(default)]
    pub version: u64,
}

impl Cart {
    /// Create a new empty Active cart
    pub fn new(customer_id: impl Into<String>, restaurant_id: impl Into<String>, now: Timestamp) -> Self {
        Self {
            id: crate::util::new_id(),
            customer_id: customer_id.into(),
            restaurant_id: restaurant_id.into(),
            items: Vec::new(),
            subtotal: 0.0,
            status: CartStatus::Active,
            last_updated: now,
            created_at: now,
            version: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == CartStatus::Active
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Total unit count across all lines
    pub fn item_count(&self) -> i32 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cart_is_empty_and_active() {
        let cart = Cart::new("cust-1", "rest-1", 1_000);
        assert!(cart.is_active());
        assert!(cart.is_empty());
        assert_eq!(cart.subtotal, 0.0);
        assert_eq!(cart.item_count(), 0);
        assert_eq!(cart.version, 0);
    }

    #[test]
    fn test_item_count_sums_quantities() {
        let mut cart = Cart::new("cust-1", "rest-1", 1_000);
        cart.items.push(CartLineItem {
            line_id: "line-1".to_string(),
            menu_item_id: "menu-1".to_string(),
            name: "Burger".to_string(),
            unit_price: 10.0,
            quantity: 2,
            customizations: vec![],
            special_instructions: None,
            line_total: 20.0,
        });
        cart.items.push(CartLineItem {
            line_id: "line-2".to_string(),
            menu_item_id: "menu-2".to_string(),
            name: "Fries".to_string(),
            unit_price: 4.0,
            quantity: 3,
            customizations: vec![],
            special_instructions: None,
            line_total: 12.0,
        });
        assert_eq!(cart.item_count(), 5);
        assert!(!cart.is_empty());
    }

    #[test]
    fn test_cart_status_wire_format() {
        let json = serde_json::to_string(&CartStatus::Abandoned).unwrap();
        assert_eq!(json, "\"ABANDONED\"");
    }
}
