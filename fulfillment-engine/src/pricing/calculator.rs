//! Price Calculator
//!
//! Logic for computing line and order totals from cart contents.
//! Uses rust_decimal for precise calculations, stores as f64.

use crate::error::{EngineError, EngineResult};
use rust_decimal::prelude::*;
use shared::models::{CartLineItem, CustomizationGroup};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Maximum allowed monetary value per component (€1,000,000)
const MAX_MONEY: f64 = 1_000_000.0;
/// Maximum allowed quantity per line
const MAX_QUANTITY: i32 = 9999;

/// Convert f64 to Decimal for calculation
#[inline]
pub(crate) fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub(crate) fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Validate a monetary input and convert it to Decimal
fn require_money(value: f64, field_name: &str) -> EngineResult<Decimal> {
    if !value.is_finite() {
        return Err(EngineError::InvalidPricingInput(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    if value < 0.0 {
        return Err(EngineError::InvalidPricingInput(format!(
            "{} must be non-negative, got {}",
            field_name, value
        )));
    }
    if value > MAX_MONEY {
        return Err(EngineError::InvalidPricingInput(format!(
            "{} exceeds maximum allowed ({}), got {}",
            field_name, MAX_MONEY, value
        )));
    }
    Ok(to_decimal(value))
}

/// Sum of all selected option prices across the customization groups
pub fn customization_total(customizations: &[CustomizationGroup]) -> EngineResult<f64> {
    let mut total = Decimal::ZERO;
    for group in customizations {
        for option in &group.selected_options {
            total += require_money(option.price, "option price")?;
        }
    }
    Ok(to_f64(total))
}

/// Line total: `(unit_price + customization_total) * quantity`
pub fn line_total(unit_price: f64, customization_total: f64, quantity: i32) -> EngineResult<f64> {
    let unit = require_money(unit_price, "unit_price")?;
    let customizations = require_money(customization_total, "customization_total")?;
    if quantity < 1 {
        return Err(EngineError::InvalidPricingInput(format!(
            "quantity must be at least 1, got {}",
            quantity
        )));
    }
    if quantity > MAX_QUANTITY {
        return Err(EngineError::InvalidPricingInput(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, quantity
        )));
    }

    Ok(to_f64((unit + customizations) * Decimal::from(quantity)))
}

/// Order total: `subtotal + delivery_fee + tax - discount + tip`
///
/// All inputs must be non-negative and the result must not go negative;
/// a discount larger than the rest of the order is rejected rather than
/// clamped.
pub fn order_total(
    subtotal: f64,
    delivery_fee: f64,
    tax: f64,
    discount: f64,
    tip: f64,
) -> EngineResult<f64> {
    let subtotal = require_money(subtotal, "subtotal")?;
    let delivery_fee = require_money(delivery_fee, "delivery_fee")?;
    let tax = require_money(tax, "tax")?;
    let discount = require_money(discount, "discount")?;
    let tip = require_money(tip, "tip")?;

    let total = subtotal + delivery_fee + tax - discount + tip;
    if total < Decimal::ZERO {
        return Err(EngineError::InvalidPricingInput(format!(
            "discount {} exceeds order value",
            discount
        )));
    }
    Ok(to_f64(total))
}

/// Cart subtotal: sum of all line totals
pub fn cart_subtotal(items: &[CartLineItem]) -> f64 {
    let total: Decimal = items.iter().map(|item| to_decimal(item.line_total)).sum();
    to_f64(total)
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::OptionSelection;

    fn group(name: &str, options: &[(&str, f64)]) -> CustomizationGroup {
        CustomizationGroup {
            group_name: name.to_string(),
            selected_options: options
                .iter()
                .map(|(n, p)| OptionSelection {
                    name: n.to_string(),
                    price: *p,
                })
                .collect(),
        }
    }

    #[test]
    fn test_customization_total_empty() {
        assert_eq!(customization_total(&[]).unwrap(), 0.0);
    }

    #[test]
    fn test_customization_total_sums_options() {
        let groups = vec![
            group("Size", &[("Large", 2.5)]),
            group("Extras", &[("Cheese", 1.0), ("Bacon", 1.5)]),
        ];
        assert_eq!(customization_total(&groups).unwrap(), 5.0);
    }

    #[test]
    fn test_customization_total_rejects_negative_option() {
        let groups = vec![group("Extras", &[("Bad", -1.0)])];
        assert!(matches!(
            customization_total(&groups),
            Err(EngineError::InvalidPricingInput(_))
        ));
    }

    #[test]
    fn test_line_total() {
        // (10 + 2.5) * 3 = 37.50
        assert_eq!(line_total(10.0, 2.5, 3).unwrap(), 37.5);
    }

    #[test]
    fn test_line_total_rejects_zero_quantity() {
        assert!(matches!(
            line_total(10.0, 0.0, 0),
            Err(EngineError::InvalidPricingInput(_))
        ));
    }

    #[test]
    fn test_line_total_rejects_negative_price() {
        assert!(matches!(
            line_total(-1.0, 0.0, 1),
            Err(EngineError::InvalidPricingInput(_))
        ));
    }

    #[test]
    fn test_line_total_rejects_nan() {
        assert!(matches!(
            line_total(f64::NAN, 0.0, 1),
            Err(EngineError::InvalidPricingInput(_))
        ));
    }

    #[test]
    fn test_order_total() {
        // 30 + 5 + 2 - 0 + 3 = 40
        assert_eq!(order_total(30.0, 5.0, 2.0, 0.0, 3.0).unwrap(), 40.0);
    }

    #[test]
    fn test_order_total_with_discount() {
        assert_eq!(order_total(50.0, 4.0, 3.0, 10.0, 0.0).unwrap(), 47.0);
    }

    #[test]
    fn test_order_total_rejects_negative_result() {
        assert!(matches!(
            order_total(10.0, 0.0, 0.0, 20.0, 0.0),
            Err(EngineError::InvalidPricingInput(_))
        ));
    }

    #[test]
    fn test_order_total_rejects_negative_component() {
        assert!(matches!(
            order_total(10.0, -1.0, 0.0, 0.0, 0.0),
            Err(EngineError::InvalidPricingInput(_))
        ));
    }

    #[test]
    fn test_cart_subtotal_sums_line_totals() {
        let items = vec![
            CartLineItem {
                line_id: "l1".to_string(),
                menu_item_id: "m1".to_string(),
                name: "A".to_string(),
                unit_price: 10.0,
                quantity: 2,
                customizations: vec![],
                special_instructions: None,
                line_total: 20.0,
            },
            CartLineItem {
                line_id: "l2".to_string(),
                menu_item_id: "m2".to_string(),
                name: "B".to_string(),
                unit_price: 5.25,
                quantity: 1,
                customizations: vec![],
                special_instructions: None,
                line_total: 5.25,
            },
        ];
        assert_eq!(cart_subtotal(&items), 25.25);
        assert_eq!(cart_subtotal(&[]), 0.0);
    }

    // ========== Precision tests ==========

    #[test]
    fn test_precision_small_amounts() {
        assert_eq!(line_total(0.01, 0.01, 3).unwrap(), 0.06);
    }

    #[test]
    fn test_precision_repeated_cents() {
        // 0.1 + 0.2 style float traps must not leak into totals
        assert_eq!(order_total(0.1, 0.2, 0.0, 0.0, 0.0).unwrap(), 0.3);
    }

    #[test]
    fn test_determinism() {
        for _ in 0..10 {
            assert_eq!(line_total(99.99, 3.33, 7).unwrap(), 723.24);
        }
    }
}
