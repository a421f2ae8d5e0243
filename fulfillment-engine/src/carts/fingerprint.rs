//! Content-addressed line-item identity
//!
//! Two cart lines are the same product configuration iff they share a
//! menu item and an identical customization set. The fingerprint hashes
//! the customization tree in canonical form (groups sorted by name,
//! options sorted within each group), so selection order never splits a
//! line that should merge.
//!
//! Special instructions are display-only and deliberately excluded from
//! the identity.

use shared::models::CustomizationGroup;

/// Price in integral cents, to keep float noise out of the hash
fn price_cents(price: f64) -> i64 {
    (price * 100.0).round() as i64
}

/// Generate the content-addressed fingerprint for a line item
pub fn line_fingerprint(menu_item_id: &str, customizations: &[CustomizationGroup]) -> String {
    use sha2::{Digest, Sha256};

    // Canonicalize: sort groups by name, options by (name, price) within
    // each group
    let mut groups: Vec<(&str, Vec<(&str, i64)>)> = customizations
        .iter()
        .map(|group| {
            let mut options: Vec<(&str, i64)> = group
                .selected_options
                .iter()
                .map(|o| (o.name.as_str(), price_cents(o.price)))
                .collect();
            options.sort();
            (group.group_name.as_str(), options)
        })
        .collect();
    groups.sort();

    let mut hasher = Sha256::new();
    hasher.update(menu_item_id.as_bytes());
    for (group_name, options) in &groups {
        hasher.update([0x1e]);
        hasher.update(group_name.as_bytes());
        for (option_name, cents) in options {
            hasher.update([0x1f]);
            hasher.update(option_name.as_bytes());
            hasher.update(cents.to_le_bytes());
        }
    }

    let result = hasher.finalize();
    hex::encode(&result[..16]) // Use first 16 bytes for shorter ID
}
