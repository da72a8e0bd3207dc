//! SKU generation
//!
//! Format: `<CAT>-<12 hex>-<4 hex>`, e.g. `ELE-3F9A0C1B2D4E-A1B2`
//! - `CAT`: first three letters of the category, upper case
//! - body: SHA-256 of `name-category-seed-timestamp`, first 12 hex chars
//! - checksum: SHA-256 of `body + seed`, first 4 hex chars

use sha2::{Digest, Sha256};
use shared::models::ProductCategory;

pub fn generate_sku(name: &str, category: ProductCategory, seed: &str, now_ms: i64) -> String {
    let category_name = category.as_str();
    let base = format!("{name}-{category_name}-{seed}-{now_ms}");

    let body = hex::encode_upper(Sha256::digest(base.as_bytes()));
    let body = &body[..12];

    let checksum = hex::encode_upper(Sha256::digest(format!("{body}{seed}").as_bytes()));
    let checksum = &checksum[..4];

    let code: String = category_name.chars().take(3).collect::<String>().to_uppercase();
    format!("{code}-{body}-{checksum}")
}

/// Whether `sku`'s checksum matches its body for `seed`
pub fn verify_sku(sku: &str, seed: &str) -> bool {
    let mut parts = sku.splitn(3, '-');
    let (Some(_), Some(body), Some(checksum)) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    let expected = hex::encode_upper(Sha256::digest(format!("{body}{seed}").as_bytes()));
    expected.get(..4) == Some(checksum)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sku_shape() {
        let sku = generate_sku("Lamp", ProductCategory::Furniture, "seed", 1_700_000_000_000);
        let parts: Vec<&str> = sku.split('-').collect();

        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0], "FUR");
        assert_eq!(parts[1].len(), 12);
        assert_eq!(parts[2].len(), 4);
        assert!(parts[1].chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_lowercase()));
    }

    #[test]
    fn test_sku_is_deterministic_and_verifiable() {
        let a = generate_sku("Lamp", ProductCategory::Furniture, "seed", 1);
        let b = generate_sku("Lamp", ProductCategory::Furniture, "seed", 1);
        let c = generate_sku("Lamp", ProductCategory::Furniture, "seed", 2);

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert!(verify_sku(&a, "seed"));
        assert!(!verify_sku(&a, "other-seed"));
        assert!(!verify_sku("garbage", "seed"));
    }
}
