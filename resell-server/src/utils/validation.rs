//! Input validation helpers
//!
//! Text length limits, and conversion of `validator` errors into the
//! field-level list returned with HTTP 400.

use std::borrow::Cow;

use rust_decimal::Decimal;
use validator::{ValidationErrors, ValidationErrorsKind};

use crate::utils::{AppError, ErrorCode, FieldError};

// ── Limits ──────────────────────────────────────────────────────────

/// Product names
pub const MAX_NAME_LEN: usize = 100;

/// Product descriptions
pub const MAX_DESCRIPTION_LEN: usize = 1000;

/// Review comments
pub const MAX_COMMENT_LEN: usize = 500;

/// Short text: city, country, location, tags
pub const MAX_SHORT_TEXT_LEN: usize = 100;

/// Street addresses
pub const MAX_ADDRESS_LEN: usize = 500;

/// Image references per product
pub const MAX_IMAGES: usize = 10;

/// Tags per product
pub const MAX_TAGS: usize = 20;

/// Maximum allowed price per product
pub const MAX_PRICE: Decimal = Decimal::from_parts(1_000_000, 0, 0, false, 0);

/// Maximum quantity per cart line
pub const MAX_QUANTITY: u32 = 9999;

// ── Helpers ─────────────────────────────────────────────────────────

/// Validate that a required string is non-empty and within the length limit.
pub fn validate_required_text(value: &str, field: &str, max_len: usize) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::validation(format!("{field} must not be empty")));
    }
    if value.chars().count() > max_len {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            value.chars().count()
        )));
    }
    Ok(())
}

/// Validate that an optional string, if present, is within the length limit.
pub fn validate_optional_text(
    value: &Option<String>,
    field: &str,
    max_len: usize,
) -> Result<(), AppError> {
    if let Some(v) = value
        && v.chars().count() > max_len
    {
        return Err(AppError::validation(format!(
            "{field} is too long ({} chars, max {max_len})",
            v.chars().count()
        )));
    }
    Ok(())
}

/// Validate a price: non-negative and below [`MAX_PRICE`]
pub fn validate_price(price: Decimal, field: &str) -> Result<(), AppError> {
    if price.is_sign_negative() {
        return Err(AppError::with_message(
            ErrorCode::ProductInvalidPrice,
            format!("{field} must be non-negative, got {price}"),
        ));
    }
    if price > MAX_PRICE {
        return Err(AppError::with_message(
            ErrorCode::ProductInvalidPrice,
            format!("{field} exceeds maximum allowed ({MAX_PRICE}), got {price}"),
        ));
    }
    Ok(())
}

/// Validate a cart quantity: 1..=MAX_QUANTITY
pub fn validate_quantity(quantity: u32) -> Result<(), AppError> {
    if quantity == 0 {
        return Err(AppError::validation_fields(vec![FieldError::new(
            "quantity",
            "Quantity must be at least 1",
        )]));
    }
    if quantity > MAX_QUANTITY {
        return Err(AppError::validation_fields(vec![FieldError::new(
            "quantity",
            format!("Quantity must be at most {MAX_QUANTITY}"),
        )]));
    }
    Ok(())
}

// ── validator integration ───────────────────────────────────────────

/// Flatten `validator` errors into a sorted `{ field, message }` list.
///
/// Nested struct fields are joined with `.` and converted to camelCase so the
/// names match the JSON the client sent (`shippingAddress.firstName`).
pub fn field_errors(errors: &ValidationErrors) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect(errors, "", &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn collect(errors: &ValidationErrors, prefix: &str, out: &mut Vec<FieldError>) {
    for (field, kind) in errors.errors() {
        let path = if prefix.is_empty() {
            camel_case(field)
        } else {
            format!("{}.{}", prefix, camel_case(field))
        };
        match kind {
            ValidationErrorsKind::Field(list) => {
                for err in list {
                    let message = err
                        .message
                        .as_ref()
                        .map(Cow::to_string)
                        .unwrap_or_else(|| format!("{} is invalid", path));
                    out.push(FieldError::new(path.clone(), message));
                }
            }
            ValidationErrorsKind::Struct(nested) => collect(nested, &path, out),
            ValidationErrorsKind::List(items) => {
                for (idx, nested) in items {
                    collect(nested, &format!("{}[{}]", path, idx), out);
                }
            }
        }
    }
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

/// `validator` errors -> HTTP 400 with `details.errors`
pub fn validation_error(errors: &ValidationErrors) -> AppError {
    AppError::validation_fields(field_errors(errors))
}

#[cfg(test)]
mod tests {
    use super::*;
    use validator::Validate;

    #[derive(Validate)]
    struct Inner {
        #[validate(length(min = 1, message = "First name is required"))]
        first_name: String,
    }

    #[derive(Validate)]
    struct Outer {
        #[validate(nested)]
        shipping_address: Inner,
        #[validate(email(message = "Valid email is required"))]
        email: String,
    }

    #[test]
    fn test_field_errors_are_flattened_and_camel_cased() {
        let value = Outer {
            shipping_address: Inner {
                first_name: String::new(),
            },
            email: "nope".into(),
        };
        let errors = value.validate().unwrap_err();
        let fields = field_errors(&errors);

        assert_eq!(fields.len(), 2);
        assert_eq!(fields[0].field, "email");
        assert_eq!(fields[0].message, "Valid email is required");
        assert_eq!(fields[1].field, "shippingAddress.firstName");
        assert_eq!(fields[1].message, "First name is required");
    }

    #[test]
    fn test_validate_required_text() {
        assert!(validate_required_text("Lamp", "name", MAX_NAME_LEN).is_ok());
        assert!(validate_required_text("   ", "name", MAX_NAME_LEN).is_err());
        assert!(validate_required_text(&"x".repeat(101), "name", MAX_NAME_LEN).is_err());
    }

    #[test]
    fn test_validate_price() {
        assert!(validate_price(Decimal::ZERO, "price").is_ok());
        assert!(validate_price(Decimal::new(-1, 2), "price").is_err());
        assert!(validate_price(MAX_PRICE + Decimal::ONE, "price").is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(MAX_QUANTITY + 1).is_err());
    }

    #[test]
    fn test_camel_case() {
        assert_eq!(camel_case("payment_method"), "paymentMethod");
        assert_eq!(camel_case("city"), "city");
    }
}
