use iso_currency::Currency;
use rust_decimal::Decimal;
use validator::{ValidationError, ValidationErrors};

/// Validates that a currency code is a valid ISO 4217 currency code
pub fn validate_currency_code(code: &str) -> Result<Currency, ValidationError> {
    Currency::from_code(code).ok_or_else(|| {
        let mut error = ValidationError::new("invalid_currency");
        error.message = Some(format!("'{}' is not a valid ISO 4217 currency code", code).into());
        error
    })
}

/// Validates that an amount is not negative
pub fn validate_non_negative_amount(amount: &Decimal) -> Result<(), ValidationError> {
    if *amount < Decimal::ZERO {
        let mut error = ValidationError::new("invalid_amount");
        error.message = Some("Amount must not be negative".into());
        return Err(error);
    }
    Ok(())
}

/// Largest magnitude a `NUMERIC(14,2)` column can hold
pub const MAX_AMOUNT: Decimal = Decimal::from_parts(276_447_231, 23_283, 0, false, 2);

/// Validates that an amount fits the stored column: at most two decimal
/// places and a magnitude no larger than [`MAX_AMOUNT`]
pub fn validate_amount_range(amount: &Decimal) -> Result<(), ValidationError> {
    let message = if amount.normalize().scale() > 2 {
        "Amount must have at most 2 decimal places"
    } else if amount.abs() > MAX_AMOUNT {
        "Amount is too large"
    } else {
        return Ok(());
    };
    let mut error = ValidationError::new("invalid_amount");
    error.message = Some(message.into());
    Err(error)
}

/// Builds the 400 message listing every field that failed validation,
/// using the camelCase names clients send.
pub fn missing_fields_message(errors: &ValidationErrors) -> String {
    let mut fields: Vec<String> = errors
        .field_errors()
        .keys()
        .map(|field| to_camel_case(field))
        .collect();
    fields.sort();
    format!("Missing required fields: {}", fields.join(", "))
}

fn to_camel_case(field: &str) -> String {
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
