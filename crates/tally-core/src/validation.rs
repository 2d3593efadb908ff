//! # Validation Module
//!
//! Input validation for ledger requests.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE (before any transaction starts)                  │
//! │  ├── Shape checks: empty, length, format                               │
//! │  └── Amount sign checks                                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Ledger services (under the row claim)                        │
//! │  ├── Balance checks (ExceedsBalance, InsufficientCredit)               │
//! │  └── State checks (AlreadySettled, InvalidState)                       │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── CHECK (0 <= remaining <= amount), CHECK (amount > 0)              │
//! │  ├── UNIQUE (tenant, series_code), one open shift per store            │
//! │  └── Append-only triggers                                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use tally_core::validation::{validate_series_code, sanitize_reference};
//!
//! assert_eq!(validate_series_code(" f001 ").unwrap(), "F001");
//! assert_eq!(sanitize_reference("#B001-00000042").unwrap(), "B001-00000042");
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::{MAX_AMOUNT_CENTS, MAX_SERIES_CODE_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

const MAX_ID_LEN: usize = 64;
const MAX_NAME_LEN: usize = 200;
const MAX_DESCRIPTION_LEN: usize = 200;
const MAX_NOTES_LEN: usize = 500;
const MAX_REFERENCE_LEN: usize = 50;
const MAX_DOCUMENT_TYPE_LEN: usize = 4;

// =============================================================================
// Identifier Validators
// =============================================================================

/// Validates a tenant, store, user, or entity identifier.
///
/// Tenants and stores come from the caller's session, so only shape is
/// checked here: present, bounded, no surrounding whitespace.
pub fn validate_id(field: &str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if id.len() > MAX_ID_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_ID_LEN,
        });
    }

    if id.trim() != id {
        return Err(ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: "must not have leading or trailing whitespace".to_string(),
        });
    }

    Ok(())
}

/// Validates and normalises a series code.
///
/// ## Rules
/// - 1 to 4 ASCII letters or digits
/// - Stored upper-case
///
/// ## Example
/// ```rust
/// use tally_core::validation::validate_series_code;
///
/// assert_eq!(validate_series_code("b001").unwrap(), "B001");
/// assert!(validate_series_code("").is_err());
/// assert!(validate_series_code("F0001").is_err());
/// assert!(validate_series_code("F-01").is_err());
/// ```
pub fn validate_series_code(code: &str) -> ValidationResult<String> {
    let code = code.trim();

    if code.is_empty() {
        return Err(ValidationError::Required {
            field: "series_code".to_string(),
        });
    }

    if code.len() > MAX_SERIES_CODE_LEN {
        return Err(ValidationError::TooLong {
            field: "series_code".to_string(),
            max: MAX_SERIES_CODE_LEN,
        });
    }

    if !code.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "series_code".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(code.to_ascii_uppercase())
}

/// Validates a document type code such as `01` or `80`.
pub fn validate_document_type(document_type: &str) -> ValidationResult<()> {
    if document_type.trim().is_empty() {
        return Err(ValidationError::Required {
            field: "document_type".to_string(),
        });
    }

    if document_type.len() > MAX_DOCUMENT_TYPE_LEN {
        return Err(ValidationError::TooLong {
            field: "document_type".to_string(),
            max: MAX_DOCUMENT_TYPE_LEN,
        });
    }

    if !document_type.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ValidationError::InvalidFormat {
            field: "document_type".to_string(),
            reason: "must contain only letters and digits".to_string(),
        });
    }

    Ok(())
}

// =============================================================================
// String Validators
// =============================================================================

/// Validates a display name (customer name, cashier name).
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    if name.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: MAX_NAME_LEN,
        });
    }

    Ok(name.to_string())
}

/// Validates a movement description. Required, at most 200 characters.
pub fn validate_description(description: &str) -> ValidationResult<String> {
    let description = description.trim();

    if description.is_empty() {
        return Err(ValidationError::Required {
            field: "description".to_string(),
        });
    }

    if description.chars().count() > MAX_DESCRIPTION_LEN {
        return Err(ValidationError::TooLong {
            field: "description".to_string(),
            max: MAX_DESCRIPTION_LEN,
        });
    }

    Ok(description.to_string())
}

/// Normalises optional free-text notes. Blank notes become `None`.
pub fn validate_notes(notes: Option<&str>) -> ValidationResult<Option<String>> {
    let Some(notes) = notes.map(str::trim).filter(|n| !n.is_empty()) else {
        return Ok(None);
    };

    if notes.chars().count() > MAX_NOTES_LEN {
        return Err(ValidationError::TooLong {
            field: "notes".to_string(),
            max: MAX_NOTES_LEN,
        });
    }

    Ok(Some(notes.to_string()))
}

/// Normalises a sale reference used to correlate credits and refunds.
///
/// Cashiers type references as `#B001-00000042` or with stray spaces; both
/// forms resolve to `B001-00000042`.
///
/// ## Example
/// ```rust
/// use tally_core::validation::sanitize_reference;
///
/// assert_eq!(sanitize_reference("  #NV01-00000007 ").unwrap(), "NV01-00000007");
/// assert!(sanitize_reference("#").is_err());
/// ```
pub fn sanitize_reference(reference: &str) -> ValidationResult<String> {
    let cleaned: String = reference.chars().filter(|c| *c != '#').collect();
    let cleaned = cleaned.trim();

    if cleaned.is_empty() {
        return Err(ValidationError::Required {
            field: "reference".to_string(),
        });
    }

    if cleaned.chars().count() > MAX_REFERENCE_LEN {
        return Err(ValidationError::TooLong {
            field: "reference".to_string(),
            max: MAX_REFERENCE_LEN,
        });
    }

    Ok(cleaned.to_string())
}

// =============================================================================
// Amount Validators
// =============================================================================

/// Rejects zero, negative, and oversized amounts with `InvalidAmount`.
///
/// Payments, credits, and drawer movements all require a strictly positive
/// amount; callers see this as a ledger rule, not a form error.
pub fn ensure_positive(field: &str, amount: Money) -> CoreResult<()> {
    if !amount.is_positive() {
        return Err(CoreError::invalid_amount(format!(
            "{field} must be positive, got {amount}"
        )));
    }

    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(CoreError::invalid_amount(format!(
            "{field} must be at most {}, got {amount}",
            Money::from_cents(MAX_AMOUNT_CENTS)
        )));
    }

    Ok(())
}

/// Validates an amount that may be zero (opening float, counted cash,
/// credit limit).
pub fn validate_non_negative(field: &str, amount: Money) -> ValidationResult<()> {
    if amount.is_negative() {
        return Err(ValidationError::MustNotBeNegative {
            field: field.to_string(),
        });
    }

    if amount.cents() > MAX_AMOUNT_CENTS {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_AMOUNT_CENTS,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_series_code() {
        assert_eq!(validate_series_code("F001").unwrap(), "F001");
        assert_eq!(validate_series_code("nv01").unwrap(), "NV01");
        assert_eq!(validate_series_code("B").unwrap(), "B");

        assert!(validate_series_code("").is_err());
        assert!(validate_series_code("   ").is_err());
        assert!(validate_series_code("GEN10").is_err());
        assert!(validate_series_code("F 01").is_err());
        assert!(validate_series_code("Ñ001").is_err());
    }

    #[test]
    fn test_validate_document_type() {
        assert!(validate_document_type("01").is_ok());
        assert!(validate_document_type("80").is_ok());
        assert!(validate_document_type("").is_err());
        assert!(validate_document_type("01-A").is_err());
        assert!(validate_document_type("12345").is_err());
    }

    #[test]
    fn test_validate_id() {
        assert!(validate_id("tenant_id", "tenant-1").is_ok());
        assert!(validate_id("tenant_id", "").is_err());
        assert!(validate_id("tenant_id", " t1").is_err());
        assert!(validate_id("tenant_id", &"x".repeat(65)).is_err());
    }

    #[test]
    fn test_validate_notes() {
        assert_eq!(validate_notes(None).unwrap(), None);
        assert_eq!(validate_notes(Some("   ")).unwrap(), None);
        assert_eq!(
            validate_notes(Some(" cuadre ok ")).unwrap(),
            Some("cuadre ok".to_string())
        );
        assert!(validate_notes(Some(&"n".repeat(501))).is_err());
    }

    #[test]
    fn test_sanitize_reference() {
        assert_eq!(sanitize_reference("B001-00000042").unwrap(), "B001-00000042");
        assert_eq!(sanitize_reference("#B001-00000042").unwrap(), "B001-00000042");
        assert_eq!(sanitize_reference(" # B001-1 ").unwrap(), "B001-1");
        assert!(sanitize_reference("  ").is_err());
    }

    #[test]
    fn test_ensure_positive() {
        assert!(ensure_positive("amount", Money::from_cents(1)).is_ok());

        let err = ensure_positive("amount", Money::zero()).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));
        assert!(ensure_positive("amount", Money::from_cents(-100)).is_err());

        assert!(ensure_positive("amount", Money::from_cents(MAX_AMOUNT_CENTS)).is_ok());
        let err = ensure_positive("amount", Money::from_cents(MAX_AMOUNT_CENTS + 1)).unwrap_err();
        assert!(matches!(err, CoreError::InvalidAmount { .. }));
    }

    #[test]
    fn test_validate_non_negative() {
        assert!(validate_non_negative("start_amount", Money::zero()).is_ok());
        assert!(validate_non_negative("start_amount", Money::from_cents(-1)).is_err());
        assert!(matches!(
            validate_non_negative("start_amount", Money::from_cents(i64::MAX)),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_validate_description() {
        assert_eq!(validate_description(" Bank drop ").unwrap(), "Bank drop");
        assert!(validate_description("").is_err());
        assert!(validate_description(&"d".repeat(201)).is_err());
    }
}
