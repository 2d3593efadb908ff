//! # Document Numbering
//!
//! Pure formatting rules for fiscal document numbers and the table of
//! series provisioned automatically the first time a store issues a
//! document type.
//!
//! ## Number Anatomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │        B001  -  00000042                                                │
//! │        ────     ────────                                                │
//! │         │          │                                                    │
//! │         │          └── counter, zero-padded to 8 digits                 │
//! │         └───────────── series code (≤ 4 chars, unique per tenant)       │
//! │                                                                         │
//! │  Counter 0 means "nothing issued"; the first document is 00000001.      │
//! │  The last one a series can issue is 99999999.                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::types::{DocumentSeries, NextDocumentNumber};
use crate::{DOCUMENT_NUMBER_WIDTH, MAX_DOCUMENT_NUMBER, MAX_SERIES_CODE_LEN};

// =============================================================================
// Formatting
// =============================================================================

/// Zero-pads a counter value to the document number width.
///
/// ## Example
/// ```rust
/// use tally_core::sequence::format_number;
///
/// assert_eq!(format_number(42), "00000042");
/// assert_eq!(format_number(99_999_999), "99999999");
/// ```
pub fn format_number(number: i64) -> String {
    format!("{:0width$}", number, width = DOCUMENT_NUMBER_WIDTH)
}

/// Joins a series code and a counter into the printed document number.
pub fn full_number(series_code: &str, number: i64) -> String {
    format!("{}-{}", series_code, format_number(number))
}

/// Builds the number a series would issue at `number`.
pub fn document_number(series_code: &str, number: i64) -> NextDocumentNumber {
    NextDocumentNumber {
        series_code: series_code.to_string(),
        formatted_number: format_number(number),
        full_number: full_number(series_code, number),
    }
}

/// Preview of the next number of a series. Does not check capacity.
pub fn preview(series: &DocumentSeries) -> NextDocumentNumber {
    document_number(&series.series_code, series.current_number + 1)
}

/// Whether a series can still issue one more number.
#[inline]
pub fn has_capacity(current_number: i64) -> bool {
    current_number < MAX_DOCUMENT_NUMBER
}

// =============================================================================
// Auto-Provisioned Series
// =============================================================================

/// A series template created on first use of a document type in a store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefaultSeries {
    pub series_code: &'static str,
    pub document_type_name: &'static str,
}

/// Fixed mapping from document type to its default series.
///
/// ```text
/// "01" → F001  Factura Electrónica
/// "03" → B001  Boleta de Venta
/// "80" → NV01  Nota de Venta
/// "07" → NC01  Nota de Crédito
/// "08" → ND01  Nota de Débito
/// "09" → T001  Guía de Remisión
///  *   → GEN1  Documento General
/// ```
pub fn default_series_for(document_type: &str) -> DefaultSeries {
    let (series_code, document_type_name) = match document_type {
        "01" => ("F001", "Factura Electrónica"),
        "03" => ("B001", "Boleta de Venta"),
        "80" => ("NV01", "Nota de Venta"),
        "07" => ("NC01", "Nota de Crédito"),
        "08" => ("ND01", "Nota de Débito"),
        "09" => ("T001", "Guía de Remisión"),
        _ => ("GEN1", "Documento General"),
    };

    DefaultSeries {
        series_code,
        document_type_name,
    }
}

/// Next candidate code when a provisioned code is already taken by another
/// store of the same tenant.
///
/// Increments the trailing digits, keeping the code within four characters
/// by dropping letters from the prefix when the number grows. Returns `None`
/// once no candidate fits.
///
/// ## Example
/// ```rust
/// use tally_core::sequence::next_series_code;
///
/// assert_eq!(next_series_code("F001").as_deref(), Some("F002"));
/// assert_eq!(next_series_code("NV09").as_deref(), Some("NV10"));
/// assert_eq!(next_series_code("GEN9").as_deref(), Some("GE10"));
/// assert_eq!(next_series_code("9999"), None);
/// ```
pub fn next_series_code(code: &str) -> Option<String> {
    let split = code
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_digit())
        .last()
        .map_or(code.len(), |(i, _)| i);
    let (prefix, digits) = code.split_at(split);

    let next = if digits.is_empty() {
        1
    } else {
        digits.parse::<u32>().ok()? + 1
    };
    let width = digits.len().max(1);
    let suffix = format!("{:0width$}", next, width = width);

    if suffix.len() > MAX_SERIES_CODE_LEN {
        return None;
    }

    let keep = prefix.len().min(MAX_SERIES_CODE_LEN - suffix.len());
    Some(format!("{}{}", &prefix[..keep], suffix))
}

// =============================================================================
// Unit Tests
// =============================================================================
