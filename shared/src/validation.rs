//! Validation utilities for stock ledger input
//!
//! Used both for request bodies and for rows of an imported stock export.

// ============================================================================
// Field Validations
// ============================================================================

/// Validate a product reference (non-empty, no control characters)
pub fn validate_reference(reference: &str) -> Result<(), &'static str> {
    let trimmed = reference.trim();
    if trimmed.is_empty() {
        return Err("Reference is required");
    }
    if trimmed.chars().any(char::is_control) {
        return Err("Reference cannot contain control characters");
    }
    Ok(())
}

/// Validate a product denomination
pub fn validate_denomination(denomination: &str) -> Result<(), &'static str> {
    if denomination.trim().is_empty() {
        return Err("Denomination is required");
    }
    Ok(())
}

/// Validate a warehouse or team name
pub fn validate_directory_name(name: &str) -> Result<(), &'static str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err("Name is required");
    }
    if trimmed.chars().count() > 100 {
        return Err("Name must be at most 100 characters");
    }
    Ok(())
}

/// Validate an absolute stock quantity
pub fn validate_quantity(quantity: i64) -> Result<(), &'static str> {
    if quantity < 0 {
        return Err("Quantity cannot be negative");
    }
    Ok(())
}

// ============================================================================
// Export Quantity Parsing
// ============================================================================

/// Parse a quantity cell from a stock export.
///
/// Accepts plain integers, thousands separated by spaces (including the
/// non-breaking variants), `.` or `,` (`"1 200"`, `"1.200"`) and a zero
/// fractional part (`"12,00"`). A `,` or `.` followed by at most two digits is
/// a decimal mark; followed by three digits it separates thousands. Anything
/// else yields `None`.
pub fn parse_quantity(raw: &str) -> Option<i64> {
    let compact: String = raw
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}' | '\t'))
        .collect();
    if compact.is_empty() {
        return None;
    }

    let (integer, fraction) = match compact.rfind([',', '.']) {
        Some(pos) if compact.len() - pos - 1 <= 2 => (&compact[..pos], &compact[pos + 1..]),
        _ => (compact.as_str(), ""),
    };

    if !fraction.chars().all(|c| c == '0') {
        return None;
    }

    let mut groups = integer.split([',', '.']);
    let mut digits = groups.next().unwrap_or_default().to_string();
    for group in groups {
        if digits.is_empty() || group.len() != 3 {
            return None;
        }
        digits.push_str(group);
    }

    digits.parse::<i64>().ok()
}
