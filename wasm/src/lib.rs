//! WebAssembly module for the certificate settings form
//!
//! Provides client-side previews of:
//! - Grade formatting
//! - Date formatting
//! - Notification recipient validation

use rust_decimal::Decimal;
use wasm_bindgen::prelude::*;

// Re-export shared types for use in JavaScript
pub use shared::formatting::*;
pub use shared::models::*;
pub use shared::validation::*;

/// Initialize the WASM module
#[wasm_bindgen(start)]
pub fn init() {}

/// Preview a grade in the given display mode (1 percentage, 2 points, 3 letter)
#[wasm_bindgen]
pub fn preview_grade(grade: f64, min: f64, max: f64, grade_format: i16) -> Result<String, JsValue> {
    let format = GradeFormat::from_raw(grade_format)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown grade format: {}", grade_format)))?;
    let to_decimal = |v: f64| {
        Decimal::try_from(v).map_err(|e| JsValue::from_str(&format!("Invalid number: {}", e)))
    };
    let value = GradeValue::new(Some(to_decimal(grade)?), to_decimal(min)?, to_decimal(max)?);
    Ok(format_grade(&value, format))
}

/// Preview a date (unix seconds) in one of the five certificate date shapes
#[wasm_bindgen]
pub fn preview_date(timestamp: i64, date_format: i16) -> Result<String, JsValue> {
    let format = DateFormat::from_raw(date_format)
        .ok_or_else(|| JsValue::from_str(&format!("Unknown date format: {}", date_format)))?;
    Ok(format_date(timestamp, format, DEFAULT_LOCALE_PATTERN))
}

/// Return the invalid entries of a comma-separated recipient list as JSON
#[wasm_bindgen]
pub fn invalid_recipients(list: &str) -> String {
    serde_json::to_string(&invalid_emails(list)).unwrap_or_else(|_| "[]".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview_grade() {
        assert_eq!(preview_grade(85.0, 0.0, 100.0, 1).unwrap(), "85.00");
        assert_eq!(preview_grade(42.5, 0.0, 50.0, 2).unwrap(), "42.50");
        assert_eq!(preview_grade(95.0, 0.0, 100.0, 3).unwrap(), "A");
    }

    #[test]
    fn test_preview_date() {
        assert_eq!(preview_date(1_709_596_800, 2).unwrap(), "March 5th, 2024");
    }

    #[test]
    fn test_invalid_recipients() {
        assert_eq!(invalid_recipients("a@example.com, nope"), "[\"nope\"]");
    }
}
