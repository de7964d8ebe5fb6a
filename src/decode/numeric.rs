//! Numeric coercion for metric values.

use serde_json::Value;

/// Coerce a metric value to a finite `f64`.
///
/// Numbers are taken as-is. Strings are trimmed and stripped of `,`
/// grouping separators before parsing, so `"1,234.5e-3"` becomes `1.2345`.
/// Anything else, or a non-finite result, yields `None`.
pub fn coerce_numeric(value: &Value) -> Option<f64> {
    let num = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.replace(',', "").parse::<f64>().ok()?
        }
        _ => return None,
    };

    num.is_finite().then_some(num)
}
