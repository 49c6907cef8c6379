use serde_json::Value;

use super::scalar;

/// Print just the key answer value from the output.
///
/// Heuristic: look for the well-known result fields in priority order, then
/// fall back to the first field.
pub fn print_minimal(value: &Value) {
    let priority_keys = [
        "health_status",
        "monthly_payment",
        "fee",
        "eligible",
        "days_behind",
        "remaining_balance",
        "total",
    ];

    if let Value::Object(map) = value {
        for key in &priority_keys {
            if let Some(val) = map.get(*key) {
                if !val.is_null() {
                    println!("{}", scalar(val));
                    return;
                }
            }
        }
        if let Some((key, val)) = map.iter().next() {
            println!("{}: {}", key, scalar(val));
            return;
        }
    }

    println!("{}", scalar(value));
}
