use serde_json::Value;
use tabled::{builder::Builder, Table};

use super::scalar;

/// Format output as tables using the tabled crate.
///
/// Loan-health outputs are flat objects carrying zero or more arrays of rows
/// (installments, options, snapshots, by_status). The scalar fields print as
/// one field/value table; each row array prints as its own table underneath,
/// headed by the field name.
pub fn print_table(value: &Value) {
    match value {
        Value::Object(map) => {
            let scalars: Vec<(&String, &Value)> = map
                .iter()
                .filter(|(_, v)| !is_row_array(v))
                .collect();
            if !scalars.is_empty() {
                let mut builder = Builder::default();
                builder.push_record(["Field", "Value"]);
                for (key, val) in &scalars {
                    builder.push_record([key.as_str(), &scalar(val)]);
                }
                println!("{}", Table::from(builder));
            }
            for (key, val) in map {
                if let Value::Array(rows) = val {
                    if is_row_array(val) {
                        println!("\n{}:", key);
                        print_rows(rows);
                    }
                }
            }
        }
        Value::Array(rows) if is_row_array(value) => print_rows(rows),
        other => println!("{}", scalar(other)),
    }
}

fn is_row_array(value: &Value) -> bool {
    matches!(value, Value::Array(rows) if matches!(rows.first(), Some(Value::Object(_))))
}

fn print_rows(rows: &[Value]) {
    let Some(Value::Object(first)) = rows.first() else {
        return;
    };
    let headers: Vec<String> = first.keys().cloned().collect();
    let mut builder = Builder::default();
    builder.push_record(&headers);
    for row in rows {
        if let Value::Object(map) = row {
            let record: Vec<String> = headers
                .iter()
                .map(|h| map.get(h).map(scalar).unwrap_or_default())
                .collect();
            builder.push_record(record);
        }
    }
    println!("{}", Table::from(builder));
}
