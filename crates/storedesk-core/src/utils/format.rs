use std::collections::BTreeSet;

use serde_json::Value;

use crate::models::Record;

/// Columns shown first when present, in this order
const LEADING_COLUMNS: &[&str] = &["id", "_id", "name", "title", "code", "phone", "status"];

/// Truncate a string to a maximum number of characters, adding ellipsis if needed
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else if max_len <= 3 {
        s.chars().take(max_len).collect()
    } else {
        let truncated: String = s.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

/// Format a date string to a more readable format
pub fn format_date(date: &str) -> String {
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(date) {
        dt.format("%b %d, %Y %H:%M").to_string()
    } else if date.len() >= 10 && date.is_char_boundary(10) {
        date[..10].to_string()
    } else {
        date.to_string()
    }
}

/// Render one JSON value as a single table cell
pub fn format_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) if looks_like_timestamp(s) => format_date(s),
        Value::String(s) => s.clone(),
        Value::Array(items) => format!("[{} items]", items.len()),
        Value::Object(map) => match map.get("name").or_else(|| map.get("$oid")) {
            Some(Value::String(s)) => s.clone(),
            _ => "{...}".to_string(),
        },
        other => other.to_string(),
    }
}

fn looks_like_timestamp(s: &str) -> bool {
    s.len() >= 20 && s.as_bytes().get(10) == Some(&b'T') && chrono::DateTime::parse_from_rfc3339(s).is_ok()
}

/// Column order for a set of rows: well-known identifying fields first, then
/// the remaining scalar fields alphabetically.
pub fn table_columns(rows: &[Record]) -> Vec<String> {
    let present: BTreeSet<&String> = rows.iter().flat_map(Record::keys).collect();

    let mut columns: Vec<String> = LEADING_COLUMNS
        .iter()
        .filter(|c| present.iter().any(|p| p.as_str() == **c))
        .map(|c| c.to_string())
        .collect();
    columns.extend(
        present
            .into_iter()
            .filter(|key| !LEADING_COLUMNS.contains(&key.as_str()))
            .filter(|key| {
                rows.iter()
                    .filter_map(|r| r.get(key))
                    .all(|v| !v.is_array() && !v.is_object())
            })
            .cloned(),
    );
    columns
}

/// Plain-text table with at most `max_columns` columns, each cell cut to
/// `max_width` characters.
pub fn render_table(rows: &[Record], max_columns: usize, max_width: usize) -> String {
    let columns: Vec<String> = table_columns(rows).into_iter().take(max_columns).collect();
    if columns.is_empty() {
        return String::new();
    }

    let cells: Vec<Vec<String>> = rows
        .iter()
        .map(|row| {
            columns
                .iter()
                .map(|c| truncate_string(&row.get(c).map(format_cell).unwrap_or_default(), max_width))
                .collect()
        })
        .collect();

    let widths: Vec<usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| {
            cells
                .iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(c.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();

    let mut out = String::new();
    push_line(&mut out, columns.iter().map(String::as_str), &widths);
    push_line(&mut out, rule.iter().map(String::as_str), &widths);
    for row in &cells {
        push_line(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line: Vec<String> = cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect();
    out.push_str(line.join("  ").trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows() -> Vec<Record> {
        vec![
            Record::from_value(json!({"price": 120, "name": "Serum", "_id": "a1", "images": ["x.png"]})).unwrap(),
            Record::from_value(json!({"name": "Toner", "_id": "a2", "brand": {"name": "Acme"}})).unwrap(),
        ]
    }

    #[test]
    fn test_truncate_string() {
        assert_eq!(truncate_string("Hello", 10), "Hello");
        assert_eq!(truncate_string("Hello World", 8), "Hello...");
        assert_eq!(truncate_string("Hi", 2), "Hi");
        assert_eq!(truncate_string("Sữa rửa mặt", 7), "Sữa ...");
    }

    #[test]
    fn test_format_cell() {
        assert_eq!(format_cell(&Value::Null), "");
        assert_eq!(format_cell(&json!(12.5)), "12.5");
        assert_eq!(format_cell(&json!(true)), "true");
        assert_eq!(format_cell(&json!([1, 2])), "[2 items]");
        assert_eq!(format_cell(&json!({"name": "Acme"})), "Acme");
        assert_eq!(format_cell(&json!("2024-03-05T08:30:00.000Z")), "Mar 05, 2024 08:30");
    }

    #[test]
    fn test_table_columns_skip_nested_values() {
        assert_eq!(table_columns(&rows()), vec!["_id", "name", "price"]);
    }

    #[test]
    fn test_render_table() {
        let table = render_table(&rows(), 10, 20);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].starts_with("_id"));
        assert!(lines[2].contains("Serum") && lines[2].contains("120"));
        assert_eq!(lines[3].trim_end(), "a2   Toner");
    }
}
