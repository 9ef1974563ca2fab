use serde_json::Value;

/// One line of the structured table view. Container entries carry an empty
/// `value` and are followed by their children.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Row {
    pub key: String,
    pub value: String,
    pub level: usize,
}

/// Record grid: columns named after the first record's keys, one row per
/// record.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Grid {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

pub fn grid(records: &[Value]) -> Grid {
    let headers: Vec<String> = match records.first() {
        Some(Value::Object(first)) => first.keys().cloned().collect(),
        _ => Vec::new(),
    };
    let width = headers.len().max(1);
    let rows = records
        .iter()
        .map(|record| match record {
            Value::Object(map) => headers
                .iter()
                .map(|h| map.get(h).map(cell_text).unwrap_or_default())
                .collect(),
            other => {
                let mut cells = vec![String::new(); width];
                cells[0] = cell_text(other);
                cells
            }
        })
        .collect();
    Grid { headers, rows }
}

pub fn flatten(value: &Value) -> Vec<Row> {
    let mut rows = Vec::new();
    flatten_into(value, "", &mut rows);
    rows
}

fn flatten_into(value: &Value, prefix: &str, rows: &mut Vec<Row>) {
    let level = if prefix.is_empty() {
        0
    } else {
        prefix.split('.').count()
    };

    match value {
        Value::Array(items) => {
            for (idx, item) in items.iter().enumerate() {
                let key = format!("{prefix}[{idx}]");
                if is_container(item) {
                    flatten_into(item, &key, rows);
                } else {
                    rows.push(Row {
                        key,
                        value: scalar_text(item),
                        level,
                    });
                }
            }
        }
        Value::Object(map) => {
            for (name, item) in map {
                let key = if prefix.is_empty() {
                    name.clone()
                } else {
                    format!("{prefix}.{name}")
                };
                if is_container(item) {
                    rows.push(Row {
                        key: key.clone(),
                        value: String::new(),
                        level,
                    });
                    flatten_into(item, &key, rows);
                } else {
                    rows.push(Row {
                        key,
                        value: scalar_text(item),
                        level,
                    });
                }
            }
        }
        scalar => rows.push(Row {
            key: prefix.to_string(),
            value: scalar_text(scalar),
            level,
        }),
    }
}

fn is_container(value: &Value) -> bool {
    matches!(value, Value::Array(_) | Value::Object(_))
}

fn scalar_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        other => other.to_string(),
    }
}

/// Containers become compact JSON, strings stay raw.
fn cell_text(value: &Value) -> String {
    if is_container(value) {
        value.to_string()
    } else {
        scalar_text(value)
    }
}
