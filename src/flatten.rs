//! Nested JSON to a single-level `path -> leaf` map and back.
//!
//! Paths join object keys with `.` and sequence positions with `[i]`:
//! `{"a": [{"b": 1}, 2]}` flattens to `{"a[0].b": 1, "a[1]": 2}`.

use anyhow::{Result, anyhow};
use serde_json::{Map, Value};
use tracing::warn;

/// Path -> leaf, in input traversal order.
pub type FlatRecord = Map<String, Value>;

pub fn flatten(value: &Value) -> FlatRecord {
    flatten_with_prefix(value, "")
}

pub fn flatten_with_prefix(value: &Value, prefix: &str) -> FlatRecord {
    let mut out = Map::new();
    walk(value, prefix, &mut out);
    out
}

fn walk(value: &Value, path: &str, out: &mut FlatRecord) {
    match value {
        Value::Object(map) => {
            for (key, child) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                walk(child, &child_path, out);
            }
        }
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                walk(item, &format!("{path}[{i}]"), out);
            }
        }
        leaf => {
            // keys containing `.` or `[` can spell the same path as a nested leaf
            if out.insert(path.to_string(), leaf.clone()).is_some() {
                warn!("flatten: path {path:?} occurs twice; keeping the later leaf");
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Key(String),
    Index(usize),
}

/// Splits `a[0].b` into `[Key(a), Index(0), Key(b)]`.
pub fn parse_path(path: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut key = String::new();
    let mut chars = path.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '.' => {
                if !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                } else if !matches!(segments.last(), Some(Segment::Index(_))) {
                    return Err(anyhow!("empty key in path: {path}"));
                }
            }
            '[' => {
                if !key.is_empty() {
                    segments.push(Segment::Key(std::mem::take(&mut key)));
                }
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some(']') => break,
                        Some(d) if d.is_ascii_digit() => digits.push(d),
                        _ => return Err(anyhow!("bad index in path: {path}")),
                    }
                }
                let idx = digits
                    .parse()
                    .map_err(|_| anyhow!("bad index in path: {path}"))?;
                segments.push(Segment::Index(idx));
            }
            other => key.push(other),
        }
    }
    if !key.is_empty() {
        segments.push(Segment::Key(key));
    }
    Ok(segments)
}

/// Rebuilds the nested value from a flattened record. Sequence positions
/// must appear in order, as `flatten` emits them.
pub fn unflatten(record: &FlatRecord) -> Result<Value> {
    let mut root = Value::Null;
    for (path, leaf) in record {
        let segments = parse_path(path)?;
        insert(&mut root, &segments, leaf.clone())
            .map_err(|e| anyhow!("{path}: {e}"))?;
    }
    Ok(root)
}

fn insert(slot: &mut Value, segments: &[Segment], leaf: Value) -> Result<()> {
    let Some((head, rest)) = segments.split_first() else {
        *slot = leaf;
        return Ok(());
    };
    match head {
        Segment::Key(key) => {
            if slot.is_null() {
                *slot = Value::Object(Map::new());
            }
            let Value::Object(map) = slot else {
                return Err(anyhow!("key {key} under a non-object"));
            };
            let child = map.entry(key.clone()).or_insert(Value::Null);
            insert(child, rest, leaf)
        }
        Segment::Index(idx) => {
            if slot.is_null() {
                *slot = Value::Array(Vec::new());
            }
            let Value::Array(items) = slot else {
                return Err(anyhow!("index {idx} under a non-array"));
            };
            if *idx > items.len() {
                return Err(anyhow!("index {idx} skips past the {} existing items", items.len()));
            }
            if *idx == items.len() {
                items.push(Value::Null);
            }
            insert(&mut items[*idx], rest, leaf)
        }
    }
}
