use serde_json::{Map, Value};

pub type Row = Map<String, Value>;

#[derive(Clone, Debug, PartialEq)]
pub struct FlatTable {
    pub columns: Vec<String>,
    pub rows: Vec<Row>,
}

#[derive(Clone, Debug, PartialEq)]
pub enum Shape { Table(FlatTable), Tree }

pub fn is_scalar(v: &Value) -> bool { !matches!(v, Value::Array(_) | Value::Object(_)) }

pub fn is_flat(row: &Row) -> bool { row.values().all(is_scalar) }

/// Stops at the first unresolved or nested row; a section is tabled whole or not at all.
pub fn classify<I>(rows: I) -> Shape
where
    I: IntoIterator<Item = Option<Row>>,
{
    let mut out: Vec<Row> = vec![];
    for row in rows {
        match row {
            Some(r) if is_flat(&r) => out.push(r),
            _ => return Shape::Tree,
        }
    }
    if out.is_empty() { return Shape::Tree; }
    Shape::Table(FlatTable { columns: column_union(&out), rows: out })
}

/// First row's key order, then unseen keys in the order later rows introduce them.
pub fn column_union(rows: &[Row]) -> Vec<String> {
    let mut cols: Vec<String> = vec![];
    for r in rows {
        for k in r.keys() { if !cols.contains(k) { cols.push(k.clone()); } }
    }
    cols
}
