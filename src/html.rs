use std::borrow::Cow;
use serde_json::Value;
use crate::shape::{FlatTable, is_scalar};

pub const META_CHARSET: &str = "<meta charset=\"utf-8\">\n";

const TABLE_STYLE: &str = "<style>.mono{font-family:ui-monospace,Menlo,Consolas,\"Liberation Mono\",monospace} .dt-table{width:100%;border-collapse:collapse} .dt-table th,.dt-table td{border:1px solid #ddd;padding:6px 8px;vertical-align:top} .dt-table th{background:#f5f5f7} .dt-scroll{overflow:auto;max-width:100%} .section{margin:.8rem 0 1.2rem}</style>";
const TREE_STYLE: &str = "<style>.mono{font-family:ui-monospace,Menlo,Consolas,\"Liberation Mono\",monospace} .dt-table{width:100%;border-collapse:collapse} .dt-table th,.dt-table td{border:1px solid #ddd;padding:6px 8px;vertical-align:top} .dt-table th{background:#f5f5f7}</style>";
const BADGE_STYLE: &str = "font-size:.75rem;background:#eef;color:#335;border-radius:.4rem;padding:.1rem .4rem;margin-left:.5rem";

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;").replace('\'', "&#039;")
}

/// Cell text for a value. Containers only reach this through labels and fall back to compact JSON.
pub fn display_text(v: &Value) -> String {
    match v {
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => number_text(n),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

// Integral floats print without the fraction: `1.0` reads as `1`.
fn number_text(n: &serde_json::Number) -> String {
    if n.is_f64() && let Some(f) = n.as_f64() && f.fract() == 0.0 && f.abs() < 1e15 {
        return format!("{:.0}", f);
    }
    n.to_string()
}

pub fn heading(label: &str) -> String { format!("<h3>{}</h3>", html_escape(label)) }

pub fn render_table(table: &FlatTable, title: &str) -> String {
    let mut s = String::new();
    s.push_str(TABLE_STYLE);
    s.push_str("<div class='section'>");
    if !title.is_empty() { s.push_str(&format!("<h3>{} <span style='{}'>table</span></h3>", html_escape(title), BADGE_STYLE)); }
    s.push_str("<div class='dt-scroll'><table class='dt-table'><thead><tr>");
    for c in &table.columns { s.push_str(&format!("<th>{}</th>", html_escape(c))); }
    s.push_str("</tr></thead><tbody>");
    for r in &table.rows {
        s.push_str("<tr>");
        for c in &table.columns {
            let cell = r.get(c).map(display_text).unwrap_or_default();
            s.push_str(&format!("<td class='mono'>{}</td>", html_escape(&cell)));
        }
        s.push_str("</tr>");
    }
    s.push_str("</tbody></table></div></div>");
    s
}

pub fn render_tree(node: &Value) -> String {
    format!("{}<div class='section'><table class='dt-table'><thead><tr><th style='width:40%'>Key</th><th>Value</th></tr></thead><tbody>{}</tbody></table></div>", TREE_STYLE, tree_rows(node, 0))
}

/// Keys of a mapping, or indices of a sequence; `None` for scalars.
pub fn entries(node: &Value) -> Option<Vec<(Cow<'_, str>, &Value)>> {
    match node {
        Value::Object(map) => Some(map.iter().map(|(k, v)| (Cow::Borrowed(k.as_str()), v)).collect()),
        Value::Array(items) => Some(items.iter().enumerate().map(|(i, v)| (Cow::Owned(i.to_string()), v)).collect()),
        _ => None,
    }
}

fn tree_rows(node: &Value, level: usize) -> String {
    let Some(items) = entries(node) else {
        return format!("<tr><td class='mono'>(value)</td><td class='mono'>{}</td></tr>", html_escape(&display_text(node)));
    };
    let pad = "&nbsp;".repeat(level * 4);
    items.into_iter().map(|(k, v)| {
        if is_scalar(v) {
            format!("<tr><td class='mono'>{}{}</td><td class='mono'>{}</td></tr>", pad, html_escape(&k), html_escape(&display_text(v)))
        } else {
            format!("<tr><td class='mono'>{}{}</td><td class='mono'>[…]</td></tr>{}", pad, html_escape(&k), tree_rows(v, level + 1))
        }
    }).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn escapes_all_five() {
        assert_eq!(html_escape("<a href=\"x\">'&'</a>"), "&lt;a href=&quot;x&quot;&gt;&#039;&amp;&#039;&lt;/a&gt;");
    }

    #[test]
    fn display_spells_out_scalars() {
        assert_eq!(display_text(&json!(null)), "null");
        assert_eq!(display_text(&json!(true)), "true");
        assert_eq!(display_text(&json!(false)), "false");
        assert_eq!(display_text(&json!(2)), "2");
        assert_eq!(display_text(&json!(39.9)), "39.9");
        assert_eq!(display_text(&json!("aberto")), "aberto");
    }

    #[test]
    fn integral_floats_drop_the_fraction() {
        assert_eq!(display_text(&json!(1.0)), "1");
        assert_eq!(display_text(&json!(-250.0)), "-250");
        assert_eq!(display_text(&json!(0.5)), "0.5");
        assert_eq!(display_text(&json!(1e20)), "1e20");
    }

    #[test]
    fn tree_indents_nested_levels() {
        let html = render_tree(&json!({"a": {"b": [true]}, "c": null}));
        assert!(html.contains("<tr><td class='mono'>a</td><td class='mono'>[…]</td></tr>"));
        assert!(html.contains("<tr><td class='mono'>&nbsp;&nbsp;&nbsp;&nbsp;b</td><td class='mono'>[…]</td></tr>"));
        assert!(html.contains(&format!("<tr><td class='mono'>{}0</td><td class='mono'>true</td></tr>", "&nbsp;".repeat(8))));
        assert!(html.contains("<tr><td class='mono'>c</td><td class='mono'>null</td></tr>"));
        assert!(html.find(">a<").unwrap() < html.find(">c<").unwrap());
    }

    #[test]
    fn scalar_root_renders_value_row() {
        let html = render_tree(&json!("<b>"));
        assert!(html.contains("<tr><td class='mono'>(value)</td><td class='mono'>&lt;b&gt;</td></tr>"));
    }

    #[test]
    fn table_fills_missing_cells_and_badges_title() {
        let t = FlatTable {
            columns: vec!["a".into(), "b".into()],
            rows: vec![json!({"a": 1}).as_object().cloned().unwrap(), json!({"a": 2, "b": "x"}).as_object().cloned().unwrap()],
        };
        let html = render_table(&t, "Itens");
        assert!(html.contains("<h3>Itens <span"));
        assert!(html.contains(">table</span></h3>"));
        assert!(html.contains("<thead><tr><th>a</th><th>b</th></tr></thead>"));
        assert!(html.contains("<tr><td class='mono'>1</td><td class='mono'></td></tr>"));
        assert!(!render_table(&t, "").contains("<h3>"));
    }

    proptest! {
        #[test]
        fn escaped_text_has_no_raw_markup(s in "\\PC{0,24}") {
            let e = html_escape(&s);
            prop_assert!(!e.contains('<') && !e.contains('>') && !e.contains('"') && !e.contains('\''));
            prop_assert_eq!(e.matches('&').count(), e.matches("&amp;").count() + e.matches("&lt;").count() + e.matches("&gt;").count() + e.matches("&quot;").count() + e.matches("&#039;").count());
        }
    }
}
