use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use crate::codec;
use crate::html::{self, display_text, entries, heading, render_tree};
use crate::resolver::FieldResolver;
use crate::shape::{self, Shape};

pub const DEFAULT_PAYLOAD_KEY: &str = "rawobj";

/// Fixed for the lifetime of a [`Renderer`].
#[derive(Debug)]
pub struct RenderOptions {
    /// Passphrase for item envelopes; `None` skips decryption entirely
    pub secret: Option<SecretString>,
    /// Field names eligible for decryption
    pub decrypt_keys: Vec<String>,
    /// Item field holding the base64 JSON payload
    pub payload_key: String,
    /// Prepend `<meta charset="utf-8">`
    pub emit_charset_meta: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            secret: None,
            decrypt_keys: vec![DEFAULT_PAYLOAD_KEY.to_string()],
            payload_key: DEFAULT_PAYLOAD_KEY.to_string(),
            emit_charset_meta: false,
        }
    }
}

impl RenderOptions {
    pub fn with_secret(mut self, secret: impl Into<String>) -> Self {
        self.secret = Some(SecretString::new(secret.into()));
        self
    }
}

pub struct Renderer {
    opts: RenderOptions,
}

impl Renderer {
    pub fn new(opts: RenderOptions) -> Self { Self { opts } }

    pub fn options(&self) -> &RenderOptions { &self.opts }

    /// Renders a document into an HTML fragment. Never fails: anything that cannot be
    /// tabled is dumped as a key/value tree.
    pub fn render(&self, document: &Value) -> String {
        let doc = codec::normalize_deep(document.clone());
        let mut parts: Vec<String> = vec![];
        if self.opts.emit_charset_meta { parts.push(html::META_CHARSET.to_string()); }
        match &doc {
            Value::Object(map) => {
                if let Some(record) = map.get("record") && !record.is_null() {
                    parts.push(heading("Record"));
                    parts.push(render_tree(record));
                }
                let mut others = Map::new();
                for (k, v) in map {
                    match (k.as_str(), v) {
                        ("record", _) => {}
                        ("dataPage", _) => parts.extend(self.render_data_page(v)),
                        _ => { others.insert(k.clone(), v.clone()); }
                    }
                }
                if !others.is_empty() {
                    parts.push(heading("Other"));
                    parts.push(render_tree(&Value::Object(others)));
                }
            }
            Value::Null => {}
            Value::Array(items) if items.is_empty() => {}
            other => {
                parts.push(heading("Other"));
                parts.push(render_tree(other));
            }
        }
        parts.concat()
    }

    /// Renders raw document bytes. Byte spans that are not UTF-8 are repaired one by one, so
    /// valid fields stay intact. Input that is not JSON is shown as a single text value.
    pub fn render_slice(&self, raw: &[u8]) -> String {
        let text = codec::repair_text(raw);
        match serde_json::from_str::<Value>(&text) {
            Ok(doc) => self.render(&doc),
            Err(e) => {
                log::debug!("document is not JSON ({}), rendering as text", e);
                self.render(&Value::String(text))
            }
        }
    }

    fn render_data_page(&self, page: &Value) -> Vec<String> {
        entries(page).unwrap_or_default().into_iter().map(|(key, section)| self.render_section(&key, section)).collect()
    }

    pub fn render_section(&self, key: &str, section: &Value) -> String {
        let label = section_label(key, section);
        match self.classify_section(section) {
            Shape::Table(t) => {
                log::trace!("section {} rendered as table ({} rows, {} columns)", key, t.rows.len(), t.columns.len());
                html::render_table(&t, &label)
            }
            Shape::Tree => {
                log::trace!("section {} rendered as tree", key);
                format!("{}{}", heading(&label), render_tree(section))
            }
        }
    }

    pub fn classify_section(&self, section: &Value) -> Shape {
        let items: Vec<&Value> = match section.get("data") {
            Some(Value::Array(a)) => a.iter().collect(),
            Some(Value::Object(m)) => m.values().collect(),
            _ => return Shape::Tree,
        };
        let resolver = FieldResolver::new(self.opts.secret.as_ref().map(|s| s.expose_secret().as_str()));
        let decrypt = self.opts.decrypt_keys.iter().any(|k| *k == self.opts.payload_key);
        shape::classify(items.into_iter().map(|item| item.get(&self.opts.payload_key).and_then(|raw| resolver.resolve(raw, decrypt))))
    }
}

/// `composition.var`, then `class`, then the section's own key.
pub fn section_label(key: &str, section: &Value) -> String {
    section.pointer("/composition/var").filter(|v| !v.is_null())
        .or_else(|| section.get("class").filter(|v| !v.is_null()))
        .map(display_text)
        .unwrap_or_else(|| key.to_string())
}

/// One-shot rendering with positional configuration.
pub fn render_multilevel_table(document: &Value, decrypt_keys: &[&str], secret: Option<&str>, emit_charset_meta: bool) -> String {
    let mut opts = RenderOptions {
        decrypt_keys: decrypt_keys.iter().map(|k| k.to_string()).collect(),
        emit_charset_meta,
        ..Default::default()
    };
    if let Some(s) = secret { opts = opts.with_secret(s); }
    Renderer::new(opts).render(document)
}
