use std::borrow::Cow;
use serde_json::{Map, Value};
use crate::codec;
use crate::crypto;
use crate::error::DecodeError;

/// Opens one item payload: optional decrypt, then base64, then a JSON object.
pub struct FieldResolver<'a> {
    secret: Option<&'a str>,
}

impl<'a> FieldResolver<'a> {
    pub fn new(secret: Option<&'a str>) -> Self { Self { secret } }

    pub fn resolve(&self, raw: &Value, decrypt_candidate: bool) -> Option<Map<String, Value>> {
        match self.try_resolve(raw, decrypt_candidate) {
            Ok(m) => Some(m),
            Err(e) => { log::debug!("payload left unresolved: {}", e); None }
        }
    }

    pub fn try_resolve(&self, raw: &Value, decrypt_candidate: bool) -> Result<Map<String, Value>, DecodeError> {
        let text = raw.as_str().ok_or(DecodeError::NotString)?;
        let working = self.unseal(text, decrypt_candidate);
        codec::decode_base64(&working).and_then(|bytes| parse_object(&bytes))
    }

    // A failed open keeps the original text: it may be plain base64 JSON.
    fn unseal<'t>(&self, text: &'t str, decrypt_candidate: bool) -> Cow<'t, str> {
        let Some(secret) = self.secret else { return Cow::Borrowed(text) };
        if !decrypt_candidate || !codec::is_plausible_base64(text) { return Cow::Borrowed(text); }
        match crypto::decrypt(text, secret) {
            Ok(plain) => Cow::Owned(codec::normalize_text(&plain)),
            Err(e) => { log::debug!("decrypt skipped, reading value as plain: {}", e); Cow::Borrowed(text) }
        }
    }
}

pub fn parse_object(bytes: &[u8]) -> Result<Map<String, Value>, DecodeError> {
    let text = codec::repair_text(bytes);
    match serde_json::from_str::<Value>(&text).map_err(|e| DecodeError::Json(e.to_string()))? {
        Value::Object(map) => Ok(map.into_iter().map(|(k, v)| (codec::normalize_str(&k), codec::normalize_deep(v))).collect()),
        _ => Err(DecodeError::NotObject),
    }
}
