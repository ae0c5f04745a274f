use std::borrow::Cow;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::Value;
use unicode_normalization::UnicodeNormalization;
use crate::error::DecodeError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Charset { Utf8, Latin1, Windows1252, Ascii }

/// Detection order. The first candidate that accepts the bytes wins, so ISO-8859-1
/// catches everything that is not UTF-8.
pub const CHARSET_CANDIDATES: [Charset; 4] = [Charset::Utf8, Charset::Latin1, Charset::Windows1252, Charset::Ascii];

impl Charset {
    fn accepts(self, bytes: &[u8]) -> bool {
        match self {
            Charset::Utf8 => std::str::from_utf8(bytes).is_ok(),
            Charset::Latin1 => true,
            Charset::Windows1252 => encoding_rs::WINDOWS_1252.decode_without_bom_handling_and_without_replacement(bytes).is_some(),
            Charset::Ascii => bytes.is_ascii(),
        }
    }
}

pub fn detect_charset(bytes: &[u8]) -> Option<Charset> {
    CHARSET_CANDIDATES.iter().copied().find(|c| c.accepts(bytes))
}

fn strip_whitespace(s: &str) -> Cow<'_, str> {
    if s.chars().any(char::is_whitespace) { Cow::Owned(s.chars().filter(|c| !c.is_whitespace()).collect()) } else { Cow::Borrowed(s) }
}

pub fn is_plausible_base64(s: &str) -> bool { decode_base64(s).is_ok() }

/// Strict decode: whitespace is ignored, anything else that is not canonical base64 fails.
pub fn decode_base64(s: &str) -> Result<Vec<u8>, DecodeError> {
    let compact = strip_whitespace(s);
    if compact.is_empty() || compact.len() % 4 != 0 { return Err(DecodeError::NotBase64); }
    STANDARD.decode(compact.as_bytes()).map_err(|_| DecodeError::NotBase64)
}

pub fn encode_base64(bytes: &[u8]) -> String { STANDARD.encode(bytes) }

pub fn normalize_str(s: &str) -> String { s.nfc().collect() }

/// Turns arbitrary bytes into NFC UTF-8 text. Never fails: bytes that are not UTF-8 are
/// read as ISO-8859-1, and a lossy decode covers whatever is left.
pub fn normalize_text(bytes: &[u8]) -> String {
    if let Ok(s) = std::str::from_utf8(bytes) { return normalize_str(s); }
    match detect_charset(bytes) {
        Some(Charset::Latin1 | Charset::Windows1252) => encoding_rs::mem::decode_latin1(bytes).into_owned(),
        _ => String::from_utf8_lossy(bytes).into_owned(),
    }
}

/// Like [`normalize_text`] for mixed input: valid UTF-8 runs are kept and only the byte
/// spans that fail to decode are read as ISO-8859-1.
pub fn repair_text(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len());
    let mut rest = bytes;
    loop {
        match std::str::from_utf8(rest) {
            Ok(s) => { out.push_str(s); break; }
            Err(e) => {
                let (valid, after) = rest.split_at(e.valid_up_to());
                out.push_str(std::str::from_utf8(valid).unwrap_or_default());
                let bad = e.error_len().unwrap_or(after.len());
                out.push_str(&encoding_rs::mem::decode_latin1(&after[..bad]));
                rest = &after[bad..];
            }
        }
    }
    normalize_str(&out)
}

/// Normalizes every string and mapping key, keeping structure and key order.
pub fn normalize_deep(value: Value) -> Value {
    match value {
        Value::String(s) => Value::String(normalize_str(&s)),
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_deep).collect()),
        Value::Object(map) => Value::Object(map.into_iter().map(|(k, v)| (normalize_str(&k), normalize_deep(v))).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn plausible_base64_requires_padding_and_alphabet() {
        assert!(is_plausible_base64("aGVsbG8="));
        assert!(is_plausible_base64("aGVs\nbG8="));
        assert!(!is_plausible_base64(""));
        assert!(!is_plausible_base64("   "));
        assert!(!is_plausible_base64("aGVsbG8"));
        assert!(!is_plausible_base64("aberto"));
        assert!(!is_plausible_base64("ab!d"));
    }

    #[test]
    fn decode_ignores_whitespace() {
        assert_eq!(decode_base64(" aGVs bG8=\r\n").unwrap(), b"hello");
        assert_eq!(decode_base64("nope"), Err(DecodeError::NotBase64));
    }

    #[test]
    fn latin1_bytes_are_transcoded() {
        assert_eq!(normalize_text(b"Caf\xe9 em gr\xe3os"), "Café em grãos");
        assert_eq!(detect_charset(b"Jo\xe3o"), Some(Charset::Latin1));
        assert_eq!(detect_charset(b"plain"), Some(Charset::Utf8));
    }

    #[test]
    fn utf8_is_composed_to_nfc() {
        assert_eq!(normalize_text("Cafe\u{301}".as_bytes()), "Caf\u{e9}");
        assert_eq!(normalize_text("João".as_bytes()), "João");
    }

    #[test]
    fn repair_keeps_valid_utf8_next_to_latin1() {
        assert_eq!(repair_text(b"Jo\xc3\xa3o / Caf\xe9 / gr\xe3os"), "João / Café / grãos");
        assert_eq!(repair_text(b"trailing \xc3"), "trailing \u{c3}");
        assert_eq!(repair_text("Cafe\u{301}".as_bytes()), "Caf\u{e9}");
        assert_eq!(repair_text(b""), "");
    }

    #[test]
    fn deep_normalization_covers_keys_and_keeps_order() {
        let v = json!({"zeta": "e\u{301}", "a\u{301}": [1, "o\u{308}"], "m": {"n": null}});
        let out = normalize_deep(v);
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["zeta", "\u{e1}", "m"]);
        assert_eq!(out["zeta"], "\u{e9}");
        assert_eq!(out["\u{e1}"][1], "\u{f6}");
        assert_eq!(out["m"]["n"], Value::Null);
    }

    proptest! {
        #[test]
        fn normalize_text_is_idempotent(bytes in proptest::collection::vec(any::<u8>(), 0..64)) {
            let once = normalize_text(&bytes);
            prop_assert_eq!(normalize_text(once.as_bytes()), once);
        }

        #[test]
        fn repair_is_idempotent_and_spares_utf8(bytes in proptest::collection::vec(any::<u8>(), 0..64), text in "\\PC{0,16}") {
            let once = repair_text(&bytes);
            prop_assert_eq!(repair_text(once.as_bytes()), once);
            prop_assert_eq!(repair_text(text.as_bytes()), normalize_str(&text));
        }

        #[test]
        fn normalized_keys_are_nfc(key in "\\PC{0,12}", val in "\\PC{0,12}") {
            let mut map = serde_json::Map::new();
            map.insert(key.clone(), Value::String(val.clone()));
            let out = normalize_deep(Value::Object(map));
            let obj = out.as_object().unwrap();
            prop_assert_eq!(obj.len(), 1);
            prop_assert_eq!(obj.get(&normalize_str(&key)), Some(&Value::String(normalize_str(&val))));
        }

        #[test]
        fn encoded_bytes_are_plausible(bytes in proptest::collection::vec(any::<u8>(), 1..48)) {
            let enc = encode_base64(&bytes);
            prop_assert!(is_plausible_base64(&enc));
            prop_assert_eq!(decode_base64(&enc).unwrap(), bytes);
        }
    }
}
