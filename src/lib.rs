//! Hybrid HTML reports for semi-structured log payloads.
//!
//! Item payloads (base64 JSON, optionally sealed in an AES-256-CBC envelope) are opened and,
//! when every row of a section is flat, shown as a table. Everything else falls back to a
//! key/value tree.
//!
//! ```
//! use hybrid_report::{Renderer, RenderOptions};
//! use serde_json::json;
//!
//! let doc = json!({"record": {"id": 1024, "status": "aberto"}});
//! let html = Renderer::new(RenderOptions::default()).render(&doc);
//! assert!(html.contains("<h3>Record</h3>"));
//! ```

pub mod codec;
pub mod crypto;
pub mod error;
pub mod html;
pub mod renderer;
pub mod resolver;
pub mod shape;

pub use error::{CryptoError, DecodeError};
pub use renderer::{DEFAULT_PAYLOAD_KEY, RenderOptions, Renderer, render_multilevel_table};
pub use resolver::FieldResolver;
pub use shape::{FlatTable, Shape};
