//! # UHAN Common Library
//!
//! The form pipeline shared by every UHAN / DAO Village assessment page:
//! - Form models, validation and score calculators
//! - Preview rendering and QR payloads
//! - Persistence adapter (SQLite, in-memory, local fallback)
//! - Preview export to PDF
//! - Form sessions with debounced, sequenced recomputes
//! - DAO member registry
//! - Event types, SSE helpers and configuration loading

pub mod config;
#[cfg(feature = "sqlx")]
pub mod db;
pub mod debounce;
pub mod error;
pub mod events;
pub mod export;
pub mod form;
pub mod ids;
pub mod members;
pub mod pages;
pub mod preview;
pub mod qr;
pub mod score;
pub mod sequence;
pub mod session;
pub mod sse;
pub mod storage;
pub mod time;
pub mod validation;

pub use error::{Error, Result};
pub use form::{FieldValue, FormModel};
pub use pages::{PageDefinition, PageKind, RenderedForm};
pub use session::FormSession;
