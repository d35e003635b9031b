//! Form model: the flat field map every page is built on
//!
//! A page's inputs (text boxes, 1-5 sliders, file uploads) are projected into
//! one `FormModel`. Keys are fixed per page; the map itself knows nothing
//! about pages. Image uploads and drawn signatures travel as data URIs under
//! the [`PHOTO_FIELD`] / [`SIGNATURE_FIELD`] keys.

use base64::engine::general_purpose::STANDARD as B64;
use base64::Engine;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::{Error, Result};

/// Field key holding the profile photo data URI
pub const PHOTO_FIELD: &str = "photo";

/// Field key holding the signature data URI
pub const SIGNATURE_FIELD: &str = "signature";

/// Largest accepted attachment (decoded bytes)
pub const MAX_ATTACHMENT_BYTES: usize = 5 * 1024 * 1024;

/// Single form value
///
/// Sliders usually arrive as numbers, but pages that read `input.value`
/// send numeric strings; [`FieldValue::as_number`] accepts both.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Text(String),
}

impl FieldValue {
    /// Numeric view of the value; `None` for blank or non-numeric text
    pub fn as_number(&self) -> Option<f64> {
        let n = match self {
            FieldValue::Number(n) => *n,
            FieldValue::Text(s) => s.trim().parse::<f64>().ok()?,
        };
        n.is_finite().then_some(n)
    }

    /// Display text; whole numbers print without a fractional part
    pub fn as_text(&self) -> String {
        match self {
            FieldValue::Number(n) => format_number(*n),
            FieldValue::Text(s) => s.clone(),
        }
    }

    pub fn is_blank(&self) -> bool {
        match self {
            FieldValue::Number(n) => !n.is_finite(),
            FieldValue::Text(s) => s.trim().is_empty(),
        }
    }
}

impl From<f64> for FieldValue {
    fn from(n: f64) -> Self {
        FieldValue::Number(n)
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        FieldValue::Number(n as f64)
    }
}

impl From<i32> for FieldValue {
    fn from(n: i32) -> Self {
        FieldValue::Number(f64::from(n))
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        FieldValue::Text(s.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(s: String) -> Self {
        FieldValue::Text(s)
    }
}

/// Format a number the way the pages print it: `18`, `72.5`
pub fn format_number(n: f64) -> String {
    format!("{}", n)
}

/// Round to one decimal place (`toFixed(1)` semantics for display values)
pub fn round1(n: f64) -> f64 {
    (n * 10.0).round() / 10.0
}

/// Flat mapping of field id to current value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormModel {
    fields: BTreeMap<String, FieldValue>,
}

impl FormModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert, handy for fixtures
    pub fn with(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.set(key, value);
        self
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<FieldValue>) {
        self.fields.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<FieldValue> {
        self.fields.remove(key)
    }

    /// Numeric value of `key`, if present and numeric
    pub fn number(&self, key: &str) -> Option<f64> {
        self.fields.get(key).and_then(FieldValue::as_number)
    }

    /// Trimmed text of `key`, `None` when missing or blank
    pub fn text(&self, key: &str) -> Option<String> {
        self.fields
            .get(key)
            .filter(|v| !v.is_blank())
            .map(|v| v.as_text().trim().to_string())
    }

    /// Overwrite fields from `other`; keys absent from `other` are kept
    pub fn merge(&mut self, other: FormModel) {
        self.fields.extend(other.fields);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &FieldValue)> {
        self.fields.iter()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Photo attachment, if a valid one is present
    pub fn photo(&self) -> Option<Attachment> {
        self.attachment(PHOTO_FIELD)
    }

    /// Signature attachment, if a valid one is present
    pub fn signature(&self) -> Option<Attachment> {
        self.attachment(SIGNATURE_FIELD)
    }

    fn attachment(&self, key: &str) -> Option<Attachment> {
        self.text(key).and_then(|uri| Attachment::parse(&uri).ok())
    }
}

impl FromIterator<(String, FieldValue)> for FormModel {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self {
            fields: iter.into_iter().collect(),
        }
    }
}

/// Image captured by upload or drawn on the signature pad, as a data URI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    uri: String,
    mime: String,
    decoded_len: usize,
}

impl Attachment {
    /// Validate a `data:image/<type>;base64,<payload>` URI
    ///
    /// Rejects non-image types, malformed base64 and anything larger than
    /// [`MAX_ATTACHMENT_BYTES`] once decoded.
    pub fn parse(uri: &str) -> Result<Self> {
        let rest = uri
            .strip_prefix("data:")
            .ok_or_else(|| Error::InvalidInput("attachment is not a data URI".to_string()))?;
        let (header, payload) = rest
            .split_once(',')
            .ok_or_else(|| Error::InvalidInput("data URI has no payload".to_string()))?;
        let mime = header
            .strip_suffix(";base64")
            .ok_or_else(|| Error::InvalidInput("data URI must be base64 encoded".to_string()))?;
        if !mime.starts_with("image/") {
            return Err(Error::InvalidInput(format!(
                "please select a valid image file (got {})",
                mime
            )));
        }

        // Cheap size check before decoding anything
        let estimated = payload.len() / 4 * 3;
        if estimated > MAX_ATTACHMENT_BYTES + 3 {
            return Err(Error::InvalidInput(
                "image size should be less than 5MB".to_string(),
            ));
        }
        let decoded = B64
            .decode(payload.trim())
            .map_err(|e| Error::InvalidInput(format!("invalid image data: {}", e)))?;
        if decoded.len() > MAX_ATTACHMENT_BYTES {
            return Err(Error::InvalidInput(
                "image size should be less than 5MB".to_string(),
            ));
        }

        Ok(Self {
            uri: uri.to_string(),
            mime: mime.to_string(),
            decoded_len: decoded.len(),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.uri
    }

    pub fn mime(&self) -> &str {
        &self.mime
    }

    pub fn decoded_len(&self) -> usize {
        self.decoded_len
    }

    pub fn into_string(self) -> String {
        self.uri
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    #[test]
    fn test_number_accepts_numeric_text() {
        let form = FormModel::new()
            .with("slider1", "4")
            .with("slider2", 3)
            .with("name", "Asha");
        assert_eq!(form.number("slider1"), Some(4.0));
        assert_eq!(form.number("slider2"), Some(3.0));
        assert_eq!(form.number("name"), None);
        assert_eq!(form.number("missing"), None);
    }

    #[test]
    fn test_text_trims_and_skips_blank() {
        let form = FormModel::new().with("name", "  Asha  ").with("email", "   ");
        assert_eq!(form.text("name").as_deref(), Some("Asha"));
        assert_eq!(form.text("email"), None);
    }

    #[test]
    fn test_number_display_has_no_trailing_zero() {
        assert_eq!(FieldValue::Number(18.0).as_text(), "18");
        assert_eq!(FieldValue::Number(72.5).as_text(), "72.5");
    }

    #[test]
    fn test_round1() {
        assert_eq!(round1(72.04), 72.0);
        assert_eq!(round1(66.25), 66.3);
    }

    #[test]
    fn test_merge_overwrites_only_given_keys() {
        let mut form = FormModel::new().with("a", 1).with("b", 2);
        form.merge(FormModel::new().with("b", 5).with("c", "x"));
        assert_eq!(form.number("a"), Some(1.0));
        assert_eq!(form.number("b"), Some(5.0));
        assert_eq!(form.text("c").as_deref(), Some("x"));
    }

    #[test]
    fn test_serializes_as_flat_object() {
        let form = FormModel::new().with("engagement", 4).with("name", "Ravi");
        let json = serde_json::to_value(&form).unwrap();
        assert_eq!(json["engagement"], 4.0);
        assert_eq!(json["name"], "Ravi");
    }

    #[test]
    fn test_numeric_string_survives_json() {
        let form = FormModel::new().with("slider1", "4");
        let text = serde_json::to_string(&form).unwrap();
        let back: FormModel = serde_json::from_str(&text).unwrap();
        assert_eq!(back, form);
    }

    #[test]
    fn test_attachment_accepts_png_data_uri() {
        let att = Attachment::parse(PIXEL).unwrap();
        assert_eq!(att.mime(), "image/png");
        assert!(att.decoded_len() > 0);
    }

    #[test]
    fn test_attachment_rejects_non_image() {
        let err = Attachment::parse("data:text/plain;base64,aGVsbG8=").unwrap_err();
        assert!(err.to_string().contains("valid image"));
    }

    #[test]
    fn test_attachment_rejects_oversize() {
        let payload = "A".repeat((MAX_ATTACHMENT_BYTES / 3 + 10) * 4);
        let uri = format!("data:image/png;base64,{}", payload);
        assert!(Attachment::parse(&uri).is_err());
    }

    #[test]
    fn test_form_photo_lookup() {
        let form = FormModel::new().with(PHOTO_FIELD, PIXEL).with(SIGNATURE_FIELD, "junk");
        assert!(form.photo().is_some());
        assert!(form.signature().is_none());
    }
}
