//! Preview renderer
//!
//! Maps a `FormModel` and its latest `ScoreResult` to the fixed set of display
//! targets a page shows. Rendering is pure; the browser script only copies
//! the resulting values into the DOM.

use serde::{Deserialize, Serialize};

use crate::form::{format_number, FormModel};
use crate::score::ScoreResult;

/// Shown in place of an empty numeric value
pub const PLACEHOLDER_DASH: &str = "—";

/// What a single display target should show
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayValue {
    Text { text: String },
    Image { src: String },
    Placeholder { glyph: String },
    Progress { percent: f64 },
}

impl DisplayValue {
    pub fn text(text: impl Into<String>) -> Self {
        DisplayValue::Text { text: text.into() }
    }

    pub fn placeholder(glyph: impl Into<String>) -> Self {
        DisplayValue::Placeholder { glyph: glyph.into() }
    }

    /// Text content for `Text` values
    pub fn as_text(&self) -> Option<&str> {
        match self {
            DisplayValue::Text { text } => Some(text),
            _ => None,
        }
    }
}

/// One rendered target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewEntry {
    pub target: String,
    pub value: DisplayValue,
}

/// Ordered target -> value list, in template order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Preview {
    entries: Vec<PreviewEntry>,
}

impl Preview {
    pub fn get(&self, target: &str) -> Option<&DisplayValue> {
        self.entries
            .iter()
            .find(|e| e.target == target)
            .map(|e| &e.value)
    }

    /// Text of `target`, `None` if missing or not a text value
    pub fn text(&self, target: &str) -> Option<&str> {
        self.get(target).and_then(DisplayValue::as_text)
    }

    pub fn insert(&mut self, target: impl Into<String>, value: DisplayValue) {
        let target = target.into();
        match self.entries.iter_mut().find(|e| e.target == target) {
            Some(entry) => entry.value = value,
            None => self.entries.push(PreviewEntry { target, value }),
        }
    }

    pub fn entries(&self) -> &[PreviewEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Where a target's value comes from
#[derive(Clone, Copy)]
pub enum Source {
    /// Text field, or `fallback` when blank
    Text {
        key: &'static str,
        fallback: &'static str,
    },
    /// Numeric field printed with `suffix` (`"4/5"`); blank shows the dash
    Rating {
        key: &'static str,
        suffix: &'static str,
    },
    /// Named score component with fixed decimals
    Component {
        name: &'static str,
        decimals: usize,
        suffix: &'static str,
    },
    Total {
        decimals: usize,
        suffix: &'static str,
    },
    Percentage {
        decimals: usize,
        suffix: &'static str,
    },
    /// Score label, dash when the calculator has none
    Label { name: &'static str },
    /// Photo attachment, or `glyph` when absent
    Photo { glyph: &'static str },
    Signature { glyph: &'static str },
    /// Progress bar / gauge on the percentage
    Progress,
    /// Anything composed from several fields
    Computed(fn(&FormModel, &ScoreResult) -> String),
}

/// Binds one display target to its source
#[derive(Clone, Copy)]
pub struct Binding {
    pub target: &'static str,
    pub source: Source,
}

impl Binding {
    pub const fn new(target: &'static str, source: Source) -> Self {
        Self { target, source }
    }
}

/// Ordered bindings for one page
#[derive(Clone, Copy)]
pub struct PreviewTemplate {
    pub bindings: &'static [Binding],
}

impl PreviewTemplate {
    pub const fn new(bindings: &'static [Binding]) -> Self {
        Self { bindings }
    }

    pub fn targets(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.bindings.iter().map(|b| b.target)
    }

    pub fn render(&self, form: &FormModel, score: &ScoreResult) -> Preview {
        let mut preview = Preview::default();
        for binding in self.bindings {
            preview.insert(binding.target, resolve(&binding.source, form, score));
        }
        preview
    }
}

fn fixed(value: f64, decimals: usize, suffix: &str) -> DisplayValue {
    DisplayValue::text(format!("{:.*}{}", decimals, value, suffix))
}

fn resolve(source: &Source, form: &FormModel, score: &ScoreResult) -> DisplayValue {
    match *source {
        Source::Text { key, fallback } => {
            DisplayValue::text(form.text(key).unwrap_or_else(|| fallback.to_string()))
        }
        Source::Rating { key, suffix } => match form.number(key) {
            Some(n) => DisplayValue::text(format!("{}{}", format_number(n), suffix)),
            None => DisplayValue::placeholder(PLACEHOLDER_DASH),
        },
        Source::Component {
            name,
            decimals,
            suffix,
        } => match score.component(name) {
            Some(v) => fixed(v, decimals, suffix),
            None => DisplayValue::placeholder(PLACEHOLDER_DASH),
        },
        Source::Total { decimals, suffix } => fixed(score.total, decimals, suffix),
        Source::Percentage { decimals, suffix } => fixed(score.percentage, decimals, suffix),
        Source::Label { name } => match score.label(name) {
            Some(label) => DisplayValue::text(label),
            None => DisplayValue::placeholder(PLACEHOLDER_DASH),
        },
        Source::Photo { glyph } => match form.photo() {
            Some(att) => DisplayValue::Image {
                src: att.into_string(),
            },
            None => DisplayValue::placeholder(glyph),
        },
        Source::Signature { glyph } => match form.signature() {
            Some(att) => DisplayValue::Image {
                src: att.into_string(),
            },
            None => DisplayValue::placeholder(glyph),
        },
        Source::Progress => DisplayValue::Progress {
            percent: score.percentage.clamp(0.0, 100.0),
        },
        Source::Computed(f) => DisplayValue::text(f(form, score)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::form::PHOTO_FIELD;
    use crate::score::LABEL_CATEGORY;

    const PIXEL: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mP8z8BQDwAEhQGAhKmMIQAAAABJRU5ErkJggg==";

    fn total_line(_: &FormModel, score: &ScoreResult) -> String {
        format!("{}/{} ({:.1}%)", score.total, score.max, score.percentage)
    }

    const BINDINGS: &[Binding] = &[
        Binding::new("name", Source::Text { key: "name", fallback: "Facilitator Name" }),
        Binding::new("r1", Source::Rating { key: "slider1", suffix: "/5" }),
        Binding::new("pct", Source::Percentage { decimals: 1, suffix: "%" }),
        Binding::new("level", Source::Label { name: LABEL_CATEGORY }),
        Binding::new("photo", Source::Photo { glyph: "📷" }),
        Binding::new("gauge", Source::Progress),
        Binding::new("line", Source::Computed(total_line)),
    ];

    const TEMPLATE: PreviewTemplate = PreviewTemplate::new(BINDINGS);

    fn score() -> ScoreResult {
        let mut s = ScoreResult {
            total: 18.0,
            max: 25.0,
            percentage: 72.0,
            ..ScoreResult::default()
        };
        s.labels.insert(LABEL_CATEGORY.to_string(), "B - Active Citizen".to_string());
        s
    }

    #[test]
    fn test_empty_form_uses_fallbacks_and_placeholders() {
        let preview = TEMPLATE.render(&FormModel::new(), &ScoreResult::default());
        assert_eq!(preview.text("name"), Some("Facilitator Name"));
        assert_eq!(preview.get("r1"), Some(&DisplayValue::placeholder(PLACEHOLDER_DASH)));
        assert_eq!(preview.get("level"), Some(&DisplayValue::placeholder(PLACEHOLDER_DASH)));
        assert_eq!(preview.get("photo"), Some(&DisplayValue::placeholder("📷")));
        assert_eq!(preview.len(), BINDINGS.len());
    }

    #[test]
    fn test_filled_form_renders_values() {
        let form = FormModel::new()
            .with("name", "Asha Rao")
            .with("slider1", 4)
            .with(PHOTO_FIELD, PIXEL);
        let preview = TEMPLATE.render(&form, &score());
        assert_eq!(preview.text("name"), Some("Asha Rao"));
        assert_eq!(preview.text("r1"), Some("4/5"));
        assert_eq!(preview.text("pct"), Some("72.0%"));
        assert_eq!(preview.text("level"), Some("B - Active Citizen"));
        assert_eq!(preview.text("line"), Some("18/25 (72.0%)"));
        assert_eq!(preview.get("gauge"), Some(&DisplayValue::Progress { percent: 72.0 }));
        assert!(matches!(preview.get("photo"), Some(DisplayValue::Image { src }) if src == PIXEL));
    }

    #[test]
    fn test_render_is_pure() {
        let form = FormModel::new().with("name", "x").with("slider1", 2);
        assert_eq!(TEMPLATE.render(&form, &score()), TEMPLATE.render(&form, &score()));
    }

    #[test]
    fn test_preview_keeps_template_order() {
        let preview = TEMPLATE.render(&FormModel::new(), &score());
        let targets: Vec<_> = preview.entries().iter().map(|e| e.target.as_str()).collect();
        let expected: Vec<_> = TEMPLATE.targets().collect();
        assert_eq!(targets, expected);
    }

    #[test]
    fn test_display_value_json_shape() {
        let json = serde_json::to_value(DisplayValue::placeholder("—")).unwrap();
        assert_eq!(json["kind"], "placeholder");
        assert_eq!(json["glyph"], "—");
    }
}
