use std::collections::BTreeMap;
use std::fmt;
use std::fmt::Write as _;
use std::str::FromStr;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::core::error::{BundleError, ConfigError};

/// A Vega-Lite specification as produced by a chart.
pub type Spec = Map<String, Value>;

/// vegaEmbed options, passed through to the HTML output.
pub type EmbedOptions = Map<String, Value>;

pub const VEGA_LITE: &str = "vega-lite";

pub const SUPPORTED_FORMATS: [&str; 6] = ["png", "svg", "pdf", "html", "json", "vega"];

/// Anything that can describe itself as a chart specification.
pub trait Chart {
    fn to_dict(&self) -> Result<Spec>;
}

impl Chart for Spec {
    fn to_dict(&self) -> Result<Spec> {
        Ok(self.clone())
    }
}

impl Chart for Value {
    fn to_dict(&self) -> Result<Spec> {
        match self {
            Value::Object(map) => Ok(map.clone()),
            other => anyhow::bail!("chart specification must be a JSON object, got: {other}"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Json,
    Html,
    Png,
    Svg,
    Pdf,
    Vega,
}

impl ExportFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExportFormat::Json => "json",
            ExportFormat::Html => "html",
            ExportFormat::Png => "png",
            ExportFormat::Svg => "svg",
            ExportFormat::Pdf => "pdf",
            ExportFormat::Vega => "vega",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportFormat {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(ExportFormat::Json),
            "html" => Ok(ExportFormat::Html),
            "png" => Ok(ExportFormat::Png),
            "svg" => Ok(ExportFormat::Svg),
            "pdf" => Ok(ExportFormat::Pdf),
            "vega" => Ok(ExportFormat::Vega),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }
}

/// Rendering grammar. Only Vega-Lite is accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Mode {
    #[serde(rename = "vega-lite")]
    VegaLite,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::VegaLite => VEGA_LITE,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Mode {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == VEGA_LITE {
            Ok(Mode::VegaLite)
        } else {
            Err(ConfigError::InvalidMode(s.to_string()))
        }
    }
}

/// Serialization options for JSON text output, laid out the way Python's
/// `json.dumps` lays out its keyword arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JsonOptions {
    /// `None` writes everything on one line, `Some(n)` puts each member on its
    /// own line indented by `n` spaces per level.
    pub indent: Option<usize>,
    /// Item and key separators. Unset means `", "` / `": "`, or `","` / `": "`
    /// when indenting.
    pub separators: Option<(String, String)>,
    pub sort_keys: bool,
    /// Escape every non-ASCII character as `\uXXXX`.
    pub ensure_ascii: bool,
}

impl Default for JsonOptions {
    fn default() -> Self {
        Self {
            indent: None,
            separators: None,
            sort_keys: false,
            ensure_ascii: true,
        }
    }
}

impl JsonOptions {
    pub fn indented(indent: usize) -> Self {
        Self {
            indent: Some(indent),
            ..Self::default()
        }
    }

    pub fn with_separators(mut self, item: impl Into<String>, key: impl Into<String>) -> Self {
        self.separators = Some((item.into(), key.into()));
        self
    }

    pub fn with_sort_keys(mut self, sort_keys: bool) -> Self {
        self.sort_keys = sort_keys;
        self
    }

    pub fn with_ensure_ascii(mut self, ensure_ascii: bool) -> Self {
        self.ensure_ascii = ensure_ascii;
        self
    }

    pub fn to_string<T: Serialize + ?Sized>(&self, value: &T) -> Result<String> {
        let value = serde_json::to_value(value)?;
        let mut out = String::new();
        self.write_value(&mut out, &value, 0)?;
        Ok(out)
    }

    fn separators(&self) -> (&str, &str) {
        match &self.separators {
            Some((item, key)) => (item.as_str(), key.as_str()),
            None if self.indent.is_some() => (",", ": "),
            None => (", ", ": "),
        }
    }

    fn write_value(&self, out: &mut String, value: &Value, depth: usize) -> Result<()> {
        let (item_sep, key_sep) = self.separators();
        match value {
            Value::Array(items) if !items.is_empty() => {
                out.push('[');
                for (idx, item) in items.iter().enumerate() {
                    if idx > 0 {
                        out.push_str(item_sep);
                    }
                    self.newline(out, depth + 1);
                    self.write_value(out, item, depth + 1)?;
                }
                self.newline(out, depth);
                out.push(']');
            }
            Value::Object(map) if !map.is_empty() => {
                let mut entries: Vec<(&String, &Value)> = map.iter().collect();
                if self.sort_keys {
                    entries.sort_by(|a, b| a.0.cmp(b.0));
                }
                out.push('{');
                for (idx, (key, item)) in entries.into_iter().enumerate() {
                    if idx > 0 {
                        out.push_str(item_sep);
                    }
                    self.newline(out, depth + 1);
                    self.write_string(out, key)?;
                    out.push_str(key_sep);
                    self.write_value(out, item, depth + 1)?;
                }
                self.newline(out, depth);
                out.push('}');
            }
            Value::String(text) => self.write_string(out, text)?,
            // scalars and empty containers
            other => out.push_str(&other.to_string()),
        }
        Ok(())
    }

    fn newline(&self, out: &mut String, depth: usize) {
        if let Some(indent) = self.indent {
            out.push('\n');
            out.push_str(&" ".repeat(indent * depth));
        }
    }

    fn write_string(&self, out: &mut String, text: &str) -> Result<()> {
        let escaped = serde_json::to_string(text)?;
        if !self.ensure_ascii {
            out.push_str(&escaped);
            return Ok(());
        }
        let mut units = [0u16; 2];
        for ch in escaped.chars() {
            if ch.is_ascii() {
                out.push(ch);
                continue;
            }
            for unit in ch.encode_utf16(&mut units) {
                write!(out, "\\u{unit:04x}")?;
            }
        }
        Ok(())
    }
}

/// Options consumed by image renderers (png, svg, pdf, vega).
#[derive(Debug, Clone, PartialEq)]
pub struct RenderOptions {
    pub webdriver: Option<String>,
    pub scale_factor: f64,
    pub engine: Option<String>,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            webdriver: None,
            scale_factor: 1.0,
            engine: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Text(String),
    Binary(Vec<u8>),
}

impl Content {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Content::Text(text) => text.as_bytes(),
            Content::Binary(bytes) => bytes,
        }
    }

    pub fn is_binary(&self) -> bool {
        matches!(self, Content::Binary(_))
    }

    fn kind(&self) -> &'static str {
        if self.is_binary() {
            "binary"
        } else {
            "text"
        }
    }
}

/// Rendered output keyed by MIME type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MimeBundle {
    entries: BTreeMap<String, Content>,
}

impl MimeBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, mime: impl Into<String>, content: Content) {
        self.entries.insert(mime.into(), content);
    }

    pub fn with(mut self, mime: impl Into<String>, content: Content) -> Self {
        self.insert(mime, content);
        self
    }

    pub fn get(&self, mime: &str) -> Option<&Content> {
        self.entries.get(mime)
    }

    pub fn mime_types(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    /// Removes the entry for `mime`, requiring it to be of the given kind.
    pub fn take(&mut self, mime: &str, binary: bool) -> Result<Content, BundleError> {
        let content = self
            .entries
            .remove(mime)
            .ok_or_else(|| BundleError::MissingEntry(mime.to_string()))?;
        if content.is_binary() != binary {
            return Err(BundleError::WrongKind {
                mime: mime.to_string(),
                found: content.kind(),
            });
        }
        Ok(content)
    }

    /// Finds the single Vega JSON entry, whatever Vega major version it carries.
    pub fn vega_mime(&self) -> Option<&str> {
        self.mime_types()
            .find(|mime| mime.starts_with("application/vnd.vega.v") && mime.ends_with("+json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn value_chart_requires_object() {
        assert!(json!({"mark": "bar"}).to_dict().is_ok());
        assert!(json!([1, 2]).to_dict().is_err());
    }

    #[test]
    fn parses_known_formats_only() {
        for name in SUPPORTED_FORMATS {
            let format: ExportFormat = name.parse().expect("supported format");
            assert_eq!(format.as_str(), name);
        }
        assert_eq!(
            "gif".parse::<ExportFormat>(),
            Err(ConfigError::UnsupportedFormat("gif".to_string()))
        );
    }

    #[test]
    fn json_options_follow_json_dumps_layout() -> Result<()> {
        let value = json!({"a": [1, {}], "b": []});
        assert_eq!(JsonOptions::default().to_string(&value)?, r#"{"a": [1, {}], "b": []}"#);
        assert_eq!(
            JsonOptions::indented(2).to_string(&value)?,
            "{\n  \"a\": [\n    1,\n    {}\n  ],\n  \"b\": []\n}"
        );
        assert_eq!(
            JsonOptions::default()
                .with_separators(",", ":")
                .to_string(&value)?,
            r#"{"a":[1,{}],"b":[]}"#
        );
        Ok(())
    }

    #[test]
    fn json_options_keep_insertion_order_unless_sorting() -> Result<()> {
        let mut spec = Spec::new();
        spec.insert("mark".into(), json!("bar"));
        spec.insert("data".into(), json!({"values": []}));
        spec.insert("$schema".into(), json!("v5.json"));

        assert_eq!(
            JsonOptions::default().to_string(&spec)?,
            r#"{"mark": "bar", "data": {"values": []}, "$schema": "v5.json"}"#
        );
        assert_eq!(
            JsonOptions::default().with_sort_keys(true).to_string(&spec)?,
            r#"{"$schema": "v5.json", "data": {"values": []}, "mark": "bar"}"#
        );
        Ok(())
    }

    #[test]
    fn json_options_escape_non_ascii() -> Result<()> {
        let value = json!({"é": "😀\n"});
        assert_eq!(
            JsonOptions::default().to_string(&value)?,
            r#"{"\u00e9": "\ud83d\ude00\n"}"#
        );
        assert_eq!(
            JsonOptions::default().with_ensure_ascii(false).to_string(&value)?,
            "{\"é\": \"😀\\n\"}"
        );
        Ok(())
    }

    #[test]
    fn take_checks_content_kind() {
        let mut bundle = MimeBundle::new()
            .with("image/png", Content::Binary(vec![1, 2]))
            .with("image/svg+xml", Content::Text("<svg/>".into()));

        assert_eq!(
            bundle.take("image/svg+xml", true),
            Err(BundleError::WrongKind {
                mime: "image/svg+xml".into(),
                found: "text"
            })
        );
        assert_eq!(
            bundle.take("image/png", true),
            Ok(Content::Binary(vec![1, 2]))
        );
        assert_eq!(
            bundle.take("image/png", true),
            Err(BundleError::MissingEntry("image/png".into()))
        );
    }

    #[test]
    fn finds_vega_entry() {
        let bundle = MimeBundle::new()
            .with("image/svg+xml", Content::Text(String::new()))
            .with("application/vnd.vega.v5+json", Content::Text("{}".into()));
        assert_eq!(bundle.vega_mime(), Some("application/vnd.vega.v5+json"));
        assert_eq!(MimeBundle::new().vega_mime(), None);
    }
}
