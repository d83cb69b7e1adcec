use serde_json::Value;

use crate::core::error::ConfigError;
use crate::core::model::{EmbedOptions, Mode, Spec, VEGA_LITE};
use crate::core::target::OutputTarget;

/// Something the caller asked for that had no effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveWarning {
    InlineIgnored { format: String },
}

impl std::fmt::Display for SaveWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SaveWarning::InlineIgnored { .. } => {
                f.write_str("inline argument ignored for non HTML formats.")
            }
        }
    }
}

/// Returns the explicit format, or the one implied by the target's name.
///
/// The result is not validated here; unknown names are rejected at dispatch.
pub fn infer_format(
    format: Option<&str>,
    target: &OutputTarget<'_>,
    inline: bool,
    warnings: &mut Vec<SaveWarning>,
) -> Result<String, ConfigError> {
    let format = match (format, target) {
        (Some(format), _) => format.to_string(),
        (None, OutputTarget::Path(name)) => name.rsplit('.').next().unwrap_or_default().to_string(),
        (None, OutputTarget::StructuredPath(path)) => path
            .extension()
            .map(|ext| ext.to_string_lossy().into_owned())
            .unwrap_or_default(),
        (None, OutputTarget::Stream(_)) => return Err(ConfigError::MissingFormat),
    };

    if format != "html" && inline {
        log::warn!("inline argument ignored for non HTML formats.");
        warnings.push(SaveWarning::InlineIgnored {
            format: format.clone(),
        });
    }

    Ok(format)
}

/// Returns the explicit mode, else the one carried by the embed options or the
/// spec's `$schema` URL, else Vega-Lite. Only Vega-Lite is accepted, and it
/// needs a library version.
pub fn infer_mode(
    mode: Option<&str>,
    embed_options: &EmbedOptions,
    spec: &Spec,
    vegalite_version: Option<&str>,
) -> Result<Mode, ConfigError> {
    let mode = match mode {
        Some(mode) => mode.to_string(),
        None => {
            if let Some(value) = embed_options.get("mode") {
                value_text(value)
            } else if let Some(schema) = spec.get("$schema") {
                schema_mode(&value_text(schema))
            } else {
                VEGA_LITE.to_string()
            }
        }
    };

    let mode: Mode = mode.parse()?;
    if vegalite_version.is_none() {
        return Err(ConfigError::MissingVersion);
    }
    Ok(mode)
}

fn schema_mode(schema: &str) -> String {
    let segments: Vec<&str> = schema.split('/').collect();
    if segments.len() < 2 {
        return String::new();
    }
    segments[segments.len() - 2].to_string()
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;

    fn object(value: Value) -> Spec {
        match value {
            Value::Object(map) => map,
            _ => Spec::new(),
        }
    }

    #[test]
    fn format_from_string_path() {
        let mut warnings = Vec::new();
        for ext in ["json", "html", "png", "svg", "pdf"] {
            let target = OutputTarget::path(format!("out/chart.v2.{ext}"));
            assert_eq!(infer_format(None, &target, false, &mut warnings), Ok(ext.to_string()));
        }
        assert!(warnings.is_empty());
    }

    #[test]
    fn format_from_structured_path() {
        let mut warnings = Vec::new();
        let target = OutputTarget::structured(PathBuf::from("dir.d/chart.svg"));
        assert_eq!(infer_format(None, &target, false, &mut warnings), Ok("svg".into()));

        let bare = OutputTarget::structured(PathBuf::from("chart"));
        assert_eq!(infer_format(None, &bare, false, &mut warnings), Ok(String::new()));
    }

    #[test]
    fn string_path_without_dot_is_whole_name() {
        let mut warnings = Vec::new();
        let target = OutputTarget::path("chart");
        assert_eq!(infer_format(None, &target, false, &mut warnings), Ok("chart".into()));
    }

    #[test]
    fn explicit_format_wins() {
        let mut warnings = Vec::new();
        let target = OutputTarget::path("chart.png");
        assert_eq!(infer_format(Some("json"), &target, false, &mut warnings), Ok("json".into()));
    }

    #[test]
    fn stream_needs_explicit_format() {
        let mut sink = Vec::new();
        let mut warnings = Vec::new();
        let target = OutputTarget::stream(&mut sink);
        assert_eq!(
            infer_format(None, &target, false, &mut warnings),
            Err(ConfigError::MissingFormat)
        );
        assert_eq!(infer_format(Some("svg"), &target, false, &mut warnings), Ok("svg".into()));
    }

    #[test]
    fn inline_outside_html_warns() {
        let mut warnings = Vec::new();
        let target = OutputTarget::path("chart.json");
        infer_format(None, &target, true, &mut warnings).unwrap();
        assert_eq!(
            warnings,
            vec![SaveWarning::InlineIgnored {
                format: "json".into()
            }]
        );

        warnings.clear();
        infer_format(Some("html"), &target, true, &mut warnings).unwrap();
        assert!(warnings.is_empty());
    }

    #[test]
    fn mode_defaults_to_vega_lite() {
        let mode = infer_mode(None, &EmbedOptions::new(), &Spec::new(), Some("5.20.1"));
        assert_eq!(mode, Ok(Mode::VegaLite));
    }

    #[test]
    fn mode_from_embed_options() {
        let embed = object(json!({"mode": "vega-lite"}));
        let spec = object(json!({"$schema": "https://vega.github.io/schema/vega/v5.json"}));
        assert_eq!(infer_mode(None, &embed, &spec, Some("5")), Ok(Mode::VegaLite));

        let embed = object(json!({"mode": "vega"}));
        assert_eq!(
            infer_mode(None, &embed, &Spec::new(), Some("5")),
            Err(ConfigError::InvalidMode("vega".into()))
        );
    }

    #[test]
    fn mode_from_schema_is_second_to_last_segment() {
        let spec = object(json!({"$schema": "https://vega.github.io/schema/vega-lite/v5.json"}));
        assert_eq!(infer_mode(None, &EmbedOptions::new(), &spec, Some("5")), Ok(Mode::VegaLite));

        let spec = object(json!({"$schema": "https://example.com/schemas/v5/v5.json"}));
        assert_eq!(
            infer_mode(None, &EmbedOptions::new(), &spec, Some("5")),
            Err(ConfigError::InvalidMode("v5".into()))
        );
    }

    #[test]
    fn explicit_mode_is_still_validated() {
        assert_eq!(
            infer_mode(Some("vega"), &EmbedOptions::new(), &Spec::new(), Some("5")),
            Err(ConfigError::InvalidMode("vega".into()))
        );
    }

    #[test]
    fn vega_lite_needs_version() {
        assert_eq!(
            infer_mode(None, &EmbedOptions::new(), &Spec::new(), None),
            Err(ConfigError::MissingVersion)
        );
    }

    #[test]
    fn short_schema_gives_empty_mode() {
        let spec = object(json!({"$schema": "v5.json"}));
        assert_eq!(
            infer_mode(None, &EmbedOptions::new(), &spec, Some("5")),
            Err(ConfigError::InvalidMode(String::new()))
        );
    }
}
