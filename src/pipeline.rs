use anyhow::Result;
use serde_json::{Map, Value};

use crate::core::error::BundleError;
use crate::core::model::{
    Chart, Content, EmbedOptions, ExportFormat, JsonOptions, Mode, RenderOptions, Spec,
};
use crate::core::target::OutputTarget;
use crate::export::infer::{infer_format, infer_mode, SaveWarning};
use crate::export::writer::write_content;
use crate::export::{ConvertRequest, Converter};

#[derive(Debug, Clone)]
pub struct SaveOptions {
    pub vega_version: String,
    pub vegaembed_version: String,
    pub vegalite_version: Option<String>,
    /// Inferred from the target's file name when unset.
    pub format: Option<String>,
    /// Inferred from the embed options or the spec's `$schema` when unset.
    pub mode: Option<String>,
    pub embed_options: EmbedOptions,
    pub json_options: JsonOptions,
    pub render: RenderOptions,
    /// Inline the vega libraries into HTML output instead of loading them from a CDN.
    pub inline: bool,
    /// Passed through to the converter untouched.
    pub extra: Map<String, Value>,
}

impl SaveOptions {
    pub fn new(vega_version: impl Into<String>, vegaembed_version: impl Into<String>) -> Self {
        Self {
            vega_version: vega_version.into(),
            vegaembed_version: vegaembed_version.into(),
            vegalite_version: None,
            format: None,
            mode: None,
            embed_options: EmbedOptions::new(),
            json_options: JsonOptions::default(),
            render: RenderOptions::default(),
            inline: false,
            extra: Map::new(),
        }
    }

    pub fn with_vegalite_version(mut self, version: impl Into<String>) -> Self {
        self.vegalite_version = Some(version.into());
        self
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = Some(mode.into());
        self
    }

    pub fn with_embed_options(mut self, embed_options: EmbedOptions) -> Self {
        self.embed_options = embed_options;
        self
    }

    pub fn with_json_options(mut self, json_options: JsonOptions) -> Self {
        self.json_options = json_options;
        self
    }

    pub fn with_render(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    pub fn with_inline(mut self, inline: bool) -> Self {
        self.inline = inline;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }
}

/// Format and mode settled for one save, plus the spec they were settled against.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub format: String,
    pub mode: Mode,
    pub spec: Spec,
    pub warnings: Vec<SaveWarning>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveReport {
    pub format: ExportFormat,
    pub mode: Mode,
    pub warnings: Vec<SaveWarning>,
}

/// Settles format and mode without rendering or writing anything.
pub fn resolve(
    chart: &dyn Chart,
    target: &OutputTarget<'_>,
    options: &SaveOptions,
) -> Result<Resolved> {
    let mut warnings = Vec::new();
    let format = infer_format(options.format.as_deref(), target, options.inline, &mut warnings)?;
    let spec = chart.to_dict()?;
    let mode = infer_mode(
        options.mode.as_deref(),
        &options.embed_options,
        &spec,
        options.vegalite_version.as_deref(),
    )?;
    log::debug!("resolved format '{format}' and mode '{mode}' for {target}");
    Ok(Resolved {
        format,
        mode,
        spec,
        warnings,
    })
}

/// Saves `chart` to `target`, rendering through `converter` for every format
/// but JSON.
pub fn save(
    chart: &dyn Chart,
    target: &mut OutputTarget<'_>,
    options: &SaveOptions,
    converter: &dyn Converter,
) -> Result<SaveReport> {
    let Resolved {
        format,
        mode,
        spec,
        warnings,
    } = resolve(chart, target, options)?;
    let format: ExportFormat = format.parse()?;

    // Presence is checked by mode inference.
    let vegalite_version = options.vegalite_version.as_deref().unwrap_or_default();
    let mut extra = options.extra.clone();
    if format == ExportFormat::Html && options.inline {
        extra.insert("template".to_string(), Value::String("inline".to_string()));
    }

    let mut request = ConvertRequest {
        spec: &spec,
        format,
        mode,
        vega_version: &options.vega_version,
        vegalite_version,
        vegaembed_version: &options.vegaembed_version,
        embed_options: &options.embed_options,
        json_options: None,
        render: None,
        extra: &extra,
    };

    let content = match format {
        ExportFormat::Json => Content::Text(options.json_options.to_string(&spec)?),
        ExportFormat::Html => {
            request.json_options = Some(&options.json_options);
            converter.convert(&request)?.take("text/html", false)?
        }
        ExportFormat::Png | ExportFormat::Svg | ExportFormat::Pdf | ExportFormat::Vega => {
            request.render = Some(&options.render);
            let mut bundle = converter.convert(&request)?;
            match format {
                ExportFormat::Png => bundle.take("image/png", true)?,
                ExportFormat::Pdf => bundle.take("application/pdf", true)?,
                ExportFormat::Svg => bundle.take("image/svg+xml", false)?,
                _ => {
                    let mime = bundle.vega_mime().map(str::to_string).ok_or_else(|| {
                        BundleError::MissingEntry("application/vnd.vega.v*+json".to_string())
                    })?;
                    bundle.take(&mime, false)?
                }
            }
        }
    };

    write_content(target, &content)?;
    log::debug!("saved {format} chart to {target}");

    Ok(SaveReport {
        format,
        mode,
        warnings,
    })
}
