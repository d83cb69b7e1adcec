pub mod html_template;
pub mod infer;
pub mod vl_convert;
pub mod writer;

use anyhow::Result;
use serde_json::{Map, Value};

use crate::core::model::{EmbedOptions, ExportFormat, JsonOptions, MimeBundle, Mode, RenderOptions, Spec};

pub use html_template::{InlineScripts, TemplateConverter};
pub use infer::SaveWarning;
pub use vl_convert::VlConvertBridge;

/// Everything a converter needs to render one spec.
#[derive(Debug, Clone)]
pub struct ConvertRequest<'a> {
    pub spec: &'a Spec,
    pub format: ExportFormat,
    pub mode: Mode,
    pub vega_version: &'a str,
    pub vegalite_version: &'a str,
    pub vegaembed_version: &'a str,
    pub embed_options: &'a EmbedOptions,
    /// Set for HTML output only.
    pub json_options: Option<&'a JsonOptions>,
    /// Set for image-like output only.
    pub render: Option<&'a RenderOptions>,
    pub extra: &'a Map<String, Value>,
}

impl ConvertRequest<'_> {
    pub fn extra_str(&self, key: &str) -> Option<&str> {
        self.extra.get(key).and_then(Value::as_str)
    }
}

/// Turns a spec into rendered output keyed by MIME type.
pub trait Converter {
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<MimeBundle>;
}

/// Renders HTML from templates and hands every other format to `vl-convert`.
#[derive(Debug, Clone)]
pub struct DefaultConverter {
    html: TemplateConverter,
    images: VlConvertBridge,
}

impl DefaultConverter {
    pub fn new(html: TemplateConverter, images: VlConvertBridge) -> Self {
        Self { html, images }
    }
}

impl Converter for DefaultConverter {
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<MimeBundle> {
        match request.format {
            ExportFormat::Html => self.html.convert(request),
            _ => self.images.convert(request),
        }
    }
}
