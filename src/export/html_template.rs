use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use crate::core::model::{Content, ExportFormat, JsonOptions, MimeBundle};
use crate::export::{ConvertRequest, Converter};

const CDN_ROOT: &str = "https://cdn.jsdelivr.net/npm";

/// JavaScript sources embedded by the `inline` template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineScripts {
    pub vega: String,
    pub vega_lite: String,
    pub vega_embed: String,
}

impl InlineScripts {
    /// Reads `vega.js`, `vega-lite.js` and `vega-embed.js` from `dir`.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let read = |name: &str| {
            let path = dir.join(name);
            fs::read_to_string(&path)
                .with_context(|| format!("failed to read inline script {}", path.display()))
        };
        Ok(Self {
            vega: read("vega.js")?,
            vega_lite: read("vega-lite.js")?,
            vega_embed: read("vega-embed.js")?,
        })
    }
}

/// Renders the `text/html` entry by filling an HTML page template.
#[derive(Debug, Clone, Default)]
pub struct TemplateConverter {
    inline_scripts: Option<InlineScripts>,
}

impl TemplateConverter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_inline_scripts(mut self, scripts: InlineScripts) -> Self {
        self.inline_scripts = Some(scripts);
        self
    }

    fn script_tags(&self, template: &str, request: &ConvertRequest<'_>) -> Result<String> {
        match template {
            "standard" => Ok(format!(
                r#"<script type="text/javascript" src="{CDN_ROOT}/vega@{vega}"></script>
<script type="text/javascript" src="{CDN_ROOT}/vega-lite@{vegalite}"></script>
<script type="text/javascript" src="{CDN_ROOT}/vega-embed@{vegaembed}"></script>"#,
                vega = html_escape::encode_double_quoted_attribute(request.vega_version),
                vegalite = html_escape::encode_double_quoted_attribute(request.vegalite_version),
                vegaembed = html_escape::encode_double_quoted_attribute(request.vegaembed_version),
            )),
            "inline" => {
                let scripts = self.inline_scripts.as_ref().ok_or_else(|| {
                    anyhow::anyhow!("inline HTML template requires bundled vega scripts")
                })?;
                Ok([&scripts.vega, &scripts.vega_lite, &scripts.vega_embed]
                    .iter()
                    .map(|source| {
                        format!(
                            "<script type=\"text/javascript\">\n{}\n</script>",
                            html_escape::encode_script(source.as_str())
                        )
                    })
                    .collect::<Vec<_>>()
                    .join("\n"))
            }
            other => anyhow::bail!("unknown HTML template: '{other}'"),
        }
    }
}

impl Converter for TemplateConverter {
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<MimeBundle> {
        if request.format != ExportFormat::Html {
            anyhow::bail!("HTML template converter cannot produce '{}'", request.format);
        }

        let template = request.extra_str("template").unwrap_or("standard");
        let output_div = css_identifier(request.extra_str("output_div").unwrap_or("vis"))?;
        let title = request.extra_str("title").unwrap_or("Chart");
        let json_options = request.json_options.cloned().unwrap_or_default();

        let mut embed_options = request.embed_options.clone();
        embed_options
            .entry("mode")
            .or_insert_with(|| Value::String(request.mode.to_string()));

        let spec = json_options.to_string(request.spec)?;
        let embed = JsonOptions::default().to_string(&embed_options)?;
        let div_selector = JsonOptions::default().to_string(&format!("#{output_div}"))?;

        let html = format!(
            r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<title>{title}</title>
<style>
#{div}.vega-embed {{ width: 100%; display: flex; }}
#{div}.vega-embed details, #{div}.vega-embed details summary {{ position: relative; }}
</style>
{scripts}
</head>
<body>
<div id="{div}"></div>
<script>
(function(vegaEmbed) {{
  var spec = {spec};
  var embedOpt = {embed};

  function showError(el, error) {{
    el.innerHTML = ('<div style="color:red;">'
                    + '<p>JavaScript Error: ' + error.message + '</p>'
                    + "<p>This usually means there's a typo in your chart specification. "
                    + "See the javascript console for the full traceback.</p>"
                    + '</div>');
    throw error;
  }}
  const el = document.querySelector({selector});
  vegaEmbed(el, spec, embedOpt).catch(error => showError(el, error));
}})(vegaEmbed);
</script>
</body>
</html>"#,
            title = html_escape::encode_text(title),
            div = output_div,
            scripts = self.script_tags(template, request)?,
            spec = html_escape::encode_script(&spec),
            embed = html_escape::encode_script(&embed),
            selector = html_escape::encode_script(&div_selector),
        );

        log::debug!("rendered '{template}' HTML template ({} bytes)", html.len());
        Ok(MimeBundle::new().with("text/html", Content::Text(html)))
    }
}

/// The output div id lands in a CSS selector, a JS string and an attribute,
/// so only plain identifiers are accepted.
fn css_identifier(id: &str) -> Result<&str> {
    let mut chars = id.chars();
    let valid_start = chars
        .next()
        .is_some_and(|first| first.is_ascii_alphabetic() || first == '_');
    if !valid_start || !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_') {
        anyhow::bail!("output div id must be a plain identifier, got: '{id}'");
    }
    Ok(id)
}
