use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Context, Result};

use crate::core::model::{Content, ExportFormat, MimeBundle};
use crate::export::{ConvertRequest, Converter};

pub const ENGINE_NAME: &str = "vl-convert";

static NEXT_JOB: AtomicUsize = AtomicUsize::new(0);

/// Renders specs by invoking the `vl-convert` command line tool.
#[derive(Debug, Clone)]
pub struct VlConvertBridge {
    work_dir: PathBuf,
    program: PathBuf,
}

impl VlConvertBridge {
    pub fn new(work_dir: PathBuf) -> Self {
        Self {
            work_dir,
            program: PathBuf::from(ENGINE_NAME),
        }
    }

    pub fn with_program(mut self, program: PathBuf) -> Self {
        self.program = program;
        self
    }

    fn job_paths(&self, format: ExportFormat) -> (PathBuf, PathBuf) {
        let job = NEXT_JOB.fetch_add(1, Ordering::Relaxed);
        let stem = format!("chart-{}-{job}", std::process::id());
        let output_ext = match format {
            ExportFormat::Vega => "vg.json",
            other => other.as_str(),
        };
        (
            self.work_dir.join(format!("{stem}.vl.json")),
            self.work_dir.join(format!("{stem}.{output_ext}")),
        )
    }

    /// Stages the spec, runs the tool and reads its output. Leaves the job
    /// files for the caller to remove.
    fn render(
        &self,
        request: &ConvertRequest<'_>,
        subcommand: &str,
        spec: &[u8],
        input: &Path,
        output: &Path,
    ) -> Result<Content> {
        fs::write(input, spec)
            .with_context(|| format!("failed to stage spec at {}", input.display()))?;
        self.run(request, subcommand, input, output)?;
        let bytes = fs::read(output)
            .with_context(|| format!("{ENGINE_NAME} did not write {}", output.display()))?;
        match request.format {
            ExportFormat::Png | ExportFormat::Pdf => Ok(Content::Binary(bytes)),
            _ => Ok(Content::Text(String::from_utf8(bytes)?)),
        }
    }

    fn run(
        &self,
        request: &ConvertRequest<'_>,
        subcommand: &str,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        let mut command = Command::new(&self.program);
        command
            .arg(subcommand)
            .arg("--input")
            .arg(input)
            .arg("--output")
            .arg(output)
            .arg("--vl-version")
            .arg(vl_version_arg(request.vegalite_version));

        if let Some(render) = request.render {
            if request.format == ExportFormat::Png {
                command.arg("--scale").arg(render.scale_factor.to_string());
            }
            if let Some(webdriver) = &render.webdriver {
                log::debug!("webdriver '{webdriver}' is not used by {ENGINE_NAME}");
            }
        }

        log::debug!("running {} {subcommand}", self.program.display());
        let result = command.output().with_context(|| {
            format!("failed to invoke {}; is vl-convert installed?", self.program.display())
        })?;

        if !result.status.success() {
            let stderr = String::from_utf8_lossy(&result.stderr);
            anyhow::bail!("{ENGINE_NAME} failed: {stderr}");
        }
        Ok(())
    }
}

impl Converter for VlConvertBridge {
    fn convert(&self, request: &ConvertRequest<'_>) -> Result<MimeBundle> {
        if let Some(engine) = request.render.and_then(|render| render.engine.as_deref()) {
            if engine != ENGINE_NAME {
                anyhow::bail!("unsupported conversion engine: '{engine}'");
            }
        }
        let (subcommand, mime) = subcommand_for(request.format, request.vega_version)?;
        let spec = serde_json::to_vec(request.spec)?;

        fs::create_dir_all(&self.work_dir)?;
        let (input, output) = self.job_paths(request.format);
        let outcome = self.render(request, subcommand, &spec, &input, &output);

        let _ = fs::remove_file(&input);
        let _ = fs::remove_file(&output);

        Ok(MimeBundle::new().with(mime, outcome?))
    }
}

fn subcommand_for(format: ExportFormat, vega_version: &str) -> Result<(&'static str, String)> {
    match format {
        ExportFormat::Png => Ok(("vl2png", "image/png".to_string())),
        ExportFormat::Svg => Ok(("vl2svg", "image/svg+xml".to_string())),
        ExportFormat::Pdf => Ok(("vl2pdf", "application/pdf".to_string())),
        ExportFormat::Vega => Ok(("vl2vg", vega_mime(vega_version))),
        other => anyhow::bail!("{ENGINE_NAME} cannot produce '{other}'"),
    }
}

fn vega_mime(vega_version: &str) -> String {
    let major = vega_version
        .trim_start_matches('v')
        .split('.')
        .next()
        .unwrap_or_default();
    format!("application/vnd.vega.v{major}+json")
}

/// vl-convert selects Vega-Lite by `major.minor`.
fn vl_version_arg(version: &str) -> String {
    let version = version.trim_start_matches('v');
    version.split('.').take(2).collect::<Vec<_>>().join(".")
}
