use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;

use chartsave::core::model::{EmbedOptions, JsonOptions, RenderOptions};
use chartsave::export::vl_convert::ENGINE_NAME;
use chartsave::export::{DefaultConverter, InlineScripts, TemplateConverter, VlConvertBridge};
use chartsave::pipeline::{resolve, save, Resolved, SaveOptions};
use chartsave::{OutputTarget, Spec};

#[derive(Parser, Debug)]
#[command(name = "chartsave")]
#[command(version, about = "Save Vega-Lite chart specifications as JSON, HTML, PNG, SVG, PDF or Vega", long_about = None)]
struct Cli {
    /// Log resolution and converter details
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Render a chart specification to a file
    Save {
        /// Input Vega-Lite JSON file
        input: PathBuf,

        /// Output file, or '-' for stdout (requires --format)
        #[arg(short, long)]
        output: String,

        #[command(flatten)]
        args: SaveArgs,

        /// JSON indentation for json and html output
        #[arg(long)]
        indent: Option<usize>,

        /// Sort object keys in json and html output
        #[arg(long)]
        sort_keys: bool,

        /// Scale factor for png output
        #[arg(long, default_value_t = 1.0)]
        scale_factor: f64,

        /// Conversion engine for png, svg, pdf and vega output
        #[arg(long)]
        engine: Option<String>,

        /// Webdriver name, passed to engines that use one
        #[arg(long)]
        webdriver: Option<String>,

        /// Directory holding vega.js, vega-lite.js and vega-embed.js for --inline
        #[arg(long)]
        inline_scripts: Option<PathBuf>,

        /// Path to the vl-convert executable
        #[arg(long, default_value = ENGINE_NAME)]
        vl_convert: PathBuf,
    },

    /// Show the format and mode a save would use
    Inspect {
        /// Input Vega-Lite JSON file
        input: PathBuf,

        /// Output file the format would be inferred from
        #[arg(short, long)]
        output: Option<String>,

        #[command(flatten)]
        args: SaveArgs,
    },
}

#[derive(clap::Args, Debug)]
struct SaveArgs {
    /// Output format: json, html, png, svg, pdf or vega
    #[arg(short, long)]
    format: Option<String>,

    /// Rendering mode (only vega-lite is supported)
    #[arg(short, long)]
    mode: Option<String>,

    #[arg(long, default_value = "5")]
    vega_version: String,

    #[arg(long, default_value = "5.20.1")]
    vegalite_version: String,

    #[arg(long, default_value = "6")]
    vegaembed_version: String,

    /// vegaEmbed options as a JSON object
    #[arg(long)]
    embed_options: Option<String>,

    /// Inline the vega libraries into html output
    #[arg(long)]
    inline: bool,
}

impl SaveArgs {
    fn to_options(&self) -> Result<SaveOptions> {
        let mut options = SaveOptions::new(&self.vega_version, &self.vegaembed_version)
            .with_vegalite_version(&self.vegalite_version)
            .with_inline(self.inline);
        if let Some(format) = &self.format {
            options = options.with_format(format);
        }
        if let Some(mode) = &self.mode {
            options = options.with_mode(mode);
        }
        if let Some(raw) = &self.embed_options {
            let embed: EmbedOptions =
                serde_json::from_str(raw).with_context(|| "--embed-options must be a JSON object")?;
            options = options.with_embed_options(embed);
        }
        Ok(options)
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut logger = env_logger::Builder::from_env(Env::default().default_filter_or("warn"));
    if cli.verbose {
        logger.filter_level(log::LevelFilter::Debug);
    }
    logger.init();

    match cli.command {
        Commands::Save {
            input,
            output,
            args,
            indent,
            sort_keys,
            scale_factor,
            engine,
            webdriver,
            inline_scripts,
            vl_convert,
        } => {
            let render = RenderOptions {
                webdriver,
                scale_factor,
                engine,
            };
            let options = args
                .to_options()?
                .with_json_options(JsonOptions {
                    indent,
                    sort_keys,
                    ..JsonOptions::default()
                })
                .with_render(render);
            save_chart(input, output, options, inline_scripts, vl_convert)
        }
        Commands::Inspect {
            input,
            output,
            args,
        } => inspect_chart(input, output, args.to_options()?),
    }
}

fn load_spec(input: &Path) -> Result<Spec> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {}", input.display());
    }
    let raw = fs::read_to_string(input)
        .with_context(|| format!("Failed to read: {}", input.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Chart specification is not a JSON object: {}", input.display()))
}

fn save_chart(
    input: PathBuf,
    output: String,
    options: SaveOptions,
    inline_scripts: Option<PathBuf>,
    vl_convert: PathBuf,
) -> Result<()> {
    let spec = load_spec(&input)?;

    let mut html = TemplateConverter::new();
    if let Some(dir) = inline_scripts {
        html = html.with_inline_scripts(InlineScripts::from_dir(&dir)?);
    }
    let images = VlConvertBridge::new(std::env::temp_dir().join("chartsave")).with_program(vl_convert);
    let converter = DefaultConverter::new(html, images);

    let mut stdout = io::stdout().lock();
    let mut target = output_target(&output, &mut stdout);

    let report = save(&spec, &mut target, &options, &converter)
        .with_context(|| format!("Failed to save {} to {output}", input.display()))?;

    if output != "-" {
        println!("[✓] Saved {} ({}) to {output}", input.display(), report.format);
    }
    Ok(())
}

fn inspect_chart(input: PathBuf, output: Option<String>, options: SaveOptions) -> Result<()> {
    let spec = load_spec(&input)?;
    let mut sink = io::sink();
    let target = output_target(output.as_deref().unwrap_or("-"), &mut sink);

    let resolved = resolve(&spec, &target, &options)?;
    print!("{}", inspect_report(&input, &target, &resolved));
    Ok(())
}

/// `-` selects `stream`; anything else is a filename.
fn output_target<'a>(output: &str, stream: &'a mut dyn Write) -> OutputTarget<'a> {
    if output == "-" {
        OutputTarget::stream(stream)
    } else {
        OutputTarget::path(output)
    }
}

fn inspect_report(input: &Path, target: &OutputTarget<'_>, resolved: &Resolved) -> String {
    let mut report = format!(
        "Chart Information\n=================\nFile: {}\nTarget: {target}\nFormat: {}\nMode: {}\n",
        input.display(),
        resolved.format,
        resolved.mode,
    );
    for warning in &resolved.warnings {
        report.push_str(&format!("Warning: {warning}\n"));
    }
    report
}
