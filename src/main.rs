//! mforge – command-line manuscript → PDF generator.
//!
//! Input is either a JSON file (a settings object or a full
//! `{ settings, outputFilename }` request), a plain-text manuscript, or one
//! of the bundled samples.

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use manuscript_forge::render::RenderTimeouts;
use manuscript_forge::{
    build_layout, samples, GenerationRequest, ManuscriptSettings, Pipeline, PipelineConfig,
};

#[derive(Parser)]
#[command(name = "mforge")]
#[command(version)]
#[command(about = "Lay out manuscripts and generate print-ready PDFs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a PDF into the output directory
    Generate {
        #[command(flatten)]
        input: InputArgs,

        /// Output file name inside the output directory
        #[arg(short, long, value_name = "NAME")]
        output: Option<String>,

        /// Output directory
        #[arg(long, value_name = "DIR", default_value = "generated-pdfs")]
        out_dir: PathBuf,

        /// TTF/OTF font used for every family
        #[arg(long, value_name = "FILE")]
        font: Option<PathBuf>,

        /// Renderer launch timeout in milliseconds
        #[arg(long, default_value = "15000")]
        launch_timeout_ms: u64,

        /// Renderer conversion timeout in milliseconds
        #[arg(long, default_value = "10000")]
        conversion_timeout_ms: u64,
    },

    /// Print the layout document as JSON without rendering
    Layout {
        #[command(flatten)]
        input: InputArgs,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Delete generated PDFs older than the retention period
    Purge {
        /// Output directory
        #[arg(long, value_name = "DIR", default_value = "generated-pdfs")]
        out_dir: PathBuf,

        /// Retention period in hours
        #[arg(long, default_value = "24")]
        older_than_hours: u64,
    },

    /// List the bundled sample manuscripts
    Samples,
}

#[derive(Args)]
struct InputArgs {
    /// Settings/request JSON or plain-text manuscript
    #[arg(value_name = "FILE", required_unless_present = "sample")]
    file: Option<PathBuf>,

    /// Use a bundled sample instead of a file
    #[arg(long, conflicts_with = "file")]
    sample: Option<String>,

    /// Manuscript title
    #[arg(long)]
    title: Option<String>,

    /// Author name
    #[arg(long)]
    author: Option<String>,

    /// Writing mode: vertical or horizontal
    #[arg(long)]
    writing_mode: Option<String>,

    /// Page size: A4, A5, B5 or B6
    #[arg(long)]
    page_size: Option<String>,

    /// Number of columns (1-3)
    #[arg(long)]
    columns: Option<i64>,
}

impl InputArgs {
    fn load(&self) -> Result<GenerationRequest, String> {
        let mut request = match (&self.sample, &self.file) {
            (Some(name), _) => match samples::by_name(name) {
                Some(content) => GenerationRequest::new(ManuscriptSettings::with_content(content)),
                None => {
                    return Err(format!(
                        "unknown sample '{name}' (available: {})",
                        samples::NAMES.join(", ")
                    ))
                }
            },
            (None, Some(path)) => read_request(path)?,
            (None, None) => return Err("no input file specified".to_string()),
        };

        let s = &mut request.settings;
        if let Some(v) = &self.title {
            s.title = v.clone();
        }
        if let Some(v) = &self.author {
            s.author = v.clone();
        }
        if let Some(v) = &self.writing_mode {
            s.writing_mode = v.clone();
        }
        if let Some(v) = &self.page_size {
            s.page_size = v.clone();
        }
        if let Some(v) = self.columns {
            s.columns = v;
        }
        Ok(request)
    }
}

fn read_request(path: &Path) -> Result<GenerationRequest, String> {
    let text = fs::read_to_string(path)
        .map_err(|e| format!("error reading '{}': {e}", path.display()))?;
    if path.extension().and_then(|e| e.to_str()) != Some("json") {
        return Ok(GenerationRequest::new(ManuscriptSettings::with_content(text)));
    }
    let value: serde_json::Value = serde_json::from_str(&text)
        .map_err(|e| format!("invalid JSON in '{}': {e}", path.display()))?;
    let parsed = if value.get("settings").is_some() {
        serde_json::from_value(value)
    } else {
        serde_json::from_value(value).map(GenerationRequest::new)
    };
    parsed.map_err(|e| format!("invalid request in '{}': {e}", path.display()))
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();
    let result = match cli.command {
        Commands::Generate {
            input,
            output,
            out_dir,
            font,
            launch_timeout_ms,
            conversion_timeout_ms,
        } => input.load().and_then(|mut request| {
            if output.is_some() {
                request.output_filename = output;
            }
            let config = PipelineConfig {
                output_dir: out_dir,
                font_path: font,
                timeouts: RenderTimeouts {
                    launch: Duration::from_millis(launch_timeout_ms),
                    conversion: Duration::from_millis(conversion_timeout_ms),
                },
                ..PipelineConfig::default()
            };
            generate(request, config)
        }),
        Commands::Layout { input, compact } => input.load().and_then(|r| layout(r, compact)),
        Commands::Purge {
            out_dir,
            older_than_hours,
        } => purge(out_dir, older_than_hours),
        Commands::Samples => {
            for name in samples::NAMES {
                println!("{name}");
            }
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

fn generate(request: GenerationRequest, config: PipelineConfig) -> Result<(), String> {
    let pipeline = Pipeline::with_pdf_renderer(config).map_err(|e| e.to_string())?;
    let outcome = pipeline.generate(&request).map_err(|e| e.to_string())?;
    for w in &outcome.warnings {
        eprintln!("Warning: {}", w.message);
    }
    let path = pipeline.store().dir().join(&outcome.filename);
    eprintln!(
        "Wrote '{}' ({} bytes, ~{} page{})",
        path.display(),
        outcome.file_size,
        outcome.estimated_pages,
        if outcome.estimated_pages == 1 { "" } else { "s" }
    );
    Ok(())
}

fn layout(request: GenerationRequest, compact: bool) -> Result<(), String> {
    let layout = build_layout(&request.settings).map_err(|e| e.to_string())?;
    let json = if compact {
        serde_json::to_string(&layout.document)
    } else {
        serde_json::to_string_pretty(&layout.document)
    }
    .map_err(|e| e.to_string())?;
    println!("{json}");
    eprintln!("Estimated pages: {}", layout.estimated_pages);
    for w in &layout.warnings {
        eprintln!("Warning: {}", w.message);
    }
    Ok(())
}

fn purge(out_dir: PathBuf, hours: u64) -> Result<(), String> {
    let store = manuscript_forge::storage::OutputStore::new(out_dir);
    let removed = store
        .purge_older_than(Duration::from_secs(hours * 3600))
        .map_err(|e| e.to_string())?;
    for name in &removed {
        println!("{name}");
    }
    eprintln!("Removed {} file{}", removed.len(), if removed.len() == 1 { "" } else { "s" });
    Ok(())
}
