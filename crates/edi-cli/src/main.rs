//! # edi-cli
//!
//! Command-line front end for the EDI structure compiler.
//!
//! `extract` turns saved directory pages into a message structure JSON,
//! `generate` compiles a structure (or an IDOC record list) into a format
//! descriptor, and `run` does both for several documents at once.
//!
//! Exit codes: 0 on success, 2 when some documents of a `run` failed,
//! 3 on fatal errors (bad configuration, unreadable input, unsupported
//! dialect).

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use edi_extract::{FolderSource, MessageRequest};
use edi_format::{Dialect, FormatDescriptor, emit_idoc, records_from_json};
use edi_pipeline::{
    ArtifactWriter, BatchRunner, BatchSummary, Pipeline, PipelineConfig, save_structure,
};
use edi_structure::json::{load_from_file, to_json};
use tracing::info;
use tracing_subscriber::EnvFilter;

const EXIT_REQUEST_FAILED: u8 = 2;
const EXIT_FATAL: u8 = 3;

#[derive(Parser)]
#[command(name = "edi")]
#[command(about = "EDI message structure extraction and format descriptor generation")]
#[command(version)]
struct Cli {
    /// Path to a YAML configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

/// Flags that override single configuration fields
#[derive(Args, Debug, Default)]
struct Overrides {
    /// Spaces per indentation level in segment detail blocks
    #[arg(long, global = true)]
    tab_width: Option<usize>,

    /// Group `max` for structures that give none
    #[arg(long, global = true)]
    default_group_max: Option<String>,

    /// Fragment root referenced by interchange wrappers
    #[arg(long, global = true)]
    fragment_root: Option<String>,

    /// Documents processed at the same time by `run`
    #[arg(long, global = true)]
    max_concurrency: Option<usize>,
}

impl Overrides {
    fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(tab_width) = self.tab_width {
            config = config.tab_width(tab_width);
        }
        if let Some(max) = &self.default_group_max {
            config = config.default_group_max(max.clone());
        }
        if let Some(root) = &self.fragment_root {
            config = config.fragment_root(root.clone());
        }
        if let Some(max) = self.max_concurrency {
            config = config.max_concurrency(max);
        }
        config
    }
}

#[derive(Args, Debug)]
struct SourceArgs {
    /// Folder of saved directory pages (`<revision>/message`, `<revision>/segment`)
    #[arg(short, long)]
    source: PathBuf,

    /// Standard of the documents
    #[arg(long, default_value = "EDIFACT")]
    standard: String,

    /// Directory revision (e.g. D97A)
    #[arg(short, long)]
    revision: String,
}

impl SourceArgs {
    fn request(&self, document: &str) -> MessageRequest {
        MessageRequest::new(&self.standard, &self.revision, document)
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Extract the structure of one message
    Extract {
        #[command(flatten)]
        source: SourceArgs,

        /// Message type (e.g. ORDERS)
        #[arg(short, long)]
        document: String,

        /// Save `<revision>/<document>.json` below this folder instead of printing it
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Generate a format descriptor
    ///
    /// Without --ixpath the message body (IDOC: the whole descriptor) is
    /// printed to stdout.
    Generate {
        /// Structure JSON written by `extract`
        #[arg(short, long, required_unless_present = "records", conflicts_with = "records")]
        input: Option<PathBuf>,

        /// IDOC record list JSON
        #[arg(long, requires = "document")]
        records: Option<PathBuf>,

        /// Message code of the record list (e.g. ORDERS05)
        #[arg(short, long)]
        document: Option<String>,

        /// Target dialect; defaults to the structure's standard
        #[arg(long)]
        dialect: Option<String>,

        /// ixpath working folder to write the artifacts into
        #[arg(long)]
        ixpath: Option<PathBuf>,
    },

    /// Extract and generate several messages
    Run {
        #[command(flatten)]
        source: SourceArgs,

        /// Message types to process
        #[arg(short, long = "document", required = true, num_args = 1..)]
        documents: Vec<String>,

        /// ixpath working folder to write the artifacts into
        #[arg(long)]
        ixpath: PathBuf,

        /// Also save each extracted structure below the configured output folder
        #[arg(long)]
        save_structures: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match execute(cli).await {
        Ok(code) => code,
        Err(err) => {
            eprintln!("ERROR: {err:#}");
            ExitCode::from(EXIT_FATAL)
        }
    }
}

async fn execute(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = load_config(cli.config.as_deref(), &cli.overrides)?;

    match cli.command {
        Commands::Extract { source, document, output } => extract(config, &source, &document, output),
        Commands::Generate { input, records, document, dialect, ixpath } => {
            let pipeline = Pipeline::new(config);
            let descriptor = match (input, records) {
                (Some(input), _) => {
                    let structure = load_from_file(&input)
                        .with_context(|| format!("loading structure {}", input.display()))?;
                    let dialect: Dialect = dialect.as_deref().unwrap_or(&structure.standard).parse()?;
                    pipeline.generate(&structure, dialect)?
                }
                (None, Some(records)) => {
                    let json = std::fs::read_to_string(&records)
                        .with_context(|| format!("reading records {}", records.display()))?;
                    let document = document.context("--document is required with --records")?;
                    emit_idoc(&records_from_json(&json)?, &document)?
                }
                (None, None) => anyhow::bail!("either --input or --records is required"),
            };
            publish(&descriptor, ixpath.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Run { source, documents, ixpath, save_structures } => {
            run(config, &source, documents, &ixpath, save_structures).await
        }
    }
}

fn load_config(path: Option<&Path>, overrides: &Overrides) -> anyhow::Result<PipelineConfig> {
    let config = match path {
        Some(path) => PipelineConfig::from_yaml_file(path)
            .with_context(|| format!("loading configuration {}", path.display()))?,
        None => PipelineConfig::default(),
    };
    let config = overrides.apply(config);
    config.validate()?;
    Ok(config)
}

fn extract(
    config: PipelineConfig,
    source: &SourceArgs,
    document: &str,
    output: Option<PathBuf>,
) -> anyhow::Result<ExitCode> {
    let pipeline = Pipeline::new(config);
    let folder = FolderSource::new(&source.source);
    let extraction = pipeline.extract(&source.request(document), &folder)?;

    match output {
        Some(dir) => {
            save_structure(&dir, &extraction.structure)?;
        }
        None => println!("{}", to_json(&extraction.structure)?),
    }

    eprintln!(
        "Extract summary: nodes={}, skipped={}",
        extraction.structure.segment_count(),
        extraction.skipped.len()
    );
    Ok(ExitCode::SUCCESS)
}

fn publish(descriptor: &FormatDescriptor, ixpath: Option<&Path>) -> anyhow::Result<()> {
    match ixpath {
        Some(folder) => {
            let written = ArtifactWriter::new(folder).write(descriptor)?;
            println!("{}", written.descriptor.display());
            if let Some(body) = written.body {
                println!("{}", body.display());
            }
        }
        None => match &descriptor.body {
            Some(body) => print!("{}", body.content),
            None => print!("{}", descriptor.content),
        },
    }
    Ok(())
}

async fn run(
    config: PipelineConfig,
    source: &SourceArgs,
    documents: Vec<String>,
    ixpath: &Path,
    save_structures: bool,
) -> anyhow::Result<ExitCode> {
    let output_dir = config.output_dir.clone();
    let requests = documents.iter().map(|document| source.request(document)).collect();
    let runner = BatchRunner::new(Pipeline::new(config), Arc::new(FolderSource::new(&source.source)));

    let outcomes = runner.run(requests).await;
    let mut summary = BatchSummary::from_outcomes(&outcomes);
    let writer = ArtifactWriter::new(ixpath);

    for outcome in &outcomes {
        let document = &outcome.request.document;
        let result = match &outcome.result {
            Ok(run) => writer.write(&run.descriptor).and_then(|written| {
                info!("{} -> {}", document, written.descriptor.display());
                if save_structures {
                    save_structure(&output_dir, &run.structure)?;
                }
                Ok(())
            }),
            Err(err) => {
                eprintln!("{document}: {err}");
                continue;
            }
        };
        if let Err(err) = result {
            eprintln!("{document}: {err}");
            summary.succeeded -= 1;
            summary.failed += 1;
        }
    }

    println!(
        "Run summary: succeeded={}, failed={}, skipped={}",
        summary.succeeded, summary.failed, summary.skipped_lines
    );

    if summary.failed > 0 {
        Ok(ExitCode::from(EXIT_REQUEST_FAILED))
    } else {
        Ok(ExitCode::SUCCESS)
    }
}
