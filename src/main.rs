// warc2offline: convert WARC captures into an offline package.
//
// Exit codes: 0 converted, 100 the archives held nothing to convert, 1 error.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;

use warc2offline::{ConversionSummary, ConvertConfig};

#[derive(Parser)]
#[command(
    name = "warc2offline",
    version,
    about = "Convert WARC captures into a self-contained offline package"
)]
struct Cli {
    /// Output directory (created if missing)
    #[arg(short, long)]
    output: PathBuf,

    /// WARC files to convert (.warc or .warc.gz), read in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// URL of the main page; defaults to the first HTML page captured
    #[arg(short, long)]
    url: Option<String>,

    /// Only keep URLs starting with this domain/prefix (repeatable)
    #[arg(long = "include-domains", value_name = "DOMAIN")]
    include_domains: Vec<String>,

    /// Stylesheet linked from every HTML page
    #[arg(long)]
    custom_css: Option<PathBuf>,

    /// File replacing the bundled header template
    #[arg(long)]
    head_template: Option<PathBuf>,

    /// Directory whose files are copied under the static prefix
    #[arg(long)]
    static_dir: Option<PathBuf>,

    /// JSON file updated with {"written", "total"} after every item
    #[arg(long)]
    progress_file: Option<PathBuf>,

    /// Records rewritten in parallel per batch
    #[arg(long, default_value_t = warc2offline::utils::DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Log debug details
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn into_config(self) -> Result<ConvertConfig> {
        let mut builder = ConvertConfig::builder()
            .output_dir(self.output)
            .inputs(self.inputs)
            .include_domains(self.include_domains)
            .batch_size(self.batch_size);
        if let Some(url) = self.url {
            builder = builder.main_url(url);
        }
        if let Some(path) = self.custom_css {
            builder = builder.custom_css(path);
        }
        if let Some(path) = self.head_template {
            builder = builder.head_template_file(path);
        }
        if let Some(dir) = self.static_dir {
            builder = builder.static_dir(dir);
        }
        if let Some(path) = self.progress_file {
            builder = builder.progress_file(path);
        }
        builder.build()
    }
}

fn run(cli: Cli) -> Result<ConversionSummary> {
    let config = cli.into_config()?;
    Ok(warc2offline::convert(config)?)
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match run(cli) {
        Ok(summary) => ExitCode::from(summary.status.exit_code()),
        Err(e) => {
            log::error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
