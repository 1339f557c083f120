use std::num::NonZeroUsize;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::error::ErrorKind;
use clap::Parser;
use tracing::error;

use pnm_stencil::logging::setup_logging;
use pnm_stencil::{run, Error, FilterConfig, Narrowing};

/// Apply a chain of 3x3 convolution filters to a binary PNM image.
#[derive(Parser, Debug)]
#[command(name = "pnm-stencil", version)]
struct Cli {
    /// Input image (binary PGM or PPM)
    input: PathBuf,

    /// Output image path
    output: PathBuf,

    /// Filters to apply, in order: smooth, blur, sharpen, mean, emboss
    #[arg(required = true, num_args = 1..)]
    filters: Vec<String>,

    /// Number of workers [default: available hardware threads]
    #[arg(short, long)]
    workers: Option<NonZeroUsize>,

    /// Clamp out-of-range sums to 0..=255 instead of wrapping them
    #[arg(long)]
    saturate: bool,

    /// Log level used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,
}

fn exit_with(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return match e.kind() {
                ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => ExitCode::SUCCESS,
                _ => exit_with(Error::InvalidArgumentCount.exit_code()),
            };
        }
    };

    setup_logging(&cli.log_level);

    let mut config = match cli.workers {
        Some(workers) => FilterConfig::default().with_workers(workers.get()),
        None => FilterConfig::auto(),
    };
    if cli.saturate {
        config = config.with_narrowing(Narrowing::Saturate);
    }

    match run(&cli.input, &cli.output, &cli.filters, &config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            exit_with(e.exit_code())
        }
    }
}
