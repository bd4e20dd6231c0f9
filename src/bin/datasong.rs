//! datasong — render a measurement series to a WAV file.

use std::path::PathBuf;
use std::process::ExitCode;

use datasong_core::describe::FALLBACK_DESCRIPTION;
use datasong_core::metadata::{self, DEFAULT_NETWORK, TokenMetadata};
use datasong_core::{OfflineRenderer, Series, SonifyConfig, Style};
use tracing::{error, info};

struct Options {
    series: PathBuf,
    style: Style,
    tempo_seconds: f64,
    config: Option<PathBuf>,
    out: Option<PathBuf>,
    metadata: Option<PathBuf>,
}

fn print_help() {
    println!("Usage: datasong <series.json> [OPTIONS]");
    println!();
    println!("Options:");
    println!("  -s, --style <STYLE>     CYBERPUNK, ETHEREAL or RETRO (default: CYBERPUNK)");
    println!("  -t, --tempo <SECONDS>   Seconds per note (default: 0.25)");
    println!("  -c, --config <FILE>     JSON render configuration");
    println!("  -o, --out <FILE>        WAV output path (default: melody-<style>-<lastSeq>.wav)");
    println!("  -m, --metadata <FILE>   Also write token metadata JSON");
    println!("  -v, --version           Print version");
    println!("  -h, --help              Print this help");
}

/// `Ok(None)` means help or version was printed.
fn parse_args(args: &[String]) -> Result<Option<Options>, String> {
    let mut series = None;
    let mut style = Style::Cyberpunk;
    let mut tempo_seconds = 0.25;
    let mut config = None;
    let mut out = None;
    let mut metadata = None;

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = || {
            args.get(i + 1)
                .cloned()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match flag {
            "--help" | "-h" => {
                print_help();
                return Ok(None);
            }
            "--version" | "-v" => {
                println!("datasong {}", datasong_core::VERSION);
                return Ok(None);
            }
            "--style" | "-s" => style = value()?.parse::<Style>().map_err(|e| format!("{e}"))?,
            "--tempo" | "-t" => {
                tempo_seconds = value()?.parse::<f64>().map_err(|e| format!("invalid tempo: {e}"))?;
            }
            "--config" | "-c" => config = Some(PathBuf::from(value()?)),
            "--out" | "-o" => out = Some(PathBuf::from(value()?)),
            "--metadata" | "-m" => metadata = Some(PathBuf::from(value()?)),
            other if other.starts_with('-') => return Err(format!("unknown option {other}")),
            path => {
                series = Some(PathBuf::from(path));
                i += 1;
                continue;
            }
        }
        i += 2;
    }

    let series = series.ok_or_else(|| "missing <series.json>".to_string())?;
    Ok(Some(Options {
        series,
        style,
        tempo_seconds,
        config,
        out,
        metadata,
    }))
}

#[cfg(feature = "describe")]
fn describe(series: &Series) -> String {
    use datasong_core::describe::{GeminiDescriber, describe_or_fallback};

    let describer = match GeminiDescriber::from_env() {
        Ok(d) => d,
        Err(e) => {
            tracing::warn!(error = %e, "using fallback description");
            return FALLBACK_DESCRIPTION.to_string();
        }
    };
    match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(rt) => rt.block_on(describe_or_fallback(&describer, &series.summary())),
        Err(e) => {
            tracing::warn!(error = %e, "no async runtime, using fallback description");
            FALLBACK_DESCRIPTION.to_string()
        }
    }
}

#[cfg(not(feature = "describe"))]
fn describe(_series: &Series) -> String {
    FALLBACK_DESCRIPTION.to_string()
}

fn run(opts: Options) -> datasong_core::error::Result<()> {
    let config = match &opts.config {
        Some(path) => SonifyConfig::from_path(path)?,
        None => SonifyConfig::default(),
    };
    let series = Series::from_json_str(&std::fs::read_to_string(&opts.series)?)?;
    info!(points = series.len(), style = %opts.style, tempo = opts.tempo_seconds, "loaded series");

    let renderer = OfflineRenderer::new(config)?;
    let file = renderer.render_to_file(&series, opts.style, opts.tempo_seconds)?;

    let out = opts
        .out
        .unwrap_or_else(|| PathBuf::from(metadata::export_file_name(&series, opts.style)));
    std::fs::write(&out, file.as_bytes())?;
    info!(path = %out.display(), bytes = file.len(), "wrote WAV");

    if let Some(path) = opts.metadata {
        let meta = TokenMetadata::build(&series, opts.style, describe(&series), DEFAULT_NETWORK)
            .with_animation_url(file.to_data_uri());
        std::fs::write(&path, meta.to_json_pretty()?)?;
        info!(path = %path.display(), "wrote metadata");
    }
    Ok(())
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("datasong_core=info,datasong=info")),
        )
        .init();

    let args: Vec<String> = std::env::args().collect();
    let opts = match parse_args(&args) {
        Ok(Some(opts)) => opts,
        Ok(None) => return ExitCode::SUCCESS,
        Err(msg) => {
            eprintln!("Error: {msg}");
            print_help();
            return ExitCode::FAILURE;
        }
    };

    match run(opts) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}
