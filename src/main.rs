// ============================================================================
// dualfilter CLI: headless run of both filter streams over one image
// ============================================================================
//
// Built only with the `cli` feature:
//   cargo install --path . --features cli
//
// Usage examples:
//   dualfilter photo.png                      (one full cycle on each stream)
//   dualfilter photo.png --steps 3 --out out/
//   dualfilter photo.jpg --config player.json
//
// The manual stream is stepped synchronously; the automatic stream is driven
// by the ticker at the configured interval. Both results are written with
// `{stem}_{side}_{suffix}.{ext}` names.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::{mpsc, Arc};
use std::time::Duration;

use clap::Parser;
use parking_lot::Mutex;
use tracing_subscriber::EnvFilter;

use dualfilter::ticker::StatusCallback;
use dualfilter::{DualStreamController, PlayerConfig, Side, StatusReport, Ticker};

// ============================================================================
// CLI argument definition (clap Derive)
// ============================================================================

/// Cycle the built-in filters over an image on a manual and an automatic stream.
#[derive(Parser, Debug)]
#[command(name = "dualfilter", version)]
struct CliArgs {
    /// Image to load (PNG, JPEG, BMP or GIF).
    input: PathBuf,

    /// Filters to apply per stream. Defaults to one full cycle of the catalog.
    #[arg(short, long, value_name = "N")]
    steps: Option<usize>,

    /// Directory the filtered images are written to.
    #[arg(short, long, default_value = ".", value_name = "DIR")]
    out: PathBuf,

    /// JSON player configuration (tick interval, export format and suffix).
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("dualfilter=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match run(CliArgs::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(message) => {
            eprintln!("error: {}", message);
            ExitCode::FAILURE
        }
    }
}

fn run(args: CliArgs) -> Result<(), String> {
    let config = match &args.config {
        Some(path) => PlayerConfig::load(path).map_err(|e| e.to_string())?,
        None => PlayerConfig::default(),
    };

    let controller = Arc::new(DualStreamController::new());
    controller
        .load_path(&args.input)
        .map_err(|e| e.to_string())?;
    let steps = args.steps.unwrap_or_else(|| controller.catalog().len());

    // Manual stream: one blocking step per request
    for _ in 0..steps {
        let result = controller.step(Side::Manual);
        println!("{}", StatusReport::from_result(Side::Manual, &result));
        result.map_err(|e| e.to_string())?;
    }

    // Automatic stream: driven by the ticker
    if steps > 0 {
        run_ticks(&controller, &config, steps)?;
    }

    let base = args.input.file_stem().and_then(|s| s.to_str());
    let written = controller
        .save_all(&args.out, base, &config.export)
        .map_err(|e| e.to_string())?;
    for path in written {
        println!("wrote {}", path.display());
    }
    Ok(())
}

fn run_ticks(
    controller: &Arc<DualStreamController>,
    config: &PlayerConfig,
    ticks: usize,
) -> Result<(), String> {
    let (tx, rx) = mpsc::channel::<StatusReport>();
    let tx = Mutex::new(tx);
    let callback: StatusCallback = Arc::new(move |report| {
        let _ = tx.lock().send(report);
    });

    // The ticker stops by itself after dispatching `ticks` filters, and every
    // dispatched tick reports exactly once, after releasing the stream.
    let interval = config.tick_interval();
    let mut ticker = Ticker::start_limited(Arc::clone(controller), interval, ticks, Some(callback))
        .map_err(|e| format!("could not start ticker: {}", e))?;

    let timeout = interval * 4 + Duration::from_secs(30);
    for _ in 0..ticks {
        let report = rx
            .recv_timeout(timeout)
            .map_err(|_| "automatic stream stopped responding".to_string())?;
        println!("{}", report);
        if !report.success {
            ticker.stop();
            return Err(report.error.unwrap_or_else(|| "tick failed".to_string()));
        }
    }
    ticker.stop();
    Ok(())
}
