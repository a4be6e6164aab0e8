mod acquire;
mod cli;
mod display;
mod sources;

use std::fs;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};

use acquire::{factory, AcquisitionController};

fn main() -> Result<()> {
    env_logger::init();
    sources::register_builtin_sources();

    let matches = cli::build_command().get_matches();
    let session = cli::session_args(&matches);
    let (name, sub_matches) = matches
        .subcommand()
        .context("a data source subcommand is required")?;

    let registration = factory::lookup(name)?;
    let config = cli::source_config_from_matches(&registration.schema, sub_matches);
    let source = factory::create(name, &config)?;

    let mut controller = AcquisitionController::new();
    controller.set_history_seconds(session.history_seconds);
    controller.set_data_source(source)?;
    controller.start()?;

    run_consumer_loop(&controller, &session);

    if let Err(err) = controller.stop() {
        // Keep whatever made it into the buffer before the timeout.
        log::warn!("{err}");
    }

    let snapshot = controller.snapshot()?;
    acquire::save_csv(&snapshot, &session.out)
        .with_context(|| format!("exporting {}", session.out.display()))?;

    if let Some(path) = &session.plot {
        let png = display::render_waveform_png(&snapshot, display::PlotStyle::default())?;
        fs::write(path, png).with_context(|| format!("writing {}", path.display()))?;
    }
    if let Some(path) = &session.fft {
        let spectrum = display::SpectrumBuilder::new(session.fft_size).compute(&snapshot);
        let png = display::render_spectrum_png(&spectrum, display::PlotStyle::default())?;
        fs::write(path, png).with_context(|| format!("writing {}", path.display()))?;
    }
    Ok(())
}

/// The external consumer schedule: periodically snapshot and report until
/// the session deadline passes.
fn run_consumer_loop(controller: &AcquisitionController, session: &cli::SessionArgs) {
    let deadline = Instant::now() + Duration::from_secs_f64(session.seconds.max(0.0));
    let refresh = Duration::from_millis(session.refresh_ms.max(1));
    loop {
        let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
            break;
        };
        thread::sleep(remaining.min(refresh));
        if let Ok(snapshot) = controller.snapshot() {
            log::debug!(
                "capture window: {} samples/channel ({:.2} s)",
                snapshot.len(),
                snapshot.duration_seconds()
            );
        }
    }
}
