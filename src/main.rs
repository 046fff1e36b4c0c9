use anyhow::Result;
use pcmonitor::aggregator::Aggregator;
use pcmonitor::config::{AppConfig, OutputFormat};
use pcmonitor::feed::{self, Feed, FeedReceiver, StopReason};
use pcmonitor::hwmon;
use pcmonitor::render;
use pcmonitor::scheduler::Scheduler;
use pcmonitor::sysinfo_repo::{CounterProvider, SysinfoCounters};
use std::io::BufRead;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// A line typed on stdin.
#[derive(Debug, PartialEq, Eq)]
enum Command {
    SetInterval(u64),
    Quit,
    Unknown(String),
}

fn parse_command(line: &str) -> Option<Command> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    if line.eq_ignore_ascii_case("q") || line.eq_ignore_ascii_case("quit") {
        return Some(Command::Quit);
    }
    Some(match line.parse::<u64>() {
        Ok(secs) => Command::SetInterval(secs),
        Err(_) => Command::Unknown(line.to_string()),
    })
}

/// Reads stdin on a plain thread: a blocking read cannot be cancelled, and
/// a runtime-owned reader would hold up shutdown until the next newline.
fn spawn_stdin_reader() -> mpsc::Receiver<Command> {
    let (tx, rx) = mpsc::channel(8);
    std::thread::spawn(move || {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if let Some(cmd) = parse_command(&line)
                && tx.blocking_send(cmd).is_err()
            {
                break;
            }
        }
    });
    rx
}

/// Presentation sink: prints each snapshot until the feed stops.
async fn present(mut feed: FeedReceiver, format: OutputFormat) -> StopReason {
    while let Some(item) = feed.recv().await {
        match item {
            Feed::Pending => {}
            Feed::Snapshot(snapshot) => match format {
                OutputFormat::Text => println!("{}\n", render::render_text(&snapshot)),
                OutputFormat::Json => match render::render_json(&snapshot) {
                    Ok(line) => println!("{line}"),
                    Err(e) => tracing::warn!(error = %e, "snapshot serialization failed"),
                },
            },
            Feed::Stopped(reason) => return reason,
        }
    }
    StopReason::Requested
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        let mut sigterm =
            match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
                Ok(s) => s,
                Err(_) => {
                    let _ = tokio::signal::ctrl_c().await;
                    return;
                }
            };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let app_config = AppConfig::load()?;
    let sampling = app_config.sampling_config()?;
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        interval_secs = sampling.interval_secs(),
        "starting pcmonitor"
    );

    let counters: Arc<dyn CounterProvider> =
        Arc::new(tokio::task::spawn_blocking(SysinfoCounters::new).await?);
    let hardware = Arc::new(hwmon::system_handle(&app_config.sensors));
    let rules = app_config.sensor_rules();
    let adapter_timeout = app_config.adapter_timeout();
    let aggregator = tokio::task::spawn_blocking(move || {
        Aggregator::new(counters, hardware, rules).with_adapter_timeout(adapter_timeout)
    })
    .await?;

    let (publisher, receiver) = feed::channel();
    let scheduler = Scheduler::start(aggregator, sampling, publisher);
    let mut sink = tokio::spawn(present(receiver, app_config.output.format));
    tracing::info!("type a number (1-60) to change the refresh interval in seconds, q to quit");

    let mut commands = spawn_stdin_reader();
    let mut stdin_open = true;
    let signal = shutdown_signal();
    tokio::pin!(signal);

    loop {
        tokio::select! {
            cmd = commands.recv(), if stdin_open => match cmd {
                Some(Command::SetInterval(secs)) => {
                    if let Err(e) = scheduler.set_interval(secs) {
                        tracing::warn!(error = %e, "interval change rejected");
                    }
                }
                Some(Command::Quit) => break,
                Some(Command::Unknown(input)) => {
                    tracing::warn!(input = %input, "unrecognized command");
                }
                None => stdin_open = false,
            },
            _ = &mut signal => {
                tracing::info!("Received shutdown signal");
                break;
            }
            stopped = &mut sink => {
                let reason = stopped?;
                tracing::error!(reason = ?reason, "monitoring stopped unexpectedly");
                return Err(anyhow::anyhow!("monitoring stopped: {:?}", reason));
            }
        }
    }

    let reason = scheduler.shutdown().await;
    let _ = sink.await;
    tracing::info!(reason = ?reason, "pcmonitor stopped");
    Ok(())
}
