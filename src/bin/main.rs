use clap::Parser;
use log::info;
use speedprobe::config::{DEFAULT_BUFFER_SIZE, DEFAULT_PING_THRESHOLD, DEFAULT_TRIALS, DEFAULT_URL};
use speedprobe::display::{self, Readout};
use speedprobe::{progress, Config, Prober, RunOutcome};
use std::time::Duration;

#[derive(Parser)]
#[command(name = "speedprobe")]
#[command(about = "Measure download speed by repeatedly fetching a file over HTTP", long_about = None)]
#[command(version)]
struct Cli {
    /// URL of the resource to download
    #[arg(default_value = DEFAULT_URL)]
    url: String,

    /// Number of download trials
    #[arg(short = 'n', long, default_value_t = DEFAULT_TRIALS)]
    trials: usize,

    /// Read buffer size in bytes
    #[arg(short = 'l', long, default_value_t = DEFAULT_BUFFER_SIZE)]
    length: usize,

    /// Connect timeout in seconds
    #[arg(long, default_value = "10")]
    connect_timeout: u64,

    /// Per-trial timeout in seconds
    #[arg(short = 't', long, default_value = "60")]
    timeout: u64,

    /// Throughput (Mbps) at or below which live ping is not shown
    #[arg(long, default_value_t = DEFAULT_PING_THRESHOLD)]
    ping_threshold: f64,

    /// Output the final result in JSON format
    #[arg(short = 'J', long)]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config = Config::new(cli.url)
        .with_trials(cli.trials)
        .with_buffer_size(cli.length)
        .with_connect_timeout(Duration::from_secs(cli.connect_timeout))
        .with_trial_timeout(Duration::from_secs(cli.timeout))
        .with_ping_threshold(cli.ping_threshold);

    let ping_threshold = config.ping_threshold;
    let (sender, mut events) = progress::channel();
    let handle = Prober::new(config)?.with_callback(sender).spawn();

    let cancel_token = handle.cancellation_token().clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Interrupted, cancelling run");
            cancel_token.cancel();
        }
    });

    if !cli.json {
        println!("[Trial]  Transfer        Bitrate            Max                Ping");
    }

    while let Some(event) = events.recv().await {
        if cli.json {
            continue;
        }
        let (transfer_val, transfer_unit) = display::scale_bytes(event.bytes);
        let readout = Readout::live(&event, ping_threshold);
        println!(
            "[{:2}/{:2}]  {:6.2} {:>7}  {:6.1} Mbits/sec  {:>16}  {:>6}",
            event.trial,
            event.trials,
            transfer_val,
            transfer_unit,
            event.throughput_mbps,
            readout.max_speed,
            readout.ping
        );
    }

    let outcome = handle.join().await?;

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
    } else {
        print_summary(&outcome);
    }

    Ok(())
}

fn print_summary(outcome: &RunOutcome) {
    let result = &outcome.result;
    let readout = Readout::summary(result);
    let (total_val, total_unit) = display::scale_bytes(result.total_bytes);

    println!("- - - - - - - - - - - - - - - - - - - - - - - - -");
    if outcome.is_cancelled() {
        println!("Run cancelled");
    }
    println!(
        "Trials:     {} completed, {} failed",
        result.completed_trials, result.failed_trials
    );
    println!("Transfer:   {:.2} {}", total_val, total_unit);
    println!("Average:    {} Mbits/sec", readout.speed);
    println!("Max speed:  {}", readout.max_speed);
    println!("Ping:       {}", readout.ping);
}
