use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use http_pinger::{
    actors::{
        consumer::{EventConsumer, LogSink, StdoutSink},
        probe::{ProbeContext, http_client, spawn_probes},
    },
    alerts::build_notifier,
    config::{config_path, read_config_file},
    diagnostics::{DEFAULT_PACKET_SIZE, DiagnosticTrigger, SystemTraceroute, TraceOptions},
    source::SourceIdentity,
    targets::load_targets,
    util::get_log_level,
};
use tokio::sync::mpsc;
use tracing::{info, level_filters::LevelFilter, trace};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Set the max time-to-live (max number of hops) used in outgoing probe packets
    #[arg(short = 'm', default_value_t = 20)]
    max_hops: u8,

    /// Set the first used time-to-live, e.g. the first hop
    #[arg(short = 'f', default_value_t = 1)]
    first_hop: u8,

    /// Set the number of probes per "ttl" to nqueries
    #[arg(short = 'q', default_value_t = 1)]
    queries: u8,
}

impl Args {
    fn trace_options(&self) -> TraceOptions {
        TraceOptions {
            max_hops: self.max_hops,
            probes_per_hop: self.queries.max(1),
            first_hop: self.first_hop.max(1),
            packet_size: DEFAULT_PACKET_SIZE,
        }
    }
}

fn init() {
    dotenv::dotenv().ok();

    let level = get_log_level()
        .and_then(|level| LevelFilter::from_str(&level).ok())
        .unwrap_or(LevelFilter::DEBUG);
    let filter = filter::Targets::new().with_target("http_pinger", level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(config_path(|key| std::env::var(key).ok()))?;
    let targets = load_targets(&config.urls_file)?;
    if targets.is_empty() {
        anyhow::bail!("no http(s) targets found in {}", config.urls_file.display());
    }

    let client = http_client(config.timeout())?;
    let source = SourceIdentity::resolve(&client, &config.source_lookup_url)
        .await
        .context("could not determine source identity")?;

    let context = ProbeContext {
        notifier: build_notifier(&config, client.clone()),
        diagnostics: DiagnosticTrigger::new(
            Arc::new(SystemTraceroute::default()),
            args.trace_options(),
            config.trace_timeout(),
        ),
        config: Arc::new(config),
        client,
        source,
    };

    let (event_tx, event_rx) = mpsc::channel(context.config.event_buffer);
    let _handles = spawn_probes(&targets, &context, &event_tx);
    drop(event_tx);

    info!("monitoring {} targets", targets.len());

    EventConsumer::new(event_rx)
        .with_sink(StdoutSink)
        .with_sink(LogSink)
        .run()
        .await;

    Ok(())
}
