//! Failover demo
//!
//! Upserts one fixed row on a simulated backend every interval and
//! triggers a role switchover every few iterations. Each upsert is
//! IDEMPOTENT, so interrupted ones are replayed on the new link and the
//! loop never sees an error.
//!
//! ```text
//! continuity-demo --iterations 20 --interval-ms 200 --switchover-every 5
//! RUST_LOG=continuity_session=debug continuity-demo
//! ```

use anyhow::{anyhow, Context};
use clap::Parser;
use continuity_core::{ContinuityConfig, Endpoint, IdempotencyClass, Outcome, Value};
use continuity_executor::ResilientExecutor;
use continuity_session::{process_counters, StaticEndpoints};
use continuity_sim::SimBackend;
use std::path::PathBuf;
use std::thread;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const UPSERT: &str = "MERGE INTO demo_tac_ac t \
                      USING (SELECT :id id, :note note FROM dual) s \
                      ON (t.id = s.id) \
                      WHEN NOT MATCHED THEN INSERT (id, note) VALUES (s.id, s.note)";

/// CLI arguments
#[derive(Parser, Debug)]
#[command(name = "continuity-demo")]
#[command(about = "Upsert a fixed row while the backend fails over", long_about = None)]
struct Args {
    /// Number of upserts
    #[arg(short = 'n', long, default_value_t = 10)]
    iterations: u64,

    /// Pause between upserts
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Switch the backend over every N iterations (0 disables)
    #[arg(long, default_value_t = 3)]
    switchover_every: u64,

    /// Key of the upserted row
    #[arg(long, default_value_t = 1001)]
    id: i64,

    /// Candidate endpoints, tried in order on reconnection
    #[arg(
        long = "endpoint",
        default_values_t = [
            String::from("//primary-scan:1521/br_tac_svc"),
            String::from("//standby-scan:1521/br_tac_svc"),
        ]
    )]
    endpoints: Vec<String>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let config = match &args.config {
        Some(path) => ContinuityConfig::load(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ContinuityConfig::default(),
    };
    let endpoints = args
        .endpoints
        .iter()
        .map(|s| s.parse::<Endpoint>().with_context(|| format!("endpoint '{}'", s)))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let endpoints = StaticEndpoints::new(endpoints).ok_or_else(|| anyhow!("no endpoints given"))?;

    let backend = SimBackend::new();
    let executor = ResilientExecutor::builder(backend.connector())
        .endpoints(endpoints)
        .confirmation(backend.confirmation())
        .config(config)
        .build()?;
    info!(iterations = args.iterations, "running; switchovers are injected");

    for iteration in 1..=args.iterations {
        if args.switchover_every > 0 && iteration % args.switchover_every == 0 {
            info!(iteration, "switchover");
            backend.switchover();
        }

        let note = format!("RUST-TAC {}", chrono::Utc::now().to_rfc3339());
        let completion = executor.submit(
            UPSERT,
            vec![Value::I64(args.id), Value::from(note.as_str())],
            IdempotencyClass::Idempotent,
        )?;

        match completion.outcome {
            Outcome::Committed => println!("Upserted id={} note={}", args.id, note),
            Outcome::Unknown => println!("Outcome unknown for id={}; check before retrying", args.id),
            _ => {
                let reason = completion
                    .failure
                    .map(|f| f.to_string())
                    .unwrap_or_default();
                println!("Upsert failed for id={}: {}", args.id, reason);
            }
        }

        if iteration < args.iterations {
            thread::sleep(Duration::from_millis(args.interval_ms));
        }
    }

    if let Some(session) = executor.session_id() {
        info!(%session, state = ?executor.state(), "closing session");
    }
    executor.close();
    if let Some(row) = backend.row(args.id) {
        info!(id = args.id, writes = row.writes, "final row");
    }
    println!("{}", serde_json::to_string_pretty(&executor.counters())?);
    info!(totals = ?process_counters(), "done");
    Ok(())
}
