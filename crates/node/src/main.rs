use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Serialize;
use strata_core::InstanceDefinition;
use strata_mode::{ContextManager, EventCoordinator};
use strata_persist::SqliteMetaDataStore;
use strata_registry::{spawn_dispatch, DataChangedEvent, DispatchStats};
use strata_store::SimpleDataSourceFactory;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(name = "stratad", version, about = "Strata metadata node")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    #[command(flatten)]
    config: NodeConfig,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum NodeType { Proxy, Jdbc }

#[derive(Args, Debug)]
struct NodeConfig {
    /// SQLite metadata database (default: ~/.strata/strata.db)
    #[arg(long = "db", env = "STRATA_DB_PATH", global = true)]
    db_path: Option<String>,

    #[arg(long = "instance-type", env = "STRATA_INSTANCE_TYPE", value_enum, global = true, default_value_t = NodeType::Proxy)]
    instance_type: NodeType,

    #[arg(long = "ip", env = "STRATA_INSTANCE_IP", global = true, default_value = "127.0.0.1")]
    ip: String,

    #[arg(long = "port", env = "STRATA_INSTANCE_PORT", global = true, default_value_t = 3307)]
    port: u16,

    /// Capacity of the notification queue feeding the coordinator
    #[arg(long = "queue-cap", env = "STRATA_EVENT_QUEUE_CAP", global = true, default_value_t = 1024)]
    queue_cap: usize,
}

impl NodeConfig {
    fn instance(&self) -> InstanceDefinition {
        match self.instance_type {
            NodeType::Proxy => InstanceDefinition::proxy(&self.ip, self.port),
            NodeType::Jdbc => InstanceDefinition::jdbc(),
        }
    }

    fn bootstrap(&self) -> Result<ContextManager> {
        let persist = match self.db_path.as_deref() {
            Some(path) => SqliteMetaDataStore::open(path),
            None => SqliteMetaDataStore::open_default(),
        }
        .context("opening metadata store")?;
        let manager = ContextManager::bootstrap(Arc::new(persist), Arc::new(SimpleDataSourceFactory), self.instance())
            .context("bootstrapping metadata context")?;
        Ok(manager)
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Apply registry notifications read as JSON lines from stdin
    Run,
    /// Print the bootstrapped metadata context
    Snapshot,
}

fn init_tracing() {
    let env = std::env::var("STRATA_LOG").unwrap_or_else(|_| "info".to_string());
    let filter = tracing_subscriber::EnvFilter::from_str(&env).unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics() {
    if let Ok(addr) = std::env::var("STRATA_METRICS_ADDR") {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            warn!(addr = %addr, "invalid STRATA_METRICS_ADDR; expected host:port");
        }
    }
}

#[derive(Debug, Serialize)]
struct SchemaSummary {
    name: String,
    data_sources: Vec<String>,
    rules: Vec<&'static str>,
    tables: Vec<String>,
}

#[derive(Debug, Serialize)]
struct InstanceSummary {
    id: String,
    state: String,
    worker_id: Option<u64>,
    labels: Vec<String>,
}

#[derive(Debug, Serialize)]
struct Summary {
    epoch: u64,
    schemas: Vec<SchemaSummary>,
    global_rules: Vec<&'static str>,
    props: BTreeMap<String, String>,
    instance: InstanceSummary,
}

impl Summary {
    fn of(manager: &ContextManager) -> Self {
        let snap = manager.snapshot();
        let mut schemas: Vec<SchemaSummary> = snap
            .schemas()
            .map(|ctx| SchemaSummary {
                name: ctx.name().to_string(),
                data_sources: ctx.resources().names().map(str::to_string).collect(),
                rules: ctx.rules().rules().iter().map(|r| r.rule_type()).collect(),
                tables: ctx.schema().table_names(),
            })
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        let instance = manager.instance_context();
        Self {
            epoch: snap.epoch(),
            schemas,
            global_rules: snap.global_rules().rules().iter().map(|r| r.rule_type()).collect(),
            props: snap.props().raw().clone(),
            instance: InstanceSummary {
                id: instance.definition().id().to_string(),
                state: instance.current_state().to_string(),
                worker_id: instance.worker_id(),
                labels: instance.labels(),
            },
        }
    }

    fn print(&self, output: Output) -> Result<()> {
        match output {
            Output::Json => println!("{}", serde_json::to_string_pretty(self)?),
            Output::Human => {
                println!("epoch {} • instance {} • {}", self.epoch, self.instance.id, self.instance.state);
                if let Some(id) = self.instance.worker_id {
                    println!("worker id {}", id);
                }
                if !self.instance.labels.is_empty() {
                    println!("labels {}", self.instance.labels.join(","));
                }
                println!("global rules: {}", self.global_rules.join(", "));
                for (k, v) in self.props.iter() {
                    println!("  {} = {}", k, v);
                }
                println!("SCHEMA               DATA SOURCES  RULES  TABLES");
                for s in self.schemas.iter() {
                    println!("{:<20} {:<13} {:<6} {}", s.name, s.data_sources.len(), s.rules.len(), s.tables.len());
                }
            }
        }
        Ok(())
    }
}

/// Feed stdin notifications into the dispatch loop until EOF or Ctrl-C.
async fn run(coordinator: EventCoordinator, queue_cap: usize) -> Result<DispatchStats> {
    let (tx, handle) = spawn_dispatch(coordinator, queue_cap);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut line_no = 0u64;
    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else { break };
                line_no += 1;
                if line.trim().is_empty() {
                    continue;
                }
                match serde_json::from_str::<DataChangedEvent>(&line) {
                    Ok(ev) => {
                        if tx.send(ev).await.is_err() {
                            warn!("dispatch loop stopped; ending input");
                            break;
                        }
                    }
                    Err(e) => warn!(line = line_no, error = %e, "skipping unparsable notification"),
                }
            }
            _ = signal::ctrl_c() => {
                info!("interrupted; draining queued notifications");
                break;
            }
        }
    }
    drop(tx);
    let stats = handle.await.context("dispatch loop panicked")?;
    Ok(stats)
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    init_metrics();
    let cli = Cli::parse();
    let manager = Arc::new(cli.config.bootstrap()?);
    match cli.command {
        Commands::Run => {
            info!(instance = %manager.instance_context().definition().id(), queue_cap = cli.config.queue_cap, "run invoked");
            let stats = run(EventCoordinator::new(manager.clone()), cli.config.queue_cap).await?;
            info!(
                received = stats.received,
                applied = stats.applied,
                skipped = stats.skipped,
                dropped = stats.dropped,
                failed = stats.failed,
                "run finished"
            );
            Summary::of(&manager).print(cli.output)?;
        }
        Commands::Snapshot => Summary::of(&manager).print(cli.output)?,
    }
    Ok(())
}
