//! Batch Export Simulation Binary
//!
//! This educational binary demonstrates the sequential export engine in
//! action with synthetic documents, a flaky in-memory transport and a
//! console presentation surface.
//!
//! Run with: `cargo run --bin simulate`

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use rand::prelude::*;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use url::Url;

use postbox_exporter::app::{
    BatchConfig, BatchController, DocumentFields, FilenameTemplate, Presentation,
    ResourceResolver, TransferConfig, TransferRequest, Transport, TransportSignal, WaitConfig,
    WorkSource,
};
use postbox_exporter::config::AppConfig;
use postbox_exporter::errors::ExtractionError;

/// Configuration for the simulation
#[derive(Debug, Clone)]
struct SimulationConfig {
    /// Number of synthetic documents to generate
    pub document_count: usize,
    /// Percentage of transport attempts that fail (0.0-1.0)
    pub failure_rate: f64,
    /// Percentage of documents whose link resolves late (0.0-1.0)
    pub slow_resolve_rate: f64,
    /// Minimum simulated transfer time (milliseconds)
    pub min_transfer_time: u64,
    /// Maximum simulated transfer time (milliseconds)
    pub max_transfer_time: u64,
    /// Divisor applied to the configured engine delays (higher = faster)
    pub speed_multiplier: u32,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            document_count: 25,
            failure_rate: 0.15,     // 15% of attempts fail
            slow_resolve_rate: 0.2, // 20% of links appear late
            min_transfer_time: 20,
            max_transfer_time: 150,
            speed_multiplier: 10,
        }
    }
}

/// Divide every engine delay so the simulation finishes in seconds while
/// keeping the configured proportions
fn accelerate(config: BatchConfig, factor: u32) -> BatchConfig {
    let factor = factor.max(1);
    BatchConfig {
        wait: WaitConfig {
            poll_interval: config.wait.poll_interval / factor,
            timeout: config.wait.timeout / factor,
        },
        transfer: TransferConfig {
            retry_delay: config.transfer.retry_delay / factor,
            grace_delay: config.transfer.grace_delay / factor,
            ..config.transfer
        },
        settle_delay: config.settle_delay / factor,
    }
}

/// Synthetic postbox rendering, with reveal state tracked per document
struct SimulatedPostbox {
    documents: Vec<DocumentFields>,
    revealed: Mutex<Vec<bool>>,
}

impl SimulatedPostbox {
    fn generate(config: &SimulationConfig) -> Self {
        let mut rng = thread_rng();
        let categories = ["Kontoauszug", "Depotabrechnung", "Mitteilung", "Steuerbescheinigung"];
        let subjects = [
            "Abrechnung Januar",
            "Jahresübersicht 2023",
            "Änderung der AGB",
            "Zinsanpassung",
            "Quartalsbericht",
        ];

        info!("Generating {} synthetic documents...", config.document_count);
        let documents = (0..config.document_count)
            .map(|i| DocumentFields {
                day: format!("{:02}", rng.gen_range(1..=28)),
                month: format!("{:02}", rng.gen_range(1..=12)),
                year: format!("{}", rng.gen_range(2020..=2024)),
                category: categories[i % categories.len()].to_string(),
                subject: format!("{} Nr. {}", subjects[i % subjects.len()], i + 1),
            })
            .collect::<Vec<_>>();

        let revealed = Mutex::new(vec![false; documents.len()]);
        Self { documents, revealed }
    }

    fn is_revealed(&self, index: usize) -> bool {
        self.revealed.lock().unwrap()[index]
    }
}

#[async_trait]
impl WorkSource for SimulatedPostbox {
    async fn count(&self) -> Result<usize, ExtractionError> {
        Ok(self.documents.len())
    }

    async fn read_fields(&self, index: usize) -> Result<DocumentFields, ExtractionError> {
        self.documents
            .get(index)
            .cloned()
            .ok_or(ExtractionError::MissingField { field: "row" })
    }

    async fn toggle_detail(&self, index: usize) -> Result<(), ExtractionError> {
        let mut revealed = self.revealed.lock().unwrap();
        revealed[index] = !revealed[index];
        debug!(index, revealed = revealed[index], "detail view toggled");
        Ok(())
    }
}

/// Resolver requiring the detail view to be open, with a configurable share
/// of links that only appear after a few polls
struct SimulatedResolver {
    postbox: Arc<SimulatedPostbox>,
    slow_indices: Vec<usize>,
    polls: AtomicU32,
}

impl SimulatedResolver {
    fn new(postbox: Arc<SimulatedPostbox>, config: &SimulationConfig) -> Self {
        let mut rng = thread_rng();
        let slow_indices = (0..postbox.documents.len())
            .filter(|_| rng.gen_bool(config.slow_resolve_rate))
            .collect();
        Self {
            postbox,
            slow_indices,
            polls: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl ResourceResolver for SimulatedResolver {
    async fn try_resolve(&self, index: usize) -> Option<Url> {
        if !self.postbox.is_revealed(index) {
            return None;
        }
        // Slow links appear on the third poll
        if self.slow_indices.contains(&index) {
            let poll = self.polls.fetch_add(1, Ordering::SeqCst);
            if poll % 3 < 2 {
                return None;
            }
        }
        Url::parse(&format!("https://bank.example/postbox/{index}/download")).ok()
    }
}

/// Transport simulating transfer time and a configurable failure rate
struct FlakyTransport {
    config: SimulationConfig,
    attempts: AtomicU32,
    completed: AtomicU32,
}

impl FlakyTransport {
    fn new(config: SimulationConfig) -> Self {
        Self {
            config,
            attempts: AtomicU32::new(0),
            completed: AtomicU32::new(0),
        }
    }
}

#[async_trait]
impl Transport for FlakyTransport {
    async fn attempt(&self, request: &TransferRequest) -> TransportSignal {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let (transfer_time, fails) = {
            let mut rng = thread_rng();
            (
                Duration::from_millis(
                    rng.gen_range(self.config.min_transfer_time..=self.config.max_transfer_time),
                ),
                rng.gen_bool(self.config.failure_rate),
            )
        };
        tokio::time::sleep(transfer_time).await;

        if fails {
            warn!(name = %request.destination_name, "simulated transfer failure");
            TransportSignal::Failed {
                cause: "HTTP 503 - Server overloaded".to_string(),
            }
        } else {
            self.completed.fetch_add(1, Ordering::SeqCst);
            TransportSignal::Completed { status: 200 }
        }
    }
}

/// Console presentation printing label changes and notifications
struct ConsolePresentation;

#[async_trait]
impl Presentation for ConsolePresentation {
    async fn set_trigger_label(&self, label: &str) {
        println!("  [trigger] {label}");
    }

    async fn notify(&self, message: &str) {
        println!("  [notify]  {message}");
    }

    async fn prompt(&self, _message: &str, current: &str) -> Option<String> {
        // Non-interactive simulation keeps the current template
        Some(current.to_string())
    }
}

/// Main simulation function
async fn run_simulation() -> anyhow::Result<()> {
    // Optional config file path as first argument, otherwise the standard
    // locations (creating the default file on first run)
    let config_override = std::env::args().nth(1).map(PathBuf::from);
    if config_override.is_none() {
        AppConfig::initialize_first_run()
            .await
            .context("first-run config initialization failed")?;
    }
    let app_config = AppConfig::load(config_override)
        .await
        .context("loading configuration failed")?;
    app_config.logging.init();

    let config = SimulationConfig::default();
    info!(
        "Starting export simulation with {} documents ({:.0}% flaky transfers)",
        config.document_count,
        config.failure_rate * 100.0
    );

    let postbox = Arc::new(SimulatedPostbox::generate(&config));
    let resolver = Arc::new(SimulatedResolver::new(postbox.clone(), &config));
    let transport = Arc::new(FlakyTransport::new(config.clone()));
    let presentation = Arc::new(ConsolePresentation);

    let (batch_config, _) = app_config.to_runtime_config();
    let batch_config = accelerate(batch_config, config.speed_multiplier);

    let controller = BatchController::new(
        postbox,
        resolver,
        transport.clone(),
        presentation,
        Arc::new(RwLock::new(FilenameTemplate::default())),
        batch_config,
    );

    let summary = controller.run().await.context("simulation run failed")?;

    println!("\nSimulation Results:");
    println!("  Duration:            {:.1?}", summary.duration);
    println!("  Documents processed: {} / {}", summary.processed, summary.total);
    println!("  Recorded errors:     {}", summary.errors.len());
    println!("  Transport attempts:  {}", transport.attempts.load(Ordering::SeqCst));
    println!("  Completed transfers: {}", transport.completed.load(Ordering::SeqCst));
    for entry in &summary.errors {
        println!("    - {entry}");
    }

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    run_simulation().await
}
