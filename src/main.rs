//! shutter-mint CLI
//!
//! Runs either service (coordinator or device backend), drives one-shot
//! capture mints, and manages configuration.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tokio::sync::Mutex;

use shutter_mint::config::{self, ConfigOverrides, GlobalConfig};
use shutter_mint::coordinator;
use shutter_mint::device::{
    CoordinatorClient, DeviceIdentity, DeviceRegistrar, EditionProcessor, MintOrchestrator,
};
use shutter_mint::providers::{DeviceRegistration, HttpAssetStore, HttpProver, RpcLedger};
use shutter_mint::storage::ClaimStore;

#[derive(Parser)]
#[command(name = "shutter-mint", version, about = "Claim coordination for camera-attested NFT captures")]
struct Cli {
    /// Path to the config file (default: ~/.shutter-mint/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Coordinator listen address
    #[arg(long, global = true)]
    bind_addr: Option<String>,

    /// Public base URL for claim links
    #[arg(long, global = true)]
    public_url: Option<String>,

    /// Coordinator URL (device side)
    #[arg(long, global = true)]
    coordinator_url: Option<String>,

    /// Data directory root
    #[arg(long, global = true)]
    data_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the public claim coordinator service
    Coordinator,

    /// Run the device backend (registration, edition poller)
    Device,

    /// Mint a single captured image end to end
    Mint {
        /// Path to the image file
        image: PathBuf,

        /// Hardware signature over the image, if available
        #[arg(long)]
        signature: Option<String>,
    },

    /// Configuration management
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config file
    Init,
    /// Print the effective configuration
    Show,
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let overrides = ConfigOverrides {
        bind_addr: cli.bind_addr.clone(),
        public_base_url: cli.public_url.clone(),
        coordinator_url: cli.coordinator_url.clone(),
        data_dir: cli.data_dir.clone(),
        ..ConfigOverrides::new()
    };

    let cfg = match config::load_config(cli.config.as_deref(), overrides) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Error loading configuration: {}", e);
            process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Coordinator => run_coordinator(&cfg).await,
        Commands::Device => run_device(&cfg).await,
        Commands::Mint { image, signature } => run_mint(&cfg, &image, signature).await,
        Commands::Config { action } => match action {
            ConfigAction::Init => config_init(&cfg, cli.config.as_deref()),
            ConfigAction::Show => config_show(&cfg),
        },
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

async fn run_coordinator(cfg: &GlobalConfig) -> Result<(), Box<dyn std::error::Error>> {
    coordinator::run_server(&cfg.coordinator).await?;
    Ok(())
}

/// Wire up the device backend and run until interrupted
async fn run_device(cfg: &GlobalConfig) -> Result<(), Box<dyn std::error::Error>> {
    let (registrar, processor) = build_device_services(cfg)?;

    let state = registrar.ensure_registered().await?;
    log::info!("✓ Device ready: {}", state);

    let poller = tokio::spawn(processor.run());

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down");
    poller.abort();

    Ok(())
}

async fn run_mint(
    cfg: &GlobalConfig,
    image: &PathBuf,
    signature: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let bytes = std::fs::read(image)?;
    let filename = image
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "capture.jpg".to_string());

    let (registrar, orchestrator) = build_mint_services(cfg)?;
    registrar.ensure_registered().await?;

    let outcome = orchestrator
        .process_capture(&filename, &bytes, signature)
        .await?;

    println!("Claim:     {}", outcome.claim_id);
    println!("Claim URL: {}", outcome.claim_url);
    println!("Token:     {}", outcome.token_id);
    println!("Tx:        {}", outcome.tx_hash);
    println!("CID:       {}", outcome.cid);

    Ok(())
}

fn config_init(
    cfg: &GlobalConfig,
    path: Option<&std::path::Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    config::save_config(cfg, path)?;
    let shown = match path {
        Some(p) => p.display().to_string(),
        None => config::default_config_path()?.display().to_string(),
    };
    println!("✓ Configuration written to {}", shown);
    Ok(())
}

fn config_show(cfg: &GlobalConfig) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(cfg)?);
    Ok(())
}

fn registration_from(cfg: &GlobalConfig) -> DeviceRegistration {
    DeviceRegistration {
        device_address: cfg.device.device_address.clone(),
        public_key: cfg.device.device_public_key.clone(),
        device_id: cfg.device.device_id.clone(),
        camera_id: cfg.device.camera_id.clone(),
        model: None,
        firmware_version: None,
    }
}

fn build_device_services(
    cfg: &GlobalConfig,
) -> Result<(DeviceRegistrar, EditionProcessor), Box<dyn std::error::Error>> {
    let ledger = Arc::new(RpcLedger::new(&cfg.services.ledger_gateway_url));
    let store = Arc::new(Mutex::new(ClaimStore::new(&cfg.device.data_dir)?));
    let coordinator = CoordinatorClient::new(&cfg.services.coordinator_url);

    let registrar = DeviceRegistrar::new(ledger.clone(), store, registration_from(cfg));
    let processor = EditionProcessor::new(
        ledger,
        coordinator,
        Duration::from_secs(cfg.device.poll_interval_secs),
        cfg.device.poll_batch_size,
    );

    Ok((registrar, processor))
}

fn build_mint_services(
    cfg: &GlobalConfig,
) -> Result<(DeviceRegistrar, MintOrchestrator), Box<dyn std::error::Error>> {
    let ledger = Arc::new(RpcLedger::new(&cfg.services.ledger_gateway_url));
    let storage = Arc::new(HttpAssetStore::new(&cfg.services.storage_gateway_url));
    let prover = Arc::new(HttpProver::new(&cfg.services.prover_url));
    let store = Arc::new(Mutex::new(ClaimStore::new(&cfg.device.data_dir)?));
    let coordinator = CoordinatorClient::new(&cfg.services.coordinator_url);

    let registrar =
        DeviceRegistrar::new(ledger.clone(), store.clone(), registration_from(cfg));
    let orchestrator = MintOrchestrator::new(
        storage,
        ledger,
        prover,
        coordinator,
        store,
        DeviceIdentity {
            device_id: cfg.device.device_id.clone(),
            camera_id: cfg.device.camera_id.clone(),
            device_address: cfg.device.device_address.clone(),
            owner_wallet: cfg.device.owner_wallet.clone(),
        },
        cfg.device.max_proof_tasks,
    );

    Ok((registrar, orchestrator))
}
