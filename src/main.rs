use std::{fs, path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use parcify_carrier::{
    app::{SaveOutcome, ShipmentRegistration},
    domain::{Carrier, Order, Shipment, ShippingRequest, CARRIER_CODE},
    infra::{cache::QuoteCache, debug_log::FileDebugSink, notify::SessionMessages},
    util::settings::{CarrierConfig, MapConfig},
};

#[derive(Parser, Debug)]
#[command(name = "parcify-carrier", version, about = "Parcify personal delivery carrier")]
struct Cli {
    /// Settings file (defaults to settings.json in the config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Quote the Parcify rate for a destination
    Quote {
        #[arg(long)]
        postcode: String,
        #[arg(long, default_value_t = 0.0)]
        subtotal: f64,
        #[arg(long)]
        free_shipping: bool,
    },
    /// Register an order's shipment as a Parcify parcel
    Register {
        /// Order as JSON
        #[arg(long)]
        order: PathBuf,
        /// Host shipment id; retried saves of the same id reuse the registration
        #[arg(long)]
        shipment_id: Option<String>,
        #[arg(long)]
        referer: Option<String>,
        /// Debug log file (defaults to shipping_parcify.log in the data directory)
        #[arg(long)]
        debug_log: Option<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .try_init();
}

fn load_settings(path: Option<&PathBuf>) -> anyhow::Result<MapConfig> {
    match path {
        Some(path) => MapConfig::from_json_file(path)
            .with_context(|| format!("failed to read settings from {}", path.display())),
        None => MapConfig::load_default().context("failed to read default settings"),
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    match run(Cli::parse()).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let settings = load_settings(cli.config.as_ref())?;

    match cli.command {
        Command::Quote {
            postcode,
            subtotal,
            free_shipping,
        } => {
            let carrier = Carrier::new(CarrierConfig::from_source(&settings));
            let request = ShippingRequest {
                dest_postcode: Some(postcode),
                free_shipping,
                base_subtotal_incl_tax: subtotal,
            };
            match carrier.collect_rates(&request) {
                Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
                None => println!("Parcify delivery is not available for this destination."),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Register {
            order,
            shipment_id,
            referer,
            debug_log,
        } => {
            let raw = fs::read_to_string(&order)
                .with_context(|| format!("failed to read order {}", order.display()))?;
            let order: Order = serde_json::from_str(&raw).context("invalid order JSON")?;

            let session = Arc::new(SessionMessages::new());
            let sink = Arc::new(debug_log.map_or_else(FileDebugSink::in_data_dir, FileDebugSink::new));
            let workflow = ShipmentRegistration::connect(
                &settings,
                session.clone(),
                sink,
                QuoteCache::shared(CARRIER_CODE),
            )?;

            let mut shipment = Shipment::new(order.increment_id.clone());
            if let Some(id) = shipment_id {
                shipment = shipment.with_id(id);
            }
            let outcome = workflow
                .on_shipment_save_before(&mut shipment, &order, referer.as_deref())
                .await;

            for notice in session.drain() {
                println!("[{:?}] {}", notice.kind, notice.text);
            }
            for track in shipment.tracks() {
                println!("tracking: {} ({} / {})", track.number, track.carrier_code, track.title);
            }

            Ok(match outcome {
                SaveOutcome::NotApplicable => {
                    println!("Order does not ship with Parcify; nothing to do.");
                    ExitCode::SUCCESS
                }
                SaveOutcome::Proceed { .. } => ExitCode::SUCCESS,
                SaveOutcome::AbortWithRedirect { target } => {
                    println!("Shipment save aborted; redirect to {target}");
                    ExitCode::from(2)
                }
            })
        }
    }
}
