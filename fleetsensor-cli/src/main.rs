//! FleetSensor CLI - Command-line interface
//!
//! This binary provides a command-line interface to the FleetSensor library:
//! fetching merged sensor data for a vehicle, warming the shared channel
//! catalog, and resetting cached entries.

mod error;

use clap::{Parser, Subcommand};
use error::CliError;
use fleetsensor::config::EngineSettings;
use fleetsensor::engine::{FetchOutcome, TelemetryEngine};
use fleetsensor::logging::init_logging;
use fleetsensor::query::HttpQueryClient;
use fleetsensor::reading::EntityId;
use fleetsensor::store::FileKvStore;

#[derive(Parser)]
#[command(name = "fleetsensor")]
#[command(version = fleetsensor::VERSION)]
#[command(about = "Fetch and cache fleet vehicle sensor telemetry", long_about = None)]
struct Args {
    /// Base URL of the telemetry query service
    #[arg(long, env = "FLEETSENSOR_SERVICE_URL")]
    service_url: String,

    /// Directory for the shared key-value store (catalog, advisory lock)
    #[arg(long, default_value = ".fleetsensor")]
    store_dir: String,

    /// Directory for log files
    #[arg(long, default_value = "logs")]
    log_dir: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch merged sensor data for one vehicle
    Fetch {
        /// Vehicle entity id
        entity: String,

        /// Display name used in log lines
        #[arg(long, default_value = "")]
        name: String,

        /// Return whatever cached data exists even if the attempt finds
        /// nothing new
        #[arg(long)]
        release_stale: bool,

        /// Cache lifetime in seconds
        #[arg(long)]
        lifetime_secs: Option<u64>,
    },
    /// Build (or reuse) the channel catalog and report its size
    Catalog,
    /// Drop cached sensor data
    Reset {
        /// Entity to reset; omit to reset every entry
        entity: Option<String>,
    },
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _guard = match init_logging(&args.log_dir, "fleetsensor.log") {
        Ok(guard) => guard,
        Err(e) => CliError::LoggingInit(e.to_string()).exit(),
    };

    let client = match HttpQueryClient::new(&args.service_url) {
        Ok(client) => client,
        Err(e) => CliError::ClientCreation(e).exit(),
    };
    let store = match FileKvStore::open(&args.store_dir) {
        Ok(store) => store,
        Err(e) => CliError::StoreOpen(e.to_string()).exit(),
    };
    let engine = TelemetryEngine::new(client, store, EngineSettings::default());

    match args.command {
        Command::Fetch {
            entity,
            name,
            release_stale,
            lifetime_secs,
        } => {
            if let Some(secs) = lifetime_secs {
                engine.set_sensor_data_lifetime_secs(secs);
            }
            let entity = EntityId::new(entity);
            if release_stale {
                engine.release_stale_cached_sensor_data_on_next_fetch(&entity);
            }
            let display_name = if name.is_empty() {
                entity.as_str().to_string()
            } else {
                name
            };

            match engine.fetch_cached_sensor_data(&entity, &display_name).await {
                Ok(FetchOutcome::NothingNew) => println!("Nothing new for {display_name}"),
                Ok(outcome @ FetchOutcome::Data(_)) => match serde_json::to_string_pretty(&outcome)
                {
                    Ok(json) => println!("{json}"),
                    Err(e) => CliError::Output(e.to_string()).exit(),
                },
                Err(e) => CliError::Fetch(e).exit(),
            }
        }
        Command::Catalog => match engine.ensure_catalog().await {
            Ok(channels) => println!("Channel catalog ready: {channels} channels"),
            Err(e) => CliError::Catalog(e).exit(),
        },
        Command::Reset { entity } => {
            let entity = entity.map(EntityId::new);
            engine.reset_cache(entity.as_ref()).await;
            match entity {
                Some(entity) => println!("Cache reset for {entity}"),
                None => println!("Cache reset for all entities"),
            }
        }
    }
}
