use chrono::{Duration, NaiveDate, Utc};
use fare_sniper::config::{load_config, AppConfig};
use fare_sniper::model::{
    Observation, PriceSample, RouteDateKey, Station, TrainRoute, TrainType, DEFAULT_CURRENCY,
};
use fare_sniper::storage::{MemoryStore, SqliteStorage};
use fare_sniper::utils::parse_travel_date;
use fare_sniper::{PriceTracker, RecommendationEngine};
use rand::Rng;
use serde::Serialize;
use std::env;
use std::error::Error;
use tracing::{error, info, Level};

const CONFIG_ENV: &str = "FARE_SNIPER_CONFIG";
const DEFAULT_CONFIG: &str = "config.json";

const USAGE: &str = "Usage:
  fare-sniper ingest <origin> <destination> <YYYY-MM-DD> <train-type> <price> [ticket-class] [seats]
  fare-sniper recommend <origin> <destination> <YYYY-MM-DD> <train-type> <price>
  fare-sniper stats <route-key>
  fare-sniper history <route-key>
  fare-sniper prune
  fare-sniper summary
  fare-sniper demo";

fn main() {
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Panic occurred: {:?}", panic_info);
    }));

    let config = match resolve_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Config load error: {}", e);
            std::process::exit(2);
        }
    };

    tracing_subscriber::fmt()
        .with_max_level(config.log_level.parse::<Level>().unwrap_or(Level::INFO))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = env::args().skip(1).collect();
    if let Err(e) = handle_command(&args, &config) {
        error!("{}", e);
        std::process::exit(1);
    }
}

/// An explicit config path must load; the default path is optional.
fn resolve_config() -> Result<AppConfig, Box<dyn Error>> {
    match env::var(CONFIG_ENV) {
        Ok(path) => Ok(load_config(path)?),
        Err(_) if std::path::Path::new(DEFAULT_CONFIG).exists() => Ok(load_config(DEFAULT_CONFIG)?),
        Err(_) => Ok(AppConfig::default()),
    }
}

fn handle_command(args: &[String], config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let command = args.first().map(String::as_str).unwrap_or("help");
    match command {
        "ingest" => {
            let route = route_from_args(args.get(1..5).ok_or(USAGE)?)?;
            let price: f64 = args.get(5).ok_or(USAGE)?.parse()?;
            let ticket_class = args.get(6).map(String::as_str).unwrap_or("Turista");
            let seats = args.get(7).map(|s| s.parse::<u32>()).transpose()?.unwrap_or(0);
            let sample = PriceSample::new(price, DEFAULT_CURRENCY, ticket_class, seats, Utc::now())?;

            let mut tracker = open_tracker(config)?;
            let key = route.key();
            let id = tracker.ingest(Observation { route, sample })?;
            print_json(&serde_json::json!({ "record_id": id, "route_key": key }))
        }
        "recommend" => {
            let route = route_from_args(args.get(1..5).ok_or(USAGE)?)?;
            let price: f64 = args.get(5).ok_or(USAGE)?.parse()?;

            let mut tracker = open_tracker(config)?;
            let result = tracker.recommend(&route, price, None)?;
            info!(
                "{} for {} at {:.2} € (confidence {:.0}%)",
                result.recommendation,
                result.route_key,
                price,
                result.confidence * 100.0
            );
            if !result.is_confident(tracker.engine().policy().confidence_threshold) {
                info!("Low confidence, treat this as a hint only");
            }
            print_json(&result)
        }
        "stats" => {
            let key = RouteDateKey::from_raw(args.get(1).ok_or(USAGE)?.as_str());
            let mut tracker = open_tracker(config)?;
            match tracker.statistics(&key) {
                Some(stats) => print_json(&stats),
                None => {
                    info!("No price history for {}", key);
                    Ok(())
                }
            }
        }
        "history" => {
            let key = RouteDateKey::from_raw(args.get(1).ok_or(USAGE)?.as_str());
            let storage = SqliteStorage::new(&config.db_path)?;
            let samples = storage.query_since(&key, config.history_days, Utc::now())?;
            print_json(&samples)
        }
        "prune" => {
            let storage = SqliteStorage::new(&config.db_path)?;
            let deleted = storage.prune_older_than(config.retention_days, Utc::now())?;
            print_json(&serde_json::json!({ "deleted": deleted }))
        }
        "summary" => {
            let storage = SqliteStorage::new(&config.db_path)?;
            print_json(&serde_json::json!({
                "counts": storage.database_stats()?,
                "routes": storage.route_keys()?,
            }))
        }
        "demo" => run_demo(config),
        _ => {
            println!("{}", USAGE);
            Ok(())
        }
    }
}

fn open_tracker(config: &AppConfig) -> Result<PriceTracker<SqliteStorage>, Box<dyn Error>> {
    let storage = SqliteStorage::new(&config.db_path)?;
    Ok(PriceTracker::new(storage, RecommendationEngine::new(config.policy.clone())))
}

/// Builds a route from `<origin> <destination> <date> <train-type>`; times are unknown on the CLI.
fn route_from_args(args: &[String]) -> Result<TrainRoute, Box<dyn Error>> {
    let [origin, destination, date, train_type] = args else {
        return Err(USAGE.into());
    };
    let travel_date = parse_travel_date(date)?;
    Ok(midnight_route(
        Station::from_code(origin)?,
        Station::from_code(destination)?,
        travel_date,
        train_type.parse()?,
    ))
}

fn midnight_route(origin: Station, destination: Station, travel_date: NaiveDate, train_type: TrainType) -> TrainRoute {
    let departure = travel_date.and_time(chrono::NaiveTime::MIN);
    TrainRoute {
        origin,
        destination,
        departure,
        arrival: departure,
        train_type,
        train_number: "CLI".to_string(),
    }
}

/// Seeds an in-memory tracker with a jittered, slowly falling series and asks for advice.
fn run_demo(config: &AppConfig) -> Result<(), Box<dyn Error>> {
    let mut rng = rand::rng();
    let mut tracker = PriceTracker::new(MemoryStore::new(), RecommendationEngine::new(config.policy.clone()));
    let travel_date = Utc::now().date_naive() + Duration::days(21);
    let route = midnight_route(
        Station::new("MADRI", "Madrid-Puerta de Atocha", "Madrid")?,
        Station::new("BCNSA", "Barcelona-Sants", "Barcelona")?,
        travel_date,
        TrainType::Ave,
    );

    let start = Utc::now() - Duration::days(14);
    for day in 0..14 {
        let price = 85.0 - day as f64 * 1.5 + rng.random_range(-6.0..6.0);
        let seats = rng.random_range(5..120);
        let sample = PriceSample::new(price, DEFAULT_CURRENCY, "Turista", seats, start + Duration::days(day))?;
        tracker.ingest(Observation { route: route.clone(), sample })?;
    }

    if let Some(stats) = tracker.statistics(&route.key()) {
        print_json(&stats)?;
    }
    let candidate = rng.random_range(55.0..80.0);
    print_json(&tracker.recommend(&route, candidate, None)?)
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
