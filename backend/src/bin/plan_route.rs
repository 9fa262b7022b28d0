use std::{fs::File, io::BufWriter, path::PathBuf};

use backend::{
    config::{RoutingArgs, parse_coordinate},
    gpx_export::write_route_gpx,
    models::{Coordinate, RouteType, RoutingPreference},
    planner::RoutePlanner,
    store::{JsonFileStore, SegmentStore},
};
use clap::{Parser, ValueEnum};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Preference {
    Fastest,
    Flattest,
    BestRated,
}

impl From<Preference> for RouteType {
    fn from(value: Preference) -> Self {
        match value {
            Preference::Fastest => RouteType::Fastest,
            Preference::Flattest => RouteType::Flattest,
            Preference::BestRated => RouteType::BestRated,
        }
    }
}

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Plan one bike route over a segment file and print it as JSON or GPX"
)]
struct Args {
    /// JSON file with the route segments
    #[arg(long)]
    segments: PathBuf,

    /// Start as "lat,lng"
    #[arg(long, value_parser = parse_coordinate)]
    start: Coordinate,

    /// End as "lat,lng"
    #[arg(long, value_parser = parse_coordinate)]
    end: Coordinate,

    #[arg(long, value_enum, default_value_t = Preference::Fastest)]
    preference: Preference,

    /// Penalise steep segments
    #[arg(long)]
    avoid_steep: bool,

    /// Write a GPX track here instead of printing JSON
    #[arg(long)]
    gpx: Option<PathBuf>,

    #[command(flatten)]
    routing: RoutingArgs,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    let segments = JsonFileStore::new(&args.segments).snapshot()?;
    tracing::info!("loaded {} segments from {:?}", segments.len(), args.segments);

    let planner = RoutePlanner::new(args.routing.planner_config()?, args.routing.router()?);
    let preference = RoutingPreference::new(args.preference.into(), args.avoid_steep);
    let planned = planner
        .plan(&segments, args.start, args.end, preference)
        .await;
    tracing::info!(
        "{} points, {:.2} km, {:.0} min via {:?}",
        planned.path.len(),
        planned.distance_km,
        planned.duration_min,
        planned.strategy
    );

    match &args.gpx {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            write_route_gpx(&planned.path, "radwege route", writer)?;
            tracing::info!("GPX written to {:?}", path);
        }
        None => {
            let response = serde_json::json!({
                "path": planned.path,
                "distance_km": planned.distance_km,
                "duration_min": planned.duration_min,
                "strategy": planned.strategy,
            });
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    Ok(())
}
