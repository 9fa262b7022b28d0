use std::sync::Arc;

use backend::{
    AppState,
    config::ServiceArgs,
    create_router,
    planner::RoutePlanner,
    store::{JsonFileStore, SegmentStore},
};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "backend=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = ServiceArgs::parse();

    let store = JsonFileStore::new(&args.segments);
    match store.snapshot() {
        Ok(segments) => tracing::info!(
            "serving {} segments from {:?}",
            segments.len(),
            store.path()
        ),
        Err(err) => tracing::warn!("segment store not readable yet: {err}"),
    }

    let router = args.routing.router()?;
    if args.routing.offline {
        tracing::info!("offline mode, gaps are bridged with straight lines");
    } else {
        tracing::info!("external routing via {}", args.routing.osrm_url);
    }
    let planner = RoutePlanner::new(args.routing.planner_config()?, router);
    let config = planner.config();
    tracing::info!(
        "connecting segments within {} m, sampling every {} vertices, greedy fallback {}",
        config.connection_threshold_m,
        config.sampling.stride(),
        if config.greedy_fallback { "on" } else { "off" }
    );

    let state = AppState {
        planner: Arc::new(planner),
        store: Arc::new(store),
    };
    let app = create_router(state);

    tracing::info!("starting backend on http://{}", args.bind);
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
