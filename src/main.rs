use actix_cors::Cors;
use actix_web::{middleware, web, App, HttpServer};
use school_recommender::config::{LoggingSettings, Settings};
use school_recommender::error::StartupError;
use school_recommender::routes::{self, AppState};
use school_recommender::services::load_recommender;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingSettings) {
    // RUST_LOG wins over the configured level
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_level(true);

    if logging.format == "pretty" {
        subscriber.pretty().init();
    } else {
        subscriber.compact().init();
    }
}

#[actix_web::main]
async fn main() -> Result<(), StartupError> {
    // Load .env file if present
    dotenv::dotenv().ok();

    let settings = Settings::load()?;
    init_logging(&settings.logging);

    info!("Starting school recommendation service...");

    // Catalog and model are mandatory: refuse to start without them
    let recommender = load_recommender(&settings).map_err(|e| {
        error!("Failed to load recommendation inputs: {}", e);
        e
    })?;

    let limits = recommender.limits();
    info!(
        "Recommender ready (default {} / max {} results, timeout {:?}, {} scoring slots)",
        limits.default_limit, limits.max_limit, limits.timeout, limits.max_in_flight
    );

    let app_state = AppState { recommender };

    let host = settings.server.host.clone();
    let port = settings.server.port;

    info!("Starting HTTP server on {}:{}", host, port);

    let mut server = HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(routes::json_config())
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .wrap(middleware::Compress::default())
            .configure(routes::configure_routes)
    });

    if let Some(workers) = settings.server.workers {
        server = server.workers(workers);
    }

    server.bind((host, port))?.run().await?;
    Ok(())
}
