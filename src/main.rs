use axum::routing::{get, post, put};
use axum::Router;
use hortfrut_conference_rust::{api, create_pool, AppConfig, ConferenceService};
use std::sync::Arc;
use tower::ServiceBuilder;
use tracing::info;
use tracing_subscriber::fmt::time::ChronoLocal;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Local-time log format
    tracing_subscriber::fmt()
        .with_timer(ChronoLocal::new("%Y-%m-%d %H:%M:%S".to_string()))
        .with_target(true)
        .with_level(true)
        .init();

    let config = AppConfig::from_env();
    info!("Starting server with config: {:?}", config);

    let pool = create_pool(&config.database.url).await?;
    info!("Database pool created");

    let service = Arc::new(ConferenceService::new(pool));

    let app = Router::new()
        .route("/health", get(api::health_check))
        .route(
            "/api/hortfrut/boxes",
            get(api::list_boxes).post(api::create_box),
        )
        .route(
            "/api/hortfrut/boxes/:id",
            put(api::update_box).delete(api::delete_box),
        )
        .route(
            "/api/hortfrut/conferences",
            get(api::list_conferences).post(api::create_conference),
        )
        .route(
            "/api/hortfrut/conferences/:id",
            get(api::get_conference)
                .put(api::update_conference)
                .delete(api::delete_conference),
        )
        .route(
            "/api/hortfrut/conferences/:id/items",
            post(api::import_items),
        )
        .route(
            "/api/hortfrut/conferences/:id/items/:item_id",
            put(api::update_item),
        )
        .route(
            "/api/hortfrut/conferences/:id/finalize",
            post(api::finalize_conference),
        )
        .route(
            "/api/hortfrut/conferences/:id/export",
            get(api::export_conference),
        )
        .layer(ServiceBuilder::new())
        .with_state(service);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
