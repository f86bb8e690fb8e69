use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    vitrine_observability::init();

    let config = vitrine_api::config::Config::from_env();
    let bind_addr = config.bind_addr.clone();

    let services = vitrine_api::app::services::build_services(config).await?;
    let app = vitrine_api::app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
