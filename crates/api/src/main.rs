use std::sync::Arc;

use anyhow::Context;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    lotledger_observability::init();

    let jwt_secret = std::env::var("JWT_SECRET").unwrap_or_else(|_| {
        tracing::warn!("JWT_SECRET not set; using insecure dev default");
        "dev-secret".to_string()
    });

    let services = match std::env::var("DATABASE_URL") {
        Ok(url) => lotledger_api::app::services::build_postgres_services(&url)
            .await
            .context("failed to connect to database")?,
        Err(_) => {
            tracing::warn!("DATABASE_URL not set; using in-memory store (data is not persisted)");
            lotledger_api::app::services::build_memory_services()
        }
    };

    let app = lotledger_api::app::build_app(jwt_secret, Arc::new(services));

    let bind_addr = std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {bind_addr}"))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await?;
    Ok(())
}
