use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use sqlx::PgPool;
use tokio::net::TcpListener;

use payment_service::gateway::HttpGateway;
use payment_service::{build_jwt_verifier_from_env, build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let database_url = env::var("DATABASE_URL")?;
    let db = PgPool::connect(&database_url).await?;

    let jwt_verifier = build_jwt_verifier_from_env()?;
    let gateway_url =
        env::var("PAYMENT_GATEWAY_URL").context("PAYMENT_GATEWAY_URL must be set")?;
    let state = AppState {
        db,
        jwt_verifier,
        gateway: Arc::new(HttpGateway::new(gateway_url)),
    };
    let app = build_router(state);

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8082".to_string())
        .parse()?;
    let addr = SocketAddr::new(host.parse()?, port);
    println!("starting payment-service on {addr}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
