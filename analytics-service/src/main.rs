use std::env;
use std::net::SocketAddr;

use sqlx::PgPool;
use tokio::net::TcpListener;

use analytics_service::{build_jwt_verifier_from_env, build_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let database_url = env::var("DATABASE_URL")?;
    let db = PgPool::connect(&database_url).await?;

    let jwt_verifier = build_jwt_verifier_from_env()?;
    let state = AppState { db, jwt_verifier };
    let app = build_router(state);

    let host = env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());
    let port: u16 = env::var("PORT")
        .unwrap_or_else(|_| "8083".to_string())
        .parse()?;
    let addr = SocketAddr::new(host.parse()?, port);
    println!("starting analytics-service on {addr}");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
