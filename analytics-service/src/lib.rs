pub mod analytics_handlers;
pub mod app;
pub mod rollup;

pub use app::{build_jwt_verifier_from_env, build_router, AppState};
