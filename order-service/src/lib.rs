pub mod app;
pub mod identity;
pub mod order_handlers;
pub mod repo;
pub mod status;

pub use app::{build_jwt_verifier_from_env, build_router, AppState};
