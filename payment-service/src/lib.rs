pub mod app;
pub mod gateway;
pub mod intent_handlers;
pub mod repo;
pub mod settings;
pub mod verify;

pub use app::{build_jwt_verifier_from_env, build_router, AppState};
