//! Infrastructure documentation server: document CRUD with role-based
//! access, account management with password recovery, and a server-rendered
//! read-only view.

pub mod account;
pub mod auth;
pub mod config;
pub mod error;
pub mod logging;
pub mod mailer;
pub mod recovery;
pub mod routes;
pub mod state;
pub mod store;

pub use config::Config;
pub use state::AppState;

/// Build the application router for `state`.
pub fn app(state: AppState) -> axum::Router {
    routes::router(state)
}
