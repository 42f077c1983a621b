#[allow(clippy::module_inception)]
pub mod routes;

pub use routes::{AppState, app, routes};
