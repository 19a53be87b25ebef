pub mod reload;
pub mod routes;

pub use routes::{router, AppState};
