pub mod error;
pub mod routes;
pub mod sessions;
pub mod state;
