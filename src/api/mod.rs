pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod server;
pub mod websocket;

pub use handlers::AppState;
pub use server::ApiServer;
