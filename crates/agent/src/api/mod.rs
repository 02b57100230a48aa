mod metrics;
mod reset;
mod server;
mod state;

pub use server::{router, serve};
pub use state::PatrolState;
