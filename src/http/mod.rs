//! # HTTP Transport
//!
//! axum surface over the grid engine. Handlers call the synchronous view
//! pipeline directly.

pub mod actor;
pub mod routes;
pub mod server;

pub use actor::{ActorResolver, HeaderActorResolver};
pub use routes::{GridState, HealthResponse};
pub use server::GridServer;
