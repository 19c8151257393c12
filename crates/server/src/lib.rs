//! The HTTP/WebSocket composition root (spec §6 External Interfaces):
//! wires the Job Store, Generator Client, Queue Orchestrator, Delivery
//! Workers, Progress Broadcaster, Generation Coordinator, and Recommendation
//! Cache behind one `axum` router. Everything upstream of this crate is
//! transport-agnostic; this is the only crate that knows about HTTP or
//! WebSocket framing.

pub mod error;
pub mod routes;
pub mod similarity;
pub mod sink;
pub mod state;
pub mod worker_pool;

pub use error::ApiError;
pub use routes::build_router;
pub use state::AppState;
