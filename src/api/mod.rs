//! Portal HTTP API.
//!
//! Routes are nested under `/api/`. Everything except `/api/health` sits
//! behind the session middleware: Auth → Audit → Handler.

pub mod endpoints;
pub mod error;
pub mod middleware;
pub mod router;
pub mod server;
pub mod types;

pub use router::portal_router;
pub use server::{serve_until_interrupted, start_portal_server, PortalServer, ServerSession};
pub use types::ApiContext;
