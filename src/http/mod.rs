//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, request ID, tracing, concurrency limit)
//!     → middleware/cors.rs (preflight answered here)
//!     → middleware/authorizer.rs (bearer token verified, subject attached)
//!     → request.rs (body buffered into a BackendRequest)
//!     → [backend handler]
//!     → response.rs (success or error envelope, CORS headers)
//!     → Send to client
//! ```

pub mod middleware;
pub mod request;
pub mod response;
pub mod server;

pub use request::{AUTHENTICATED_SUBJECT, X_REQUEST_ID};
pub use response::CorsHeaders;
pub use server::{GatewayServer, GatewayState, Runtime, ServerError};
