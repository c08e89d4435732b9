//! Gateway middleware, outermost first: CORS preflight, then the authorizer.

pub mod authorizer;
pub mod cors;

pub use authorizer::authorizer_middleware;
pub use cors::{is_preflight, preflight_middleware};
