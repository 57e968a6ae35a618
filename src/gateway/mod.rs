//! Client-facing gateway: REST control plane plus WebSocket event stream
//!
//! The gateway stays thin. It authenticates callers, decodes requests and
//! frames, and hands the real work to the match controller and the room
//! multiplexer.

pub mod http;
pub mod messages;
pub mod session;
pub mod ws;

// Re-export commonly used types
pub use http::{build_router, ApiError, GatewayState};
pub use messages::{CreateMatchRequest, ErrorBody, MatchListQuery, SubmitResultRequest};
pub use session::SessionRouter;
