//! Transport layer — three physical channels for one logical protocol.

pub mod framing;
pub mod http;
pub mod sse;
pub mod stdio;

pub use http::StreamableHttpTransport;
pub use sse::SseTransport;
pub use stdio::StdioTransport;
