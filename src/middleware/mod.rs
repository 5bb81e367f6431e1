//! Composable inbound/outbound interceptors for each call modality.
//!
//! Middlewares are applied in list order: the first listed sees the raw
//! call, the last sits closest to the handler/transport. The chain is
//! flattened once, at `Dispatcher` start, and reused for every call —
//! no per-call allocation beyond the call frame itself.

mod oneway;
mod stream;
mod unary;

pub use oneway::{
    OnewayInbound, OnewayInboundChain, OnewayInboundNext, OnewayOutbound, OnewayOutboundChain,
    OnewayOutboundNext,
};
pub use stream::{
    StreamInbound, StreamInboundChain, StreamInboundNext, StreamOutbound, StreamOutboundChain,
    StreamOutboundNext,
};
pub use unary::{
    UnaryInbound, UnaryInboundChain, UnaryInboundNext, UnaryOutbound, UnaryOutboundChain,
    UnaryOutboundNext,
};
