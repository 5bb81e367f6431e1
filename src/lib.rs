//! A transport-agnostic RPC core: request/response types, a procedure
//! router, composable middleware, peer management with pluggable
//! choosers, a bidirectional streaming contract, and a dispatcher tying
//! it all together under one lifecycle.
//!
//! No wire protocol ships here — see [`transport`] for the seam a
//! concrete transport (HTTP/1, HTTP/2, a framed binary protocol, ...)
//! implements to plug in.

pub mod body;
pub mod chooser;
pub mod context;
pub mod dispatcher;
pub mod encoding;
pub mod error;
pub mod handler;
pub mod headers;
pub mod lifecycle;
pub mod middleware;
pub mod peer;
pub mod request;
pub mod response;
pub mod router;
pub mod stream;
pub mod transport;

pub use body::Body;
pub use context::{CancelHandle, Context, ContextDone};
pub use dispatcher::{
    ClientConfig, Dispatcher, DispatcherConfig, DispatcherStatus, InboundDispatch, InboundStatus,
    MiddlewareConfig, OutboundSet, OutboundStatus,
};
pub use encoding::Encoding;
pub use error::{Error, ErrorKind, Result};
pub use handler::{HandlerSpec, OnewayFn, OnewayHandler, ResponseWriter, StreamFn, StreamHandler, UnaryFn, UnaryHandler};
pub use headers::Headers;
pub use lifecycle::{Lifecycle, State as LifecycleState};
pub use request::{Builder as RequestBuilder, Request};
pub use response::{ApplicationError, Response};
pub use router::{Procedure, ProcedureDescriptor, Router};
pub use stream::{duplex, ClientStream, RequestMeta, ResponseMeta, ServerStream, StreamError, StreamMessage, StreamResult};

pub use chooser::{Chooser, Picked};
pub use chooser::bound::{BoundChooser, ChooserList, StaticUpdater, Updater};
pub use chooser::fewest_pending::{FewestPendingChooser, FewestPendingConfig};
pub use chooser::round_robin::{RoundRobinChooser, RoundRobinConfig};
pub use chooser::single::SingleChooser;

pub use peer::{ConnStatus, Peer, PeerIdentifier, Subscriber};
pub use peer::list::{ListUpdate, PeerList, UpdateErrors};
pub use peer::pool::PeerPool;

pub use transport::{Inbound, OnewayOutbound as TransportOnewayOutbound, StreamOutbound as TransportStreamOutbound, Transport, TransportCore, UnaryOutbound as TransportUnaryOutbound};

pub use middleware::{
    OnewayInbound, OnewayInboundChain, OnewayInboundNext, OnewayOutbound, OnewayOutboundChain,
    OnewayOutboundNext, StreamInbound, StreamInboundChain, StreamInboundNext, StreamOutbound,
    StreamOutboundChain, StreamOutboundNext, UnaryInbound, UnaryInboundChain, UnaryInboundNext,
    UnaryOutbound, UnaryOutboundChain, UnaryOutboundNext,
};
