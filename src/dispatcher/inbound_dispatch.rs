//! The flattened inbound path: middleware chain -> router -> handler.
//!
//! A concrete [`crate::transport::Inbound`] is handed an `Arc<InboundDispatch>`
//! at registration time and calls `handle_unary`/`handle_oneway`/
//! `handle_stream` once it has built a [`Request`] (or [`ServerStream`])
//! out of whatever it read off the wire.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::Error;
use crate::handler::{HandlerSpec, ResponseWriter};
use crate::middleware::{
    OnewayInboundChain, OnewayInboundNext, StreamInboundChain, StreamInboundNext, UnaryInboundChain,
    UnaryInboundNext,
};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;
use crate::stream::ServerStream;

pub struct InboundDispatch {
    router: Arc<std::sync::RwLock<Router>>,
    unary_chain: UnaryInboundChain,
    oneway_chain: OnewayInboundChain,
    stream_chain: StreamInboundChain,
}

impl InboundDispatch {
    pub(crate) fn new(
        router: Arc<std::sync::RwLock<Router>>,
        unary_chain: UnaryInboundChain,
        oneway_chain: OnewayInboundChain,
        stream_chain: StreamInboundChain,
    ) -> Self {
        InboundDispatch {
            router,
            unary_chain,
            oneway_chain,
            stream_chain,
        }
    }

    pub async fn handle_unary(&self, ctx: &mut Context, req: Request) -> crate::Result<Response> {
        struct Terminal<'a> {
            router: &'a std::sync::RwLock<Router>,
        }
        #[async_trait]
        impl<'a> UnaryInboundNext for Terminal<'a> {
            async fn call(
                &self,
                ctx: &mut Context,
                req: Request,
                writer: &mut ResponseWriter,
            ) -> crate::Result<()> {
                let handler = self.router.read().unwrap().choose(&req)?;
                match handler {
                    HandlerSpec::Unary(h) => h.handle(ctx, req, writer).await,
                    _ => Err(Error::invalid_argument(format!(
                        "procedure {:?} is not registered as unary",
                        req.procedure()
                    ))),
                }
            }
        }

        let mut writer = ResponseWriter::new();
        let terminal = Terminal { router: &self.router };
        self.unary_chain.call(ctx, req, &mut writer, &terminal).await?;
        Ok(writer.into_response())
    }

    pub async fn handle_oneway(&self, ctx: &mut Context, req: Request) -> crate::Result<()> {
        struct Terminal<'a> {
            router: &'a std::sync::RwLock<Router>,
        }
        #[async_trait]
        impl<'a> OnewayInboundNext for Terminal<'a> {
            async fn call(&self, ctx: &mut Context, req: Request) -> crate::Result<()> {
                let handler = self.router.read().unwrap().choose(&req)?;
                match handler {
                    HandlerSpec::Oneway(h) => h.handle(ctx, req).await,
                    _ => Err(Error::invalid_argument(format!(
                        "procedure {:?} is not registered as oneway",
                        req.procedure()
                    ))),
                }
            }
        }

        let terminal = Terminal { router: &self.router };
        self.oneway_chain.call(ctx, req, &terminal).await
    }

    pub async fn handle_stream(
        &self,
        ctx: &mut Context,
        stream: ServerStream,
        service: &str,
        procedure: &str,
        encoding: &crate::encoding::Encoding,
    ) -> crate::Result<()> {
        struct Terminal<'a> {
            router: &'a std::sync::RwLock<Router>,
            service: &'a str,
            procedure: &'a str,
            encoding: &'a crate::encoding::Encoding,
        }
        #[async_trait]
        impl<'a> StreamInboundNext for Terminal<'a> {
            async fn call(&self, ctx: &mut Context, stream: ServerStream) -> crate::Result<()> {
                // The router matches on a `Request`-shaped key; streams
                // don't carry a `Request`, so a minimal probe request
                // (empty body) is used purely for procedure resolution.
                let probe = Request::builder()
                    .caller("")
                    .callee(self.service)
                    .procedure(self.procedure)
                    .encoding(self.encoding.clone())
                    .body(Vec::new())?;
                let handler = self.router.read().unwrap().choose(&probe)?;
                match handler {
                    HandlerSpec::Stream(h) => {
                        // Held independently of `stream` so a terminal
                        // error can still reach the client after the
                        // handler has consumed and dropped its copy,
                        // mirroring HTTP/2's RST_STREAM-with-a-reason
                        // path alongside a clean END_STREAM close.
                        let failure_handle = stream.failure_handle();
                        let result = h.handle(ctx, stream).await;
                        if let (Err(e), Some(handle)) = (&result, failure_handle) {
                            let _ = handle.fail(ctx, e.clone()).await;
                        }
                        result
                    }
                    _ => Err(Error::invalid_argument(format!(
                        "procedure {:?} is not registered as streaming",
                        self.procedure
                    ))),
                }
            }
        }

        let terminal = Terminal {
            router: &self.router,
            service,
            procedure,
            encoding,
        };
        self.stream_chain.call(ctx, stream, &terminal).await
    }
}
