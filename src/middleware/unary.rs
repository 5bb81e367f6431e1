//! Unary inbound/outbound middleware.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::handler::ResponseWriter;
use crate::request::Request;
use crate::response::Response;

/// What a unary inbound middleware sees as "the rest of the chain":
/// either the next middleware or, at the end, the resolved handler.
#[async_trait]
pub trait UnaryInboundNext: Send + Sync {
    async fn call(&self, ctx: &mut Context, req: Request, writer: &mut ResponseWriter) -> crate::Result<()>;
}

/// `(ctx, req, writer, next) -> error`. May transform `ctx`/`req`/`writer`;
/// may call `next` zero or more times; must short-circuit promptly on a
/// cancelled `ctx`.
#[async_trait]
pub trait UnaryInbound: Send + Sync {
    async fn handle(
        &self,
        ctx: &mut Context,
        req: Request,
        writer: &mut ResponseWriter,
        next: &dyn UnaryInboundNext,
    ) -> crate::Result<()>;
}

struct Cursor<'a> {
    middlewares: &'a [Arc<dyn UnaryInbound>],
    terminal: &'a dyn UnaryInboundNext,
}

#[async_trait]
impl<'a> UnaryInboundNext for Cursor<'a> {
    async fn call(&self, ctx: &mut Context, req: Request, writer: &mut ResponseWriter) -> crate::Result<()> {
        match self.middlewares.split_first() {
            Some((head, rest)) => {
                let next = Cursor {
                    middlewares: rest,
                    terminal: self.terminal,
                };
                head.handle(ctx, req, writer, &next).await
            }
            None => self.terminal.call(ctx, req, writer).await,
        }
    }
}

/// A middleware list flattened once at `Dispatcher` start and reused for
/// every call.
pub struct UnaryInboundChain {
    middlewares: Vec<Arc<dyn UnaryInbound>>,
}

impl UnaryInboundChain {
    pub fn new(middlewares: Vec<Arc<dyn UnaryInbound>>) -> Self {
        UnaryInboundChain { middlewares }
    }

    pub async fn call(
        &self,
        ctx: &mut Context,
        req: Request,
        writer: &mut ResponseWriter,
        terminal: &dyn UnaryInboundNext,
    ) -> crate::Result<()> {
        let cursor = Cursor {
            middlewares: &self.middlewares,
            terminal,
        };
        cursor.call(ctx, req, writer).await
    }
}

/// What a unary outbound middleware sees as "the rest of the chain".
#[async_trait]
pub trait UnaryOutboundNext: Send + Sync {
    async fn call(&self, ctx: &mut Context, req: Request) -> crate::Result<Response>;
}

/// `(ctx, req, next) -> (response, error)`.
#[async_trait]
pub trait UnaryOutbound: Send + Sync {
    async fn handle(
        &self,
        ctx: &mut Context,
        req: Request,
        next: &dyn UnaryOutboundNext,
    ) -> crate::Result<Response>;
}

struct OutboundCursor<'a> {
    middlewares: &'a [Arc<dyn UnaryOutbound>],
    terminal: &'a dyn UnaryOutboundNext,
}

#[async_trait]
impl<'a> UnaryOutboundNext for OutboundCursor<'a> {
    async fn call(&self, ctx: &mut Context, req: Request) -> crate::Result<Response> {
        match self.middlewares.split_first() {
            Some((head, rest)) => {
                let next = OutboundCursor {
                    middlewares: rest,
                    terminal: self.terminal,
                };
                head.handle(ctx, req, &next).await
            }
            None => self.terminal.call(ctx, req).await,
        }
    }
}

pub struct UnaryOutboundChain {
    middlewares: Vec<Arc<dyn UnaryOutbound>>,
}

impl UnaryOutboundChain {
    pub fn new(middlewares: Vec<Arc<dyn UnaryOutbound>>) -> Self {
        UnaryOutboundChain { middlewares }
    }

    pub async fn call(
        &self,
        ctx: &mut Context,
        req: Request,
        terminal: &dyn UnaryOutboundNext,
    ) -> crate::Result<Response> {
        let cursor = OutboundCursor {
            middlewares: &self.middlewares,
            terminal,
        };
        cursor.call(ctx, req).await
    }
}
