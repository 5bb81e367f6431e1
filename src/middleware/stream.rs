//! Stream middleware: intercepts the open of a
//! bidirectional stream, analogous to unary/oneway but operating on the
//! `ServerStream`/`ClientStream` handle rather than a request/response
//! pair.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::stream::{ClientStream, RequestMeta, ServerStream};

#[async_trait]
pub trait StreamInboundNext: Send + Sync {
    async fn call(&self, ctx: &mut Context, stream: ServerStream) -> crate::Result<()>;
}

#[async_trait]
pub trait StreamInbound: Send + Sync {
    async fn handle(&self, ctx: &mut Context, stream: ServerStream, next: &dyn StreamInboundNext) -> crate::Result<()>;
}

struct Cursor<'a> {
    middlewares: &'a [Arc<dyn StreamInbound>],
    terminal: &'a dyn StreamInboundNext,
}

#[async_trait]
impl<'a> StreamInboundNext for Cursor<'a> {
    async fn call(&self, ctx: &mut Context, stream: ServerStream) -> crate::Result<()> {
        match self.middlewares.split_first() {
            Some((head, rest)) => {
                let next = Cursor {
                    middlewares: rest,
                    terminal: self.terminal,
                };
                head.handle(ctx, stream, &next).await
            }
            None => self.terminal.call(ctx, stream).await,
        }
    }
}

pub struct StreamInboundChain {
    middlewares: Vec<Arc<dyn StreamInbound>>,
}

impl StreamInboundChain {
    pub fn new(middlewares: Vec<Arc<dyn StreamInbound>>) -> Self {
        StreamInboundChain { middlewares }
    }

    pub async fn call(
        &self,
        ctx: &mut Context,
        stream: ServerStream,
        terminal: &dyn StreamInboundNext,
    ) -> crate::Result<()> {
        let cursor = Cursor {
            middlewares: &self.middlewares,
            terminal,
        };
        cursor.call(ctx, stream).await
    }
}

#[async_trait]
pub trait StreamOutboundNext: Send + Sync {
    async fn call(&self, ctx: &mut Context, meta: RequestMeta) -> crate::Result<ClientStream>;
}

#[async_trait]
pub trait StreamOutbound: Send + Sync {
    async fn handle(
        &self,
        ctx: &mut Context,
        meta: RequestMeta,
        next: &dyn StreamOutboundNext,
    ) -> crate::Result<ClientStream>;
}

struct OutboundCursor<'a> {
    middlewares: &'a [Arc<dyn StreamOutbound>],
    terminal: &'a dyn StreamOutboundNext,
}

#[async_trait]
impl<'a> StreamOutboundNext for OutboundCursor<'a> {
    async fn call(&self, ctx: &mut Context, meta: RequestMeta) -> crate::Result<ClientStream> {
        match self.middlewares.split_first() {
            Some((head, rest)) => {
                let next = OutboundCursor {
                    middlewares: rest,
                    terminal: self.terminal,
                };
                head.handle(ctx, meta, &next).await
            }
            None => self.terminal.call(ctx, meta).await,
        }
    }
}

pub struct StreamOutboundChain {
    middlewares: Vec<Arc<dyn StreamOutbound>>,
}

impl StreamOutboundChain {
    pub fn new(middlewares: Vec<Arc<dyn StreamOutbound>>) -> Self {
        StreamOutboundChain { middlewares }
    }

    pub async fn call(
        &self,
        ctx: &mut Context,
        meta: RequestMeta,
        terminal: &dyn StreamOutboundNext,
    ) -> crate::Result<ClientStream> {
        let cursor = OutboundCursor {
            middlewares: &self.middlewares,
            terminal,
        };
        cursor.call(ctx, meta).await
    }
}
