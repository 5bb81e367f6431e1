//! Oneway (fire-and-forget) middleware.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::request::Request;

#[async_trait]
pub trait OnewayInboundNext: Send + Sync {
    async fn call(&self, ctx: &mut Context, req: Request) -> crate::Result<()>;
}

#[async_trait]
pub trait OnewayInbound: Send + Sync {
    async fn handle(&self, ctx: &mut Context, req: Request, next: &dyn OnewayInboundNext) -> crate::Result<()>;
}

struct Cursor<'a> {
    middlewares: &'a [Arc<dyn OnewayInbound>],
    terminal: &'a dyn OnewayInboundNext,
}

#[async_trait]
impl<'a> OnewayInboundNext for Cursor<'a> {
    async fn call(&self, ctx: &mut Context, req: Request) -> crate::Result<()> {
        match self.middlewares.split_first() {
            Some((head, rest)) => {
                let next = Cursor {
                    middlewares: rest,
                    terminal: self.terminal,
                };
                head.handle(ctx, req, &next).await
            }
            None => self.terminal.call(ctx, req).await,
        }
    }
}

pub struct OnewayInboundChain {
    middlewares: Vec<Arc<dyn OnewayInbound>>,
}

impl OnewayInboundChain {
    pub fn new(middlewares: Vec<Arc<dyn OnewayInbound>>) -> Self {
        OnewayInboundChain { middlewares }
    }

    pub async fn call(&self, ctx: &mut Context, req: Request, terminal: &dyn OnewayInboundNext) -> crate::Result<()> {
        let cursor = Cursor {
            middlewares: &self.middlewares,
            terminal,
        };
        cursor.call(ctx, req).await
    }
}

#[async_trait]
pub trait OnewayOutboundNext: Send + Sync {
    async fn call(&self, ctx: &mut Context, req: Request) -> crate::Result<()>;
}

#[async_trait]
pub trait OnewayOutbound: Send + Sync {
    async fn handle(&self, ctx: &mut Context, req: Request, next: &dyn OnewayOutboundNext) -> crate::Result<()>;
}

struct OutboundCursor<'a> {
    middlewares: &'a [Arc<dyn OnewayOutbound>],
    terminal: &'a dyn OnewayOutboundNext,
}

#[async_trait]
impl<'a> OnewayOutboundNext for OutboundCursor<'a> {
    async fn call(&self, ctx: &mut Context, req: Request) -> crate::Result<()> {
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

pub struct OnewayOutboundChain {
    middlewares: Vec<Arc<dyn OnewayOutbound>>,
}

impl OnewayOutboundChain {
    pub fn new(middlewares: Vec<Arc<dyn OnewayOutbound>>) -> Self {
        OnewayOutboundChain { middlewares }
    }

    pub async fn call(&self, ctx: &mut Context, req: Request, terminal: &dyn OnewayOutboundNext) -> crate::Result<()> {
        let cursor = OutboundCursor {
            middlewares: &self.middlewares,
            terminal,
        };
        cursor.call(ctx, req).await
    }
}
