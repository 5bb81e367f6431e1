//! Handler signatures and the tagged `HandlerSpec` variant that replaces
//! dynamic interface dispatch with an explicit discriminant a transport
//! can match on.

use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::headers::Headers;
use crate::request::Request;
use crate::response::{ApplicationError, Response};
use crate::stream::ServerStream;

/// Accumulates what a unary handler wants to send back before the
/// transport serializes and writes it, mirroring an `http::Response`
/// builder handed to the handler instead of returned by it.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    headers: Headers,
    body: Option<Vec<u8>>,
    application_error: Option<ApplicationError>,
}

impl ResponseWriter {
    pub fn new() -> Self {
        ResponseWriter::default()
    }

    pub fn set_header(&mut self, key: impl Into<String>, value: impl Into<String>) -> crate::Result<()> {
        self.headers.insert(key, value)
    }

    pub fn write_body(&mut self, body: impl Into<Vec<u8>>) {
        self.body = Some(body.into());
    }

    pub fn set_application_error(&mut self, error: ApplicationError) {
        self.application_error = Some(error);
    }

    pub(crate) fn into_response(self) -> Response {
        let mut response = Response::new(self.body.unwrap_or_default());
        *response.headers_mut() = self.headers;
        if let Some(err) = self.application_error {
            response.set_application_error(err);
        }
        response
    }
}

#[async_trait]
pub trait UnaryHandler: Send + Sync {
    async fn handle(
        &self,
        ctx: &mut Context,
        req: Request,
        writer: &mut ResponseWriter,
    ) -> crate::Result<()>;
}

#[async_trait]
pub trait OnewayHandler: Send + Sync {
    async fn handle(&self, ctx: &mut Context, req: Request) -> crate::Result<()>;
}

#[async_trait]
pub trait StreamHandler: Send + Sync {
    async fn handle(&self, ctx: &mut Context, stream: ServerStream) -> crate::Result<()>;
}

/// A closure-backed [`UnaryHandler`], so simple handlers don't need a
/// named type.
pub struct UnaryFn<F>(pub F);

#[async_trait]
impl<F, Fut> UnaryHandler for UnaryFn<F>
where
    F: Fn(Context, Request, &mut ResponseWriter) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = crate::Result<()>> + Send,
{
    async fn handle(
        &self,
        ctx: &mut Context,
        req: Request,
        writer: &mut ResponseWriter,
    ) -> crate::Result<()> {
        (self.0)(ctx.clone(), req, writer).await
    }
}

pub struct OnewayFn<F>(pub F);

#[async_trait]
impl<F, Fut> OnewayHandler for OnewayFn<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = crate::Result<()>> + Send,
{
    async fn handle(&self, ctx: &mut Context, req: Request) -> crate::Result<()> {
        (self.0)(ctx.clone(), req).await
    }
}

pub struct StreamFn<F>(pub F);

#[async_trait]
impl<F, Fut> StreamHandler for StreamFn<F>
where
    F: Fn(Context, ServerStream) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = crate::Result<()>> + Send,
{
    async fn handle(&self, ctx: &mut Context, stream: ServerStream) -> crate::Result<()> {
        (self.0)(ctx.clone(), stream).await
    }
}

/// The tagged variant a transport inspects to route unary vs oneway vs
/// stream calls.
#[derive(Clone)]
pub enum HandlerSpec {
    Unary(Arc<dyn UnaryHandler>),
    Oneway(Arc<dyn OnewayHandler>),
    Stream(Arc<dyn StreamHandler>),
}

impl std::fmt::Debug for HandlerSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let tag = match self {
            HandlerSpec::Unary(_) => "Unary",
            HandlerSpec::Oneway(_) => "Oneway",
            HandlerSpec::Stream(_) => "Stream",
        };
        f.debug_tuple("HandlerSpec").field(&tag).finish()
    }
}
