//! Streaming core: a symmetric send/receive message
//! abstraction for bidirectional streams, with explicit half-close and
//! cancellation semantics.
//!
//! The core does not own a concrete wire transport, but it does need
//! *some* channel to move `StreamMessage`
//! values between a `ClientStream` and a `ServerStream` handle. `duplex`
//! provides an in-process implementation suitable for tests and for a
//! transport that wants to bridge its own framing onto this contract by
//! running a forwarding task on each end.

mod message;
mod meta;

pub use message::StreamMessage;
pub use meta::{RequestMeta, ResponseMeta};

use tokio::sync::{mpsc, oneshot};

use crate::context::Context;
use crate::error::Error;
use crate::headers::Headers;

/// What `ReceiveMessage` can report.
#[derive(Debug)]
pub enum StreamError {
    /// The peer half-closed and there are no more messages to read. The
    /// canonical end-of-stream signal.
    EndOfStream,
    Failed(Error),
}

impl From<Error> for StreamError {
    fn from(e: Error) -> Self {
        StreamError::Failed(e)
    }
}

pub type StreamResult<T> = std::result::Result<T, StreamError>;

const SEND_BUFFER: usize = 16;

/// One item on the underlying channel. A stream ends one of two ways,
/// mirroring HTTP/2's END_STREAM-vs-RST_STREAM distinction: the sender
/// side is simply dropped (`rx.recv()` returns `None`, the clean
/// `EndOfStream` case), or a `Failed` frame is sent as the last item
/// before the sender is dropped, carrying the reason a stream handler
/// bailed out instead of finishing normally.
enum Frame {
    Message(StreamMessage),
    Failed(Error),
}

/// The client's handle on an open stream. Owned by whichever side opened
/// it.
pub struct ClientStream {
    request_meta: RequestMeta,
    response_meta_rx: Option<oneshot::Receiver<Headers>>,
    response_meta: ResponseMeta,
    tx: Option<mpsc::Sender<Frame>>,
    rx: mpsc::Receiver<Frame>,
}

/// The server's handle, passed to the registered stream handler.
pub struct ServerStream {
    request_meta: RequestMeta,
    response_meta_tx: Option<oneshot::Sender<Headers>>,
    tx: Option<mpsc::Sender<Frame>>,
    rx: mpsc::Receiver<Frame>,
}

/// An independent handle onto a `ServerStream`'s send side that can
/// report a terminal error even after the `ServerStream` itself has been
/// moved into a handler and dropped. Obtained via
/// `ServerStream::failure_handle` before handing the stream to a
/// handler.
pub(crate) struct FailureHandle {
    tx: mpsc::Sender<Frame>,
}

impl FailureHandle {
    pub(crate) async fn fail(self, ctx: &mut Context, err: Error) -> crate::Result<()> {
        send_frame(ctx, &mut Some(self.tx), Frame::Failed(err)).await
    }
}

/// Build an in-process client/server stream pair sharing `request_meta`.
/// A transport bridging to the wire runs a task on each end that copies
/// `StreamMessage`s to/from the real connection through this pair.
pub fn duplex(request_meta: RequestMeta) -> (ClientStream, ServerStream) {
    let (c2s_tx, c2s_rx) = mpsc::channel(SEND_BUFFER);
    let (s2c_tx, s2c_rx) = mpsc::channel(SEND_BUFFER);
    let (meta_tx, meta_rx) = oneshot::channel();

    let client = ClientStream {
        request_meta: request_meta.clone(),
        response_meta_rx: Some(meta_rx),
        response_meta: ResponseMeta::default(),
        tx: Some(c2s_tx),
        rx: s2c_rx,
    };
    let server = ServerStream {
        request_meta,
        response_meta_tx: Some(meta_tx),
        tx: Some(s2c_tx),
        rx: c2s_rx,
    };
    (client, server)
}

async fn send_frame(ctx: &mut Context, tx: &mut Option<mpsc::Sender<Frame>>, frame: Frame) -> crate::Result<()> {
    let sender = tx
        .as_ref()
        .ok_or_else(|| Error::cancelled("send on a stream half already closed by this side"))?;
    tokio::select! {
        biased;
        done = ctx.cancelled_or_expired() => {
            match done {
                Some(crate::context::ContextDone::DeadlineExceeded) => {
                    Err(Error::deadline_exceeded("stream send deadline exceeded"))
                }
                _ => Err(Error::cancelled("stream send cancelled")),
            }
        }
        result = sender.send(frame) => {
            result.map_err(|_| Error::unavailable("stream peer dropped its receive side"))
        }
    }
}

async fn send_message(
    ctx: &mut Context,
    tx: &mut Option<mpsc::Sender<Frame>>,
    msg: StreamMessage,
) -> crate::Result<()> {
    send_frame(ctx, tx, Frame::Message(msg)).await
}

async fn receive_message(ctx: &mut Context, rx: &mut mpsc::Receiver<Frame>) -> StreamResult<StreamMessage> {
    let frame = tokio::select! {
        biased;
        done = ctx.cancelled_or_expired() => {
            return match done {
                Some(crate::context::ContextDone::DeadlineExceeded) => {
                    Err(StreamError::Failed(Error::deadline_exceeded("receive_message deadline exceeded")))
                }
                _ => Err(StreamError::Failed(Error::cancelled("receive_message cancelled"))),
            };
        }
        frame = rx.recv() => frame.ok_or(StreamError::EndOfStream)?,
    };
    match frame {
        Frame::Message(msg) => Ok(msg),
        Frame::Failed(e) => Err(StreamError::Failed(e)),
    }
}

impl ClientStream {
    pub fn request_meta(&self) -> &RequestMeta {
        &self.request_meta
    }

    /// Populated once the server's first frame has been observed; empty
    /// beforehand.
    pub fn response_meta(&mut self) -> &ResponseMeta {
        if let Some(rx) = &mut self.response_meta_rx {
            if let Ok(headers) = rx.try_recv() {
                self.response_meta = ResponseMeta { headers };
                self.response_meta_rx = None;
            }
        }
        &self.response_meta
    }

    pub async fn send_message(&mut self, ctx: &mut Context, msg: StreamMessage) -> crate::Result<()> {
        send_message(ctx, &mut self.tx, msg).await
    }

    pub async fn receive_message(&mut self, ctx: &mut Context) -> StreamResult<StreamMessage> {
        let _ = self.response_meta();
        receive_message(ctx, &mut self.rx).await
    }

    /// Half-close the send side. Subsequent `receive_message` calls may
    /// still drain remaining server messages.
    pub fn close(&mut self) {
        self.tx = None;
    }
}

impl ServerStream {
    pub fn request_meta(&self) -> &RequestMeta {
        &self.request_meta
    }

    /// Set response headers before the first `send_message`. Best-effort:
    /// if messages were already sent, this silently has no effect on the
    /// client's already-observed `ResponseMeta`.
    pub fn set_response_headers(&mut self, headers: Headers) {
        if let Some(tx) = self.response_meta_tx.take() {
            let _ = tx.send(headers);
        }
    }

    pub async fn send_message(&mut self, ctx: &mut Context, msg: StreamMessage) -> crate::Result<()> {
        if self.response_meta_tx.is_some() {
            self.set_response_headers(Headers::new());
        }
        send_message(ctx, &mut self.tx, msg).await
    }

    pub async fn receive_message(&mut self, ctx: &mut Context) -> StreamResult<StreamMessage> {
        receive_message(ctx, &mut self.rx).await
    }

    /// Clean half-close from the server, equivalent to a stream handler
    /// returning `Ok(())`.
    pub fn close(&mut self) {
        self.tx = None;
    }

    /// A send-side handle independent of this `ServerStream`, usable to
    /// report a terminal error after this stream has been moved into a
    /// handler and dropped. `None` once this stream is already closed.
    pub(crate) fn failure_handle(&self) -> Option<FailureHandle> {
        self.tx.as_ref().map(|tx| FailureHandle { tx: tx.clone() })
    }
}
