//! The [`Transport`] trait.
use std::{
    io,
    task::{Context, Poll},
};

use crate::{
    Result,
    message::{FromEnvelope, Request},
};

/// A buffered stream which can send and receive framed protocol messages.
///
/// The protocol is strictly synchronous; implementors carry at most one
/// in-flight request/response exchange.
pub trait Transport: Unpin {
    /// Poll to flush the underlying io.
    fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>>;

    /// Poll to receive one response.
    ///
    /// Implementor should detect a server-reported error envelope and
    /// return it as [`Err`], no matter which typed response was requested.
    fn poll_recv<R: FromEnvelope>(&mut self, cx: &mut Context) -> Poll<Result<R>>;

    /// Queue one request line.
    ///
    /// Note that this send is buffered, caller must also call
    /// [`poll_flush`][1] or [`flush`][2] afterwards.
    ///
    /// [1]: Transport::poll_flush
    /// [2]: TransportExt::flush
    fn send(&mut self, message: &Request<'_>);
}

impl<T> Transport for &mut T where T: Transport {
    fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        T::poll_flush(self, cx)
    }

    fn poll_recv<R: FromEnvelope>(&mut self, cx: &mut Context) -> Poll<Result<R>> {
        T::poll_recv(self, cx)
    }

    fn send(&mut self, message: &Request<'_>) {
        T::send(self, message);
    }
}

/// An extension trait to provide `Future` API for [`Transport`].
pub trait TransportExt: Transport {
    /// Flush the underlying io.
    fn flush(&mut self) -> impl Future<Output = io::Result<()>> {
        std::future::poll_fn(|cx| self.poll_flush(cx))
    }

    /// Receive one response.
    fn recv<R: FromEnvelope>(&mut self) -> impl Future<Output = Result<R>> {
        std::future::poll_fn(|cx| self.poll_recv(cx))
    }
}

impl<T> TransportExt for T where T: Transport { }
