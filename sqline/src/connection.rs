//! Database connection.
use std::{
    io,
    task::{Context, Poll},
};

use crate::{
    Result,
    common::debug,
    cursor::Cursor,
    message::{FromEnvelope, Request},
    stream::LineStream,
    transport::Transport,
};

mod config;

pub use config::{Config, ParseError};

/// A single connection to the server.
///
/// Owns the underlying socket exclusively; the socket lives exactly as long
/// as the connection. The protocol is strictly synchronous, one
/// request/response exchange at a time, which the `&mut` receivers enforce.
#[derive(Debug)]
pub struct Connection {
    stream: LineStream,
}

impl Connection {
    /// Connect to `host:port`.
    pub async fn connect(host: &str, port: u16) -> Result<Connection> {
        Self::connect_with(&Config::new(host, port)).await
    }

    /// Connect using explicit configuration.
    pub async fn connect_with(config: &Config) -> Result<Connection> {
        let stream = LineStream::connect(config).await?;
        debug!("connected to {}:{}", config.host(), config.port());
        Ok(Connection { stream })
    }

    /// Connect using configuration from the environment.
    ///
    /// See [`Config::from_env`].
    pub async fn connect_env() -> Result<Connection> {
        Self::connect_with(&Config::from_env()).await
    }

    /// Open a server-side cursor.
    pub async fn cursor(&mut self) -> Result<Cursor<'_, Connection>> {
        Cursor::create(self).await
    }

    /// Gracefully shut the connection down.
    ///
    /// Dropping a connection already releases the socket; `close` in
    /// addition waits for the shutdown handshake. Consuming `self` makes a
    /// double release impossible.
    pub async fn close(mut self) -> Result<()> {
        std::future::poll_fn(|cx| self.stream.poll_shutdown(cx)).await?;
        debug!("connection closed");
        Ok(())
    }
}

impl Transport for Connection {
    fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        self.stream.poll_flush(cx)
    }

    fn poll_recv<R: FromEnvelope>(&mut self, cx: &mut Context) -> Poll<Result<R>> {
        self.stream.poll_recv(cx)
    }

    fn send(&mut self, message: &Request<'_>) {
        self.stream.send(message);
    }
}
