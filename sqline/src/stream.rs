use bytes::{Buf, BytesMut};
use std::{
    io,
    task::{Context, Poll},
};

use crate::{
    Result,
    common::verbose,
    connection::Config,
    message::{self, FromEnvelope, Request},
    net::Socket,
    transport::Transport,
};

const DEFAULT_BUF_CAPACITY: usize = 1024;

/// Buffered newline-framed connection to the server.
///
/// Every message, in either direction, is one `\n` terminated JSON line.
#[derive(Debug)]
pub(crate) struct LineStream {
    socket: Socket,
    read_buf: BytesMut,
    write_buf: BytesMut,
    read_timeout: Option<std::time::Duration>,
    #[cfg(feature = "tokio")]
    deadline: Option<std::pin::Pin<Box<tokio::time::Sleep>>>,
}

impl LineStream {
    pub async fn connect(config: &Config) -> Result<LineStream> {
        let socket = Socket::connect_tcp(config.host(), config.port()).await?;

        Ok(LineStream {
            socket,
            read_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            write_buf: BytesMut::with_capacity(DEFAULT_BUF_CAPACITY),
            read_timeout: config.read_timeout(),
            #[cfg(feature = "tokio")]
            deadline: None,
        })
    }

    pub fn poll_shutdown(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        #[cfg(feature = "tokio")]
        {
            use std::pin::Pin;
            tokio::io::AsyncWrite::poll_shutdown(Pin::new(&mut self.socket), cx)
        }

        #[cfg(not(feature = "tokio"))]
        {
            let _ = cx;
            panic!("runtime disabled")
        }
    }
}

impl Transport for LineStream {
    fn send(&mut self, message: &Request<'_>) {
        use bytes::BufMut;

        serde_json::to_writer((&mut self.write_buf).writer(), message)
            .expect("request serialization is infallible");
        self.write_buf.put_u8(b'\n');
        verbose!("queued {message:?}");
    }

    fn poll_flush(&mut self, cx: &mut Context) -> Poll<io::Result<()>> {
        #[cfg(feature = "tokio")]
        {
            use std::{pin::Pin, task::ready};
            use tokio::io::AsyncWrite;

            while self.write_buf.has_remaining() {
                let n = ready!(Pin::new(&mut self.socket).poll_write(cx, self.write_buf.chunk()))?;
                if n == 0 {
                    return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
                }
                self.write_buf.advance(n);
            }

            Pin::new(&mut self.socket).poll_flush(cx)
        }

        #[cfg(not(feature = "tokio"))]
        {
            let _ = cx;
            panic!("runtime disabled")
        }
    }

    fn poll_recv<R: FromEnvelope>(&mut self, cx: &mut Context) -> Poll<Result<R>> {
        #[cfg(feature = "tokio")]
        {
            use std::task::ready;

            loop {
                if let Some(end) = self.read_buf.iter().position(|b| matches!(b, b'\n')) {
                    let line = self.read_buf.split_to(end + 1);
                    self.deadline = None;
                    verbose!("received {} bytes", end + 1);
                    return Poll::Ready(message::decode(&line[..end]));
                }

                if let Some(timeout) = self.read_timeout {
                    let deadline = self
                        .deadline
                        .get_or_insert_with(|| Box::pin(tokio::time::sleep(timeout)));
                    if deadline.as_mut().poll(cx).is_ready() {
                        self.deadline = None;
                        return Poll::Ready(Err(io::Error::from(io::ErrorKind::TimedOut).into()));
                    }
                }

                let read = ready!(poll_read_buf(&mut self.socket, &mut self.read_buf, cx))?;
                if read == 0 {
                    return Poll::Ready(Err(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed before response terminator",
                    )
                    .into()));
                }
            }
        }

        #[cfg(not(feature = "tokio"))]
        {
            let _ = cx;
            panic!("runtime disabled")
        }
    }
}

#[cfg(feature = "tokio")]
fn poll_read_buf(
    socket: &mut Socket,
    buf: &mut BytesMut,
    cx: &mut Context,
) -> Poll<io::Result<usize>> {
    use bytes::BufMut;
    use std::{pin::Pin, task::ready};
    use tokio::io::{AsyncRead, ReadBuf};

    let n = {
        let dst = buf.chunk_mut();
        let dst = unsafe { dst.as_uninit_slice_mut() };
        let mut read_buf = ReadBuf::uninit(dst);
        let ptr = read_buf.filled().as_ptr();
        ready!(AsyncRead::poll_read(Pin::new(socket), cx, &mut read_buf)?);

        // Ensure the pointer does not change from under us
        assert_eq!(ptr, read_buf.filled().as_ptr());
        read_buf.filled().len()
    };

    // Safety: This is guaranteed to be the number of initialized (and read)
    // bytes due to the invariants provided by `ReadBuf::filled`.
    unsafe {
        buf.advance_mut(n);
    }

    Poll::Ready(Ok(n))
}
