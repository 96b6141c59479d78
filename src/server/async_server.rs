use log::{debug, warn};

use super::{log_exit, Server};
use crate::connection::{AsyncConnection, AsyncTransport};
use crate::frame::Frame;
use crate::handshake::Response;
use crate::http::{Hijack, UpgradeRequest};
use crate::message::{Assembler, Event, Message};
use crate::error::Error;

/// Callbacks stay synchronous here. They write with the `queue_*` family
/// of [`AsyncConnection`], and whatever they queue is flushed right
/// after they return. A callback ends the connection with
/// [`AsyncConnection::queue_close`].
impl<IO: AsyncTransport> Server<AsyncConnection<IO>> {
    /// Async version of [`serve`](Self::serve). Run it on a task
    /// per connection, e.g. with `tokio::spawn`.
    pub async fn serve_async<R>(&self, request: R) -> Result<(), Error>
    where
        R: UpgradeRequest + Hijack<Io = IO>,
    {
        let response = self.negotiate(&request)?;
        self.accept_async(request, &response).await
    }

    /// Async version of [`accept`](Self::accept).
    pub async fn accept_async<R>(&self, request: R, response: &Response) -> Result<(), Error>
    where
        R: Hijack<Io = IO>,
    {
        let config = &self.inner.config;

        let hijacked = request.hijack().map_err(|e| {
            warn!("hijack failed: {}", e);
            e
        })?;

        let mut conn = AsyncConnection::with_limits(hijacked, config.buffer_size, config.max_frame_size);
        if let Err(e) = conn.write_handshake(response).await {
            warn!("{}: {}", conn.peer(), e);
            conn.close().await;
            return Err(e);
        }

        debug!(
            "{}: upgraded, protocol={:?}",
            conn.peer(),
            response.protocol.as_deref()
        );

        self.run_async(&mut conn).await
    }

    async fn run_async(&self, conn: &mut AsyncConnection<IO>) -> Result<(), Error> {
        let callbacks = &self.inner.callbacks;
        callbacks.connect(conn);

        let ret = match conn.flush().await {
            Ok(()) => self.dispatch_async(conn).await,
            Err(e) => Err(e),
        };
        callbacks.disconnect(conn);

        let ret = match ret {
            Ok(close) => {
                match close {
                    // a callback has queued its own close already
                    Some(_) if conn.is_closing() => {}
                    Some(payload) if self.inner.config.reply_close => {
                        if let Err(e) = conn.queue_frame(&Frame::close_reply(&payload)) {
                            debug!("{}: close reply: {}", conn.peer(), e);
                        }
                    }
                    _ => {}
                }
                if let Err(e) = conn.flush().await {
                    debug!("{}: final flush: {}", conn.peer(), e);
                }
                Ok(())
            }
            Err(e) => Err(e),
        };

        log_exit(conn.peer(), &ret);
        conn.close().await;
        ret
    }

    async fn dispatch_async(&self, conn: &mut AsyncConnection<IO>) -> Result<Option<Vec<u8>>, Error> {
        let callbacks = &self.inner.callbacks;
        let mut assembler = Assembler::new(self.inner.config.max_message_size);

        loop {
            if conn.is_closing() {
                return Ok(None);
            }

            let frame = conn.read_frame().await?;

            match assembler.push(frame)? {
                None => continue,
                Some(Event::Message(Message::Text(text))) => callbacks.text(conn, text),
                Some(Event::Message(Message::Binary(data))) => callbacks.binary(conn, data),
                Some(Event::Ping(ping)) => conn.queue_frame(&ping.into_pong())?,
                Some(Event::Pong(_)) => continue,
                Some(Event::Close(payload)) => return Ok(Some(payload)),
            }

            conn.flush().await?;
        }
    }
}

#[cfg(test)]
mod test {
    use std::sync::{Arc, Mutex};

    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    use super::*;
    use crate::connection::test::{client_frame, server_frames};
    use crate::error::ProtocolViolation;
    use crate::frame::OpCode;
    use crate::http::Incoming;
    use crate::server::{Callbacks, ServerConfig};

    type Conn = AsyncConnection<DuplexStream>;

    const REQUEST: &[u8] = b"\
        GET /chat HTTP/1.1\r\n\
        Host: example.com\r\n\
        Upgrade: websocket\r\n\
        Connection: Upgrade\r\n\
        Sec-WebSocket-Key: dGhlIHNhbXBsZSBub25jZQ==\r\n\
        Sec-WebSocket-Protocol: cursor, chat\r\n\
        Sec-WebSocket-Version: 13\r\n\r\n";

    async fn run(
        server: &Server<Conn>,
        frames: Vec<Vec<u8>>,
    ) -> (Result<(), Error>, String, Vec<Frame>) {
        let (mut client, io) = tokio::io::duplex(1 << 20);
        client.write_all(REQUEST).await.unwrap();
        for f in frames {
            client.write_all(&f).await.unwrap();
        }

        let incoming = Incoming::read_from_async(io).await.unwrap();
        let ret = server.serve_async(incoming).await;

        let mut wbuf = Vec::new();
        client.read_to_end(&mut wbuf).await.unwrap();
        let pos = wbuf.windows(4).position(|w| w == b"\r\n\r\n").unwrap();
        let head = String::from_utf8(wbuf[..pos + 4].to_vec()).unwrap();
        (ret, head, server_frames(&wbuf[pos + 4..]))
    }

    fn echo_server(record: &Arc<Mutex<Vec<String>>>) -> Server<Conn> {
        let (r1, r2) = (record.clone(), record.clone());
        Server::new(
            ServerConfig::new().protocols(["chat", "cursor"]),
            Callbacks::<Conn>::new()
                .on_connect(|conn| conn.queue_text("welcome").unwrap())
                .on_disconnect(move |_| r1.lock().unwrap().push("disconnect".into()))
                .on_text_message(move |conn, text| {
                    r2.lock().unwrap().push(text.clone());
                    if text == "quit" {
                        conn.queue_close(Some(1000)).unwrap();
                    } else {
                        conn.queue_text(text).unwrap();
                    }
                })
                .on_binary_message(|conn, data| conn.queue_binary(data).unwrap()),
        )
    }

    #[tokio::test]
    async fn echo() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let server = echo_server(&record);

        let (ret, head, frames) = run(
            &server,
            vec![
                client_frame(false, OpCode::Text, b"ab"),
                client_frame(true, OpCode::Ping, b"hello"),
                client_frame(false, OpCode::Continue, b"cd"),
                client_frame(true, OpCode::Continue, b"ef"),
                client_frame(true, OpCode::Binary, &[9; 200]),
                client_frame(true, OpCode::Close, &[0x03, 0xe9]),
            ],
        )
        .await;

        assert!(ret.is_ok());
        assert!(head.contains("Sec-WebSocket-Accept: s3pPLMBiTxaQ9kYGzzhZRbK+xOo=\r\n"));
        assert!(head.contains("Sec-WebSocket-Protocol: chat\r\n"));
        assert_eq!(
            frames,
            vec![
                Frame::text("welcome"),
                Frame::pong(b"hello".to_vec()),
                Frame::text("abcdef"),
                Frame::binary(vec![9; 200]),
                Frame::close(Some(1001)),
            ]
        );
        assert_eq!(*record.lock().unwrap(), ["abcdef", "disconnect"]);
    }

    #[tokio::test]
    async fn callback_queues_close() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let server = echo_server(&record);

        let (ret, _, frames) = run(
            &server,
            vec![
                client_frame(true, OpCode::Text, b"quit"),
                client_frame(true, OpCode::Text, b"unread"),
            ],
        )
        .await;

        assert!(ret.is_ok());
        assert_eq!(frames, vec![Frame::text("welcome"), Frame::close(Some(1000))]);
        assert_eq!(*record.lock().unwrap(), ["quit", "disconnect"]);
    }

    #[tokio::test]
    async fn close_reply_codes() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let server = echo_server(&record);

        for (payload, reply) in [
            (&[0x03_u8, 0xed][..], Frame::close(Some(1000))),
            (&[0, 0][..], Frame::close(Some(1000))),
            (&[0x03][..], Frame::close(Some(1002))),
        ] {
            let (ret, _, frames) = run(&server, vec![client_frame(true, OpCode::Close, payload)]).await;
            assert!(ret.is_ok());
            assert_eq!(frames, vec![Frame::text("welcome"), reply]);
        }
    }

    #[tokio::test]
    async fn violation() {
        let record = Arc::new(Mutex::new(Vec::new()));
        let server = echo_server(&record);

        let mut unmasked = Vec::new();
        Frame::text("plain").encode(&mut unmasked).unwrap();

        let (ret, _, frames) = run(&server, vec![unmasked]).await;

        assert!(matches!(ret, Err(Error::Protocol(ProtocolViolation::UnmaskedFrame))));
        assert_eq!(frames, vec![Frame::text("welcome")]);
        assert_eq!(*record.lock().unwrap(), ["disconnect"]);
    }
}
