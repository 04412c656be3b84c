//! The non-blocking transport layer: one `mio` poll loop multiplexing every
//! client socket, plus the per-client peek-then-consume framing described
//! for the I/O model. There are no tasks and no futures — `drain` is called
//! once per outer loop iteration and always returns promptly.

use std::collections::HashMap;
use std::io::{self, Read, Write};
use std::net::SocketAddr;

use bytes::{Buf, BytesMut};
use mio::net::{TcpListener, TcpStream};
use mio::{Events, Interest, Poll, Token};
use tracing::{debug, warn};

use crate::error::TransportError;

const SERVER_TOKEN: Token = Token(0);
const EVENT_CAPACITY: usize = 256;
/// Cap on how far the stale-packet drain is allowed to look ahead into the
/// receive buffer per [`Transport::peek`] call.
const PEEK_BUFFER_LEN: usize = 16;

pub type ConnId = usize;

pub enum TransportEvent {
    Connected(ConnId),
    Readable(ConnId),
    Disconnected(ConnId),
}

struct Conn {
    stream: TcpStream,
    recv_buf: BytesMut,
    send_buf: BytesMut,
    writable: bool,
    closing: bool,
}

/// The mio-backed listener plus its connection table. Owns all sockets;
/// the server loop drives it once per iteration and never blocks inside it
/// for longer than the poll timeout.
pub struct Transport {
    poll: Poll,
    events: Events,
    listener: TcpListener,
    conns: HashMap<ConnId, Conn>,
    next_id: ConnId,
    max_recv_buf_len: usize,
    packet_buffer_size: usize,
}

impl Transport {
    pub fn bind(
        addr: SocketAddr,
        max_recv_buf_len: usize,
        packet_buffer_size: usize,
    ) -> io::Result<Self> {
        let poll = Poll::new()?;
        let mut listener = TcpListener::bind(addr)?;
        poll.registry()
            .register(&mut listener, SERVER_TOKEN, Interest::READABLE)?;

        Ok(Transport {
            poll,
            events: Events::with_capacity(EVENT_CAPACITY),
            listener,
            conns: HashMap::new(),
            next_id: 1,
            max_recv_buf_len,
            packet_buffer_size,
        })
    }

    /// Poll for ready sockets and dispatch `f` once per event. Never blocks
    /// longer than `timeout`; a `timeout` of `Some(Duration::ZERO)` makes
    /// this a pure non-blocking poll, the shape used by the cooperative
    /// server loop's "yield" point.
    pub fn drain(&mut self, timeout: Option<std::time::Duration>, mut f: impl FnMut(TransportEvent)) -> io::Result<()> {
        match self.poll.poll(&mut self.events, timeout) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::Interrupted => return Ok(()),
            Err(e) => return Err(e),
        }

        let ready: Vec<_> = self.events.iter().map(|e| (e.token(), e.is_readable(), e.is_writable())).collect();

        for (token, readable, writable) in ready {
            if token == SERVER_TOKEN {
                self.accept_all(&mut f);
                continue;
            }

            let id = token.0;
            if writable {
                if let Some(conn) = self.conns.get_mut(&id) {
                    conn.writable = true;
                }
                self.flush(id);
            }
            if readable {
                f(TransportEvent::Readable(id));
            }
            if let Some(conn) = self.conns.get(&id) {
                if conn.closing && conn.send_buf.is_empty() {
                    self.close(id);
                    f(TransportEvent::Disconnected(id));
                }
            }
        }
        Ok(())
    }

    fn accept_all(&mut self, f: &mut impl FnMut(TransportEvent)) {
        loop {
            match self.listener.accept() {
                Ok((mut stream, addr)) => {
                    let id = self.next_id;
                    self.next_id += 1;
                    let token = Token(id);
                    if let Err(e) = self
                        .poll
                        .registry()
                        .register(&mut stream, token, Interest::READABLE.add(Interest::WRITABLE))
                    {
                        warn!(%e, "failed to register accepted connection");
                        continue;
                    }
                    debug!(%addr, id, "accepted connection");
                    self.conns.insert(
                        id,
                        Conn {
                            stream,
                            recv_buf: BytesMut::with_capacity(self.max_recv_buf_len),
                            send_buf: BytesMut::with_capacity(self.packet_buffer_size),
                            writable: true,
                            closing: false,
                        },
                    );
                    f(TransportEvent::Connected(id));
                }
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(%e, "accept failed");
                    break;
                }
            }
        }
    }

    /// Read everything currently available into the session's recv buffer.
    /// Never blocks; returns `Ok(())` on `WouldBlock`.
    pub fn recv_all(&mut self, id: ConnId) -> Result<(), TransportError> {
        let Some(conn) = self.conns.get_mut(&id) else {
            return Err(TransportError::Reset);
        };

        let mut scratch = [0u8; 4096];
        loop {
            if conn.recv_buf.len() >= self.max_recv_buf_len {
                break;
            }
            match conn.stream.read(&mut scratch) {
                Ok(0) => return Err(TransportError::Reset),
                Ok(n) => conn.recv_buf.extend_from_slice(&scratch[..n]),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(TransportError::Io(e)),
            }
        }
        Ok(())
    }

    pub fn recv_buf(&mut self, id: ConnId) -> Option<&mut BytesMut> {
        self.conns.get_mut(&id).map(|c| &mut c.recv_buf)
    }

    /// Peek at up to `PEEK_BUFFER_LEN` unconsumed bytes already sitting in
    /// the receive buffer, without removing them. Never touches the wire:
    /// the stale-packet drain only ever looks ahead within bytes a prior
    /// `recv_all` already pulled in, so there is nothing to backfill.
    pub fn peek(&mut self, id: ConnId, len: usize) -> &[u8] {
        let len = len.min(PEEK_BUFFER_LEN);
        if let Some(conn) = self.conns.get_mut(&id) {
            if conn.recv_buf.len() >= len {
                return &conn.recv_buf[..len];
            }
        }
        &[]
    }

    pub fn queue_write(&mut self, id: ConnId, bytes: &[u8]) {
        if let Some(conn) = self.conns.get_mut(&id) {
            conn.send_buf.extend_from_slice(bytes);
        }
    }

    /// Flush as much of the send buffer as the socket will currently
    /// accept. Returns `true` once the whole buffer has drained.
    pub fn flush(&mut self, id: ConnId) -> bool {
        let Some(conn) = self.conns.get_mut(&id) else {
            return true;
        };
        if !conn.writable {
            return conn.send_buf.is_empty();
        }

        while !conn.send_buf.is_empty() {
            match conn.stream.write(&conn.send_buf) {
                Ok(0) => break,
                Ok(n) => conn.send_buf.advance(n),
                Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                    conn.writable = false;
                    break;
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(_) => break,
            }
        }
        conn.send_buf.is_empty()
    }

    /// True while a send is still pending, the signal the stale-packet
    /// drain logic watches for.
    pub fn is_send_blocked(&self, id: ConnId) -> bool {
        self.conns
            .get(&id)
            .map(|c| !c.send_buf.is_empty())
            .unwrap_or(false)
    }

    pub fn mark_closing(&mut self, id: ConnId) {
        if let Some(conn) = self.conns.get_mut(&id) {
            conn.closing = true;
        }
    }

    fn close(&mut self, id: ConnId) {
        if let Some(mut conn) = self.conns.remove(&id) {
            let _ = self.poll.registry().deregister(&mut conn.stream);
        }
    }

    pub fn is_connected(&self, id: ConnId) -> bool {
        self.conns.contains_key(&id)
    }

    /// The address actually bound, useful when `bind` was given port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_returns_empty_for_unknown_connection() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let mut t = Transport::bind(addr, 1024, 1024).unwrap();
        assert_eq!(t.peek(42, 4), &[] as &[u8]);
    }

    #[test]
    fn flush_on_unknown_connection_is_a_noop_success() {
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let mut t = Transport::bind(addr, 1024, 1024).unwrap();
        assert!(t.flush(99));
    }
}
