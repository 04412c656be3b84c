//! Shared harness for the integration tests: spawns a real `Server` bound to
//! an OS-assigned loopback port and exposes plain read/write helpers for
//! driving it over a real `TcpStream`, the same way a client would.

use std::io::{Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::thread;
use std::time::Duration;

use bytes::BytesMut;

use embercraft_proto::codec::WireEncode;
use embercraft_proto::framing::{try_read_packet, write_packet, PacketFrame};
use embercraft_server::config::{
    GameplaySection, LimitsSection, LoggingSection, PersistenceSection, ServerConfig,
    ServerSection, WorldSection,
};
use embercraft_server::Server;

/// Bind a server to `127.0.0.1:0`, run it on a background thread, and return
/// the address it actually bound. The thread is never joined; it dies with
/// the test process.
pub fn spawn_test_server(save_path: String) -> SocketAddr {
    let config = ServerConfig {
        server: ServerSection {
            address: "127.0.0.1".into(),
            port: 0,
            ..ServerSection::default()
        },
        world: WorldSection::default(),
        logging: LoggingSection::default(),
        limits: LimitsSection::default(),
        gameplay: GameplaySection::default(),
        persistence: PersistenceSection {
            save_path,
            ..PersistenceSection::default()
        },
    };

    let mut server = Server::new(config).expect("test server should bind to loopback");
    let addr = server.local_addr().expect("bound address");
    thread::spawn(move || {
        let _ = server.run();
    });
    // The accept loop needs one poll tick before the listener is actually
    // draining events; a connect attempt before that would just block until
    // it is, but a short wait keeps the tests from looking like a hang.
    thread::sleep(Duration::from_millis(50));
    addr
}

pub fn connect(addr: SocketAddr) -> TcpStream {
    let stream = TcpStream::connect(addr).expect("connect to test server");
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .unwrap();
    stream
}

pub fn send_packet<T: WireEncode>(stream: &mut TcpStream, packet_id: i32, packet: &T) {
    let mut body = BytesMut::new();
    packet.encode(&mut body);
    let mut framed = BytesMut::new();
    write_packet(&mut framed, packet_id, &body);
    stream.write_all(&framed).expect("write to test server");
}

/// Block until one complete framed packet has arrived, growing `buf` as
/// needed. Panics (failing the test) if the connection closes first or the
/// read timeout set in [`connect`] elapses.
pub fn read_packet(stream: &mut TcpStream, buf: &mut BytesMut) -> PacketFrame {
    loop {
        if let Some(frame) = try_read_packet(buf).expect("well-formed frame from test server") {
            return frame;
        }
        let mut scratch = [0u8; 4096];
        let n = stream.read(&mut scratch).expect("read from test server");
        assert!(n > 0, "server closed the connection before sending a full frame");
        buf.extend_from_slice(&scratch[..n]);
    }
}
