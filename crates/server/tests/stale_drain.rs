//! A burst of movement packets followed by a real action, all delivered in
//! one write so the server's `recv_all` + stale-packet drain sees them in a
//! single readable event. The dig at the end must still be processed.

mod common;

use std::net::TcpStream;

use bytes::BytesMut;

use embercraft_proto::codec::WireEncode;
use embercraft_proto::framing::write_packet;
use embercraft_proto::packets::{configuration, handshake, login, play};
use embercraft_proto::PROTOCOL_VERSION;

fn login_to_play(stream: &mut TcpStream, recv_buf: &mut BytesMut, server_port: u16) {
    common::send_packet(
        stream,
        handshake::SB_HANDSHAKE,
        &handshake::Handshake {
            protocol_version: PROTOCOL_VERSION,
            server_address: "127.0.0.1".into(),
            server_port,
            next_state: 2,
        },
    );
    common::send_packet(
        stream,
        login::SB_LOGIN_START,
        &login::LoginStart {
            username: "Burst".into(),
            uuid: 2,
        },
    );
    let _ = common::read_packet(stream, recv_buf); // LoginSuccess
    let _ = common::read_packet(stream, recv_buf); // RegistryData
    let _ = common::read_packet(stream, recv_buf); // FinishConfiguration
    common::send_packet(
        stream,
        configuration::SB_ACKNOWLEDGE_FINISH_CONFIGURATION,
        &configuration::FinishConfiguration,
    );
    let _ = common::read_packet(stream, recv_buf); // LoginPlay
    let _ = common::read_packet(stream, recv_buf); // SpawnPosition
    let _ = common::read_packet(stream, recv_buf); // SynchronizePlayerPosition
}

#[test]
fn burst_of_movement_packets_does_not_block_a_following_dig() {
    let dir = std::env::temp_dir().join(format!("embercraft-it-stale-drain-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let save_path = dir.join("world.dat").to_string_lossy().into_owned();

    let addr = common::spawn_test_server(save_path);
    let mut stream = common::connect(addr);
    let mut recv_buf = BytesMut::new();
    login_to_play(&mut stream, &mut recv_buf, addr.port());

    // Small steps that stay within reach of the dig target below; the
    // stale-packet drain is about collapsing a run of movement packets to
    // the last one, not about distance.
    let mut burst = BytesMut::new();
    for i in 0..50 {
        let mut body = BytesMut::new();
        play::MovePlayerPosition {
            x: (i as f64) * 0.01,
            y: 45.0,
            z: 0.0,
            on_ground: true,
        }
        .encode(&mut body);
        write_packet(&mut burst, play::SB_MOVE_POSITION, &body);
    }
    let mut dig_body = BytesMut::new();
    play::PlayerAction {
        status: 2,
        x: 0,
        y: 45,
        z: 0,
        face: 1,
        sequence: 1,
    }
    .encode(&mut dig_body);
    write_packet(&mut burst, play::SB_PLAYER_ACTION, &dig_body);

    use std::io::Write as _;
    stream.write_all(&burst).expect("write movement burst");

    // Chunk-stream packets for the player's view window may interleave with
    // the block update; skip past them rather than assuming it's first.
    let mut block_update_id = None;
    for _ in 0..5000 {
        let frame = common::read_packet(&mut stream, &mut recv_buf);
        if frame.id == play::CB_BLOCK_UPDATE {
            block_update_id = Some(frame.id);
            break;
        }
    }
    assert_eq!(block_update_id, Some(play::CB_BLOCK_UPDATE), "dig was never acknowledged");

    let _ = std::fs::remove_dir_all(&dir);
}
