//! End-to-end handshake -> login -> configuration -> play, driven over a
//! real loopback socket against the real `Server`.

mod common;

use bytes::BytesMut;

use embercraft_proto::packets::{configuration, handshake, login, play};
use embercraft_proto::PROTOCOL_VERSION;

#[test]
fn full_login_sequence_reaches_play_with_exactly_one_login_play() {
    let dir = std::env::temp_dir().join(format!("embercraft-it-handshake-{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let save_path = dir.join("world.dat").to_string_lossy().into_owned();

    let addr = common::spawn_test_server(save_path);
    let mut stream = common::connect(addr);
    let mut recv_buf = BytesMut::new();

    common::send_packet(
        &mut stream,
        handshake::SB_HANDSHAKE,
        &handshake::Handshake {
            protocol_version: PROTOCOL_VERSION,
            server_address: "127.0.0.1".into(),
            server_port: addr.port(),
            next_state: 2,
        },
    );
    common::send_packet(
        &mut stream,
        login::SB_LOGIN_START,
        &login::LoginStart {
            username: "Tester".into(),
            uuid: 1,
        },
    );

    let success = common::read_packet(&mut stream, &mut recv_buf);
    assert_eq!(success.id, login::CB_LOGIN_SUCCESS);

    let registry = common::read_packet(&mut stream, &mut recv_buf);
    assert_eq!(registry.id, configuration::CB_REGISTRY_DATA);

    let finish = common::read_packet(&mut stream, &mut recv_buf);
    assert_eq!(finish.id, configuration::CB_FINISH_CONFIGURATION);

    common::send_packet(
        &mut stream,
        configuration::SB_ACKNOWLEDGE_FINISH_CONFIGURATION,
        &configuration::FinishConfiguration,
    );

    let login_play = common::read_packet(&mut stream, &mut recv_buf);
    assert_eq!(login_play.id, play::CB_LOGIN_PLAY);

    let spawn_position = common::read_packet(&mut stream, &mut recv_buf);
    assert_eq!(spawn_position.id, play::CB_SPAWN_POSITION);

    let sync_position = common::read_packet(&mut stream, &mut recv_buf);
    assert_eq!(sync_position.id, play::CB_SYNCHRONIZE_PLAYER_POSITION);

    // The next world tick streams the spawn column: at least one chunk
    // section for the player's own (0, 0) column should follow, unprompted.
    let chunk = common::read_packet(&mut stream, &mut recv_buf);
    assert_eq!(chunk.id, play::CB_CHUNK_DATA);

    let _ = std::fs::remove_dir_all(&dir);
}
