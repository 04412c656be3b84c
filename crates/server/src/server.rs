//! Server wiring: owns the transport, the session table, and the world
//! state, and drives the cooperative loop that ties them together. There
//! is no async runtime — one iteration polls the transport, processes
//! whatever became readable, and runs a world tick when one is due.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use embercraft_game::ai::MobBrain;
use embercraft_game::entity::{MobKind, Vec3 as GameVec3};
use embercraft_proto::framing::try_read_packet;
use embercraft_proto::state::ConnectionState;
use embercraft_world::terrain::TerrainConfig;

use crate::config::ServerConfig;
use crate::error::SessionError;
use crate::net::{ConnId, Transport, TransportEvent};
use crate::packet_handlers;
use crate::persistence::{self, PlayerRecord, SaveData};
use crate::session::{drain_stale_movement, Session};
use crate::tick::{self, MobMovement, TickScheduler, TICK_INTERVAL};
use crate::world_state::WorldState;

/// Radius (in chunks) scanned for block changes to persist.
const PERSIST_CHUNK_SCAN_RADIUS: i32 = 64;

pub struct Server {
    config: ServerConfig,
    transport: Transport,
    sessions: HashMap<ConnId, Session>,
    world: WorldState,
    scheduler: TickScheduler,
    brains: Vec<MobBrain>,
    next_entity_id: i32,
    last_tick_at: Instant,
    last_autosave_at: Instant,
}

impl Server {
    pub fn new(config: ServerConfig) -> io::Result<Self> {
        let addr: SocketAddr = format!("{}:{}", config.server.address, config.server.port)
            .parse()
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
        let transport = Transport::bind(
            addr,
            config.limits.max_recv_buf_len,
            config.limits.packet_buffer_size,
        )?;

        let terrain = TerrainConfig {
            seed: config.world.seed as u32,
            terrain_base_height: config.world.terrain_base_height,
            cave_base_depth: config.world.cave_base_depth,
            biome_size: config.world.biome_size,
            biome_radius: config.world.biome_radius,
        };
        let mut world = WorldState::new(
            terrain,
            config.limits.chunk_cache_size,
            config.gameplay.allow_chests,
            config.gameplay.do_fluid_flow,
        );

        let mut brains = Vec::new();
        let mut next_entity_id = 1;
        match persistence::load_from_file(&config.persistence.save_path) {
            Ok(Some(save)) => {
                info!(path = %config.persistence.save_path, "loaded world save");
                world.world_age = save.world_age;
                world.time_of_day = save.time_of_day;
                persistence::apply_block_changes(&mut world.overlay, &save.block_changes);
            }
            Ok(None) => {
                info!("no existing save found, starting a fresh world");
                let spawn = world.spawn_point();
                let id = world.entities.spawn(MobKind::Cow, spawn);
                brains.push(MobBrain::passive(id, config.world.seed as u32));
                next_entity_id = id + 1;
            }
            Err(e) => {
                warn!(%e, "world save present but unreadable, starting fresh");
            }
        }

        Ok(Server {
            config,
            transport,
            sessions: HashMap::new(),
            world,
            scheduler: TickScheduler::new(),
            brains,
            next_entity_id,
            last_tick_at: Instant::now(),
            last_autosave_at: Instant::now(),
        })
    }

    /// The address actually bound, useful when the config asked for port 0.
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    /// Run forever. Each iteration polls the transport with a short
    /// timeout, processes whatever became ready, and runs a tick (or an
    /// autosave) when its interval has elapsed.
    pub fn run(&mut self) -> io::Result<()> {
        loop {
            self.iterate()?;
        }
    }

    fn iterate(&mut self) -> io::Result<()> {
        let mut events = Vec::new();
        self.transport
            .drain(Some(Duration::from_millis(10)), |e| events.push(e))?;

        for event in events {
            match event {
                TransportEvent::Connected(id) => self.on_connected(id),
                TransportEvent::Readable(id) => self.on_readable(id),
                TransportEvent::Disconnected(id) => self.on_disconnected(id),
            }
        }

        if self.last_tick_at.elapsed() >= TICK_INTERVAL {
            self.last_tick_at = Instant::now();
            self.run_tick();
        }

        self.check_keepalives();
        self.flush_all();

        let autosave_interval = Duration::from_secs(self.config.persistence.autosave_interval_secs);
        if self.last_autosave_at.elapsed() >= autosave_interval {
            self.last_autosave_at = Instant::now();
            self.save();
        }

        Ok(())
    }

    fn on_connected(&mut self, id: ConnId) {
        let entity_id = self.next_entity_id;
        self.next_entity_id += 1;
        self.sessions.insert(id, Session::new(id, entity_id));
        debug!(id, "session created");
    }

    fn on_disconnected(&mut self, id: ConnId) {
        self.sessions.remove(&id);
        debug!(id, "session dropped");
    }

    fn on_readable(&mut self, id: ConnId) {
        if let Err(e) = self.transport.recv_all(id) {
            debug!(id, %e, "recv failed, reaping session");
            self.transport.mark_closing(id);
            return;
        }

        let in_play = self
            .sessions
            .get(&id)
            .map(|s| s.state == ConnectionState::Play)
            .unwrap_or(false);
        if in_play {
            if let Some(buf) = self.transport.recv_buf(id) {
                drain_stale_movement(buf);
            }
        }

        loop {
            let frame = {
                let Some(buf) = self.transport.recv_buf(id) else {
                    return;
                };
                match try_read_packet(buf) {
                    Ok(Some(frame)) => frame,
                    Ok(None) => return,
                    Err(e) => {
                        warn!(id, %e, "malformed packet, closing connection");
                        if let Some(mut session) = self.sessions.remove(&id) {
                            packet_handlers::send_disconnect_and_close(
                                &mut self.transport,
                                &mut session,
                                "protocol error",
                            );
                        }
                        return;
                    }
                }
            };

            let Some(session) = self.sessions.get_mut(&id) else {
                return;
            };
            match packet_handlers::handle_packet(
                session,
                frame,
                &mut self.transport,
                &self.config,
                &mut self.world,
            ) {
                Ok(Some(broadcast)) => {
                    packet_handlers::broadcast_block_update(&mut self.transport, &self.sessions, &broadcast);
                }
                Ok(None) => {}
                Err(e) => {
                    let reason = if matches!(e, SessionError::WorldFull) {
                        "world is full"
                    } else {
                        "internal error"
                    };
                    warn!(id, %e, "session error, closing connection");
                    packet_handlers::send_disconnect_and_close(&mut self.transport, session, reason);
                    return;
                }
            }
        }
    }

    fn run_tick(&mut self) {
        let players: Vec<(i32, GameVec3)> = self
            .sessions
            .values()
            .filter(|s| s.state == ConnectionState::Play)
            .map(|s| (s.entity_id, GameVec3::new(s.x, s.y, s.z)))
            .collect();

        let outcome =
            tick::run_world_tick(&mut self.scheduler, &mut self.world, &mut self.brains, &players, &[]);

        if outcome.broadcast_time {
            self.broadcast_time();
        }
        for mob in &outcome.moved_mobs {
            self.broadcast_entity_teleport(mob);
        }

        for id in self.play_session_ids() {
            if let Some(session) = self.sessions.get_mut(&id) {
                if let Err(e) = packet_handlers::stream_chunks(&mut self.transport, session, &mut self.world) {
                    warn!(id, %e, "chunk stream failed, closing connection");
                    packet_handlers::send_disconnect_and_close(&mut self.transport, session, "internal error");
                }
            }
        }
    }

    /// Tell every player a mob moved, by teleport rather than the relative
    /// delta packets — simpler to get right and cheap enough at this scale.
    fn broadcast_entity_teleport(&mut self, mob: &MobMovement) {
        use bytes::BytesMut;
        use embercraft_proto::codec::WireEncode;
        use embercraft_proto::framing::write_packet;
        use embercraft_proto::packets::play;

        let packet = play::EntityTeleport {
            entity_id: mob.entity_id,
            x: mob.x,
            y: mob.y,
            z: mob.z,
            yaw: ((mob.yaw.rem_euclid(360.0) / 360.0) * 256.0) as u8,
            pitch: 0,
            on_ground: true,
        };
        let mut body = BytesMut::new();
        packet.encode(&mut body);
        let mut framed = BytesMut::new();
        write_packet(&mut framed, play::CB_ENTITY_TELEPORT, &body);

        for id in self.play_session_ids() {
            self.transport.queue_write(id, &framed);
        }
    }

    fn broadcast_time(&mut self) {
        use bytes::BytesMut;
        use embercraft_proto::codec::WireEncode;
        use embercraft_proto::framing::write_packet;
        use embercraft_proto::packets::play;

        let packet = play::SetTime {
            world_age: self.world.world_age,
            time_of_day: self.world.time_of_day,
        };
        let mut body = BytesMut::new();
        packet.encode(&mut body);
        let mut framed = BytesMut::new();
        write_packet(&mut framed, play::CB_SET_TIME, &body);

        for id in self.play_session_ids() {
            self.transport.queue_write(id, &framed);
        }
    }

    fn check_keepalives(&mut self) {
        let interval = Duration::from_millis(self.config.limits.keepalive_interval_ms);
        let timeout = Duration::from_millis(self.config.limits.keepalive_timeout_ms);
        let now = Instant::now();

        let mut to_send = Vec::new();
        let mut to_drop = Vec::new();
        for (&id, session) in self.sessions.iter() {
            if session.state != ConnectionState::Play {
                continue;
            }
            if session.pending_keepalive_id.is_some() && now.duration_since(session.last_keepalive_sent) > timeout {
                to_drop.push(id);
                continue;
            }
            if session.pending_keepalive_id.is_none() && now.duration_since(session.last_keepalive_sent) >= interval {
                to_send.push(id);
            }
        }

        for id in to_send {
            self.send_keepalive(id);
        }
        for id in to_drop {
            if let Some(mut session) = self.sessions.remove(&id) {
                packet_handlers::send_disconnect_and_close(
                    &mut self.transport,
                    &mut session,
                    "keepalive timeout",
                );
            }
        }
    }

    fn send_keepalive(&mut self, id: ConnId) {
        use bytes::BytesMut;
        use embercraft_proto::codec::WireEncode;
        use embercraft_proto::framing::write_packet;
        use embercraft_proto::packets::play;

        let keepalive_id = self.scheduler.tick_counter as i64;
        if let Some(session) = self.sessions.get_mut(&id) {
            session.pending_keepalive_id = Some(keepalive_id);
            session.last_keepalive_sent = Instant::now();
        } else {
            return;
        }

        let mut body = BytesMut::new();
        play::KeepAlive { id: keepalive_id }.encode(&mut body);
        let mut framed = BytesMut::new();
        write_packet(&mut framed, play::CB_KEEPALIVE, &body);
        self.transport.queue_write(id, &framed);
    }

    fn flush_all(&mut self) {
        let ids: Vec<ConnId> = self.sessions.keys().copied().collect();
        for id in ids {
            self.transport.flush(id);
        }
    }

    fn play_session_ids(&self) -> Vec<ConnId> {
        self.sessions
            .iter()
            .filter(|(_, s)| s.state == ConnectionState::Play)
            .map(|(&id, _)| id)
            .collect()
    }

    fn save(&mut self) {
        let block_changes = persistence::block_changes_from_overlay(&self.world.overlay, PERSIST_CHUNK_SCAN_RADIUS);
        let players: Vec<PlayerRecord> = self
            .sessions
            .values()
            .filter(|s| s.state == ConnectionState::Play)
            .map(|s| {
                persistence::player_record_from(
                    &s.inventory,
                    &s.username,
                    s.uuid,
                    s.x,
                    s.y,
                    s.z,
                    s.yaw,
                    s.pitch,
                )
            })
            .collect();

        let data = SaveData {
            seed: self.config.world.seed,
            world_age: self.world.world_age,
            time_of_day: self.world.time_of_day,
            block_changes,
            players,
        };

        if let Err(e) = persistence::save_to_file(&self.config.persistence.save_path, &data) {
            warn!(%e, "failed to save world");
        } else {
            debug!(path = %self.config.persistence.save_path, "saved world");
        }
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.save();
    }
}
