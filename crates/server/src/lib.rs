//! Library surface for `embercraft-server`: the binary in `main.rs` is a
//! thin shell around this crate, and integration tests drive the real
//! `Server` type through a loopback socket the same way a client would.

pub mod config;
pub mod error;
pub mod net;
pub mod packet_handlers;
pub mod persistence;
pub mod server;
pub mod session;
pub mod tick;
pub mod world_state;

pub use config::ServerConfig;
pub use server::Server;
