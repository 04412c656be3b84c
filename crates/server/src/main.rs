use embercraft_server::{Server, ServerConfig};
use tracing::info;

const SERVER_TOML: &str = "server.toml";

fn main() {
    let config = match ServerConfig::load(SERVER_TOML) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("failed to load {SERVER_TOML}: {e}");
            std::process::exit(1);
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        address = %config.server.address,
        port = config.server.port,
        "embercraft server starting"
    );
    info!(max_players = config.server.max_players, view_distance = config.server.view_distance);
    info!(seed = config.world.seed, save_path = %config.persistence.save_path);

    let mut server = match Server::new(config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("failed to start server: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        eprintln!("server loop exited with error: {e}");
        std::process::exit(1);
    }
}
