use clap::Parser;
use tracing::info;

use dp_ftp::{client, server, Config, Mode};

fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let config = Config::parse();

    let default_filter = if config.debug {
        "dp_ftp=debug,dp_proto=debug"
    } else {
        "dp_ftp=info,dp_proto=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .init();

    config.validate()?;

    let summary = match config.mode() {
        Mode::Client => {
            info!("Running in client mode against {}", config.server_addr());
            client::send_file(&config)?
        }
        Mode::Server => {
            info!("Running in server mode on port {}", config.port);
            server::receive_file(&config)?
        }
    };

    println!("{}", summary);
    Ok(())
}
