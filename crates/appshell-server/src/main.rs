//! appshell - account deletion endpoint and offline asset proxy.

use anyhow::Result;
use tracing::info;

use appshell_core::Config;
use appshell_server::logging::{bootstrap_subscriber, init_tracing};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = {
        let _bootstrap = tracing::subscriber::set_default(bootstrap_subscriber());

        let args: Vec<String> = std::env::args().collect();
        if args.len() > 1 && args[1] == "--write-config" {
            let path = Config::config_path()?;
            Config::write_file_config(&path)?;
            info!(?path, "Config file written");
            return Ok(());
        }

        Config::load()?
    };

    let _log_guard = init_tracing(config.log_dir.as_deref());
    info!("appshell starting");

    appshell_server::serve(config).await
}
