use anyhow::Result;
use std::path::Path;

use logs_dashboard::{config, init_tracing, server};

pub async fn execute(config_path: &Path) -> Result<()> {
    let cfg = config::load_config(config_path)?;
    init_tracing(&cfg.server.log_level, &cfg.server.log_format);

    server::start_server(cfg).await
}
