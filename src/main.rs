use anyhow::Result;

use leumit_sync::config::RunConfig;
use leumit_sync::{pipeline, runlog};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cfg = RunConfig::from_env();
    runlog::init(&cfg.log_file)?;

    if let Err(err) = pipeline::run(&cfg) {
        log::error!("update failed: {err:#}");
        std::process::exit(1);
    }
    Ok(())
}
