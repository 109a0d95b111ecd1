use std::process;

use swap_dapp::{config::AppConfig, error::ReportDisplayExt, server::serve};
use swap_models::log::init_tracing;

#[tokio::main]
async fn main() {
    if let Err(err) = run().await {
        eprintln!("swap-server error: {err}");
        process::exit(1);
    }
}

async fn run() -> Result<(), String> {
    let config = AppConfig::from_env().map_err(|e| e.format())?;
    init_tracing(config.log_format);

    serve(config).await.map_err(|e| e.format())
}
