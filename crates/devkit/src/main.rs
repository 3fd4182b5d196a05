use std::process;
use std::sync::Arc;

use devkit::logging::init_logging;
use devkit::{AppSettings, Toolbox, serve};
use devkit_exec::SystemRunner;

#[tokio::main]
async fn main() {
    let settings = AppSettings::load();
    init_logging(settings.debug_logging, settings.max_log_size_bytes);
    log::info!("devkit {} starting", env!("CARGO_PKG_VERSION"));

    let runner = Arc::new(SystemRunner::new(settings.fetch_timeout()));
    let toolbox = Arc::new(Toolbox::from_settings(&settings, runner));

    if let Err(e) = serve(toolbox, tokio::io::stdin(), tokio::io::stdout()).await {
        log::error!("Bridge stopped: {e}");
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
