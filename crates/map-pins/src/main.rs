// The binary uses the library, not duplicate modules
use map_pins::{Settings, run, setup_logging};

fn main() {
    let settings = Settings::from_cli();
    setup_logging();

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::error!("Failed to start async runtime: {e}");
            std::process::exit(1);
        }
    };

    if let Err(e) = rt.block_on(run(settings)) {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
