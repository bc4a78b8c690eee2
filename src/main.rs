use corsd::config::Config;
use corsd::logger;
use corsd::server::Server;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    logger::init(&cfg)?;

    // Build the Tokio runtime, sizing the thread pool from config
    let mut runtime_builder = tokio::runtime::Builder::new_multi_thread();
    runtime_builder.enable_all();

    if let Some(workers) = cfg.server.workers {
        runtime_builder.worker_threads(workers);
    }

    let runtime = runtime_builder.build()?;

    runtime.block_on(async_main(cfg))
}

async fn async_main(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    // A bind failure (port in use, no permission) is fatal and propagates
    // out of main before any request is served
    let server = Server::bind(cfg.clone())?;
    let addr = server.local_addr()?;

    logger::log_server_start(&addr, &cfg);

    // Runs until the process is terminated
    server.serve().await?;
    Ok(())
}
