use json_echo_server::{config::Config, logger, server::signal, HttpServer};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::load()?;
    logger::init(&cfg)?;

    // Current-thread runtime unless workers is configured
    let mut runtime_builder = match cfg.server.workers {
        Some(workers) => {
            let mut builder = tokio::runtime::Builder::new_multi_thread();
            builder.worker_threads(workers);
            builder
        }
        None => tokio::runtime::Builder::new_current_thread(),
    };
    runtime_builder.enable_all();
    let runtime = runtime_builder.build()?;

    runtime.block_on(run(cfg))
}

async fn run(cfg: Config) -> Result<(), Box<dyn std::error::Error>> {
    let mut server = HttpServer::new(cfg);
    server.start().await?;

    signal::shutdown_signal().await;
    server.stop().await;

    Ok(())
}
