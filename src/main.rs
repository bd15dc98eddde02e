use startiers_backend::{config::Config, logging, serve};

#[tokio::main]
async fn main() {
    logging::init();

    let config = Config::load();
    if let Err(e) = serve(config).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
