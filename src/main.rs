use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // A missing .env is normal
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=info")),
        )
        .init();

    let result = match vidpull::Config::from_env() {
        Ok(config) => vidpull::run_with_shutdown(config).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        tracing::error!(error = %e, "vidpull stopped");
        std::process::exit(1);
    }
}
