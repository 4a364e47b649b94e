// --- Painel de Dados Populacionais - Archivo principal ---

use popdash::config::AppConfig;
use popdash::run_server;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = AppConfig::from_env();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Err(e) = &config.db {
        tracing::warn!(error = %e, "base de datos sin configurar; la carga mostrará el error");
    }
    tracing::info!("Iniciando servidor en http://{}", config.bind_addr);
    run_server(config).await
}
