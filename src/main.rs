use anyhow::Result;
use std::net::SocketAddr;
use tokio::signal;
use tracing::{error, info};
use dotenvy::dotenv;

use gesticar::{
    config::environment::EnvironmentConfig,
    repositories,
    routes::create_app,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Cargar variables de entorno
    dotenv().ok();

    // Configurar logging
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    info!("🔧 Gesticar - API de órdenes de trabajo");
    info!("======================================");

    let config = EnvironmentConfig::from_env()
        .map_err(|e| anyhow::anyhow!("Configuración inválida: {}", e))?;
    info!("⚙️ Entorno {} con backend {:?}", config.environment, config.backend);

    let repository = match repositories::build(&config).await {
        Ok(repository) => repository,
        Err(e) => {
            error!("❌ Error inicializando el repositorio: {}", e);
            return Err(anyhow::anyhow!("Error de repositorio: {}", e));
        }
    };

    let addr: SocketAddr = config.server_url().parse()?;
    let app = create_app(AppState::new(repository, config));

    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   GET  /health");
    info!("   POST /api/auth/login");
    info!("   GET|POST /api/ots - Buscar / crear OTs");
    info!("   GET  /api/ots/siguiente-numero");
    info!("   GET|DELETE /api/ots/:id - Detalle / eliminar borrador");
    info!("   /api/ots/:id/{{estado,notas,mecanicos,vehiculo,presupuesto,tareas,evidencias,auditoria}}");
    info!("   GET|PUT /api/clientes/:rut, GET /api/clientes/:rut/vehiculos");
    info!("   GET|PUT /api/vehiculos/:patente, PUT|DELETE /api/vehiculos/:patente/cliente");
    info!("   GET|POST /api/usuarios, GET /api/usuarios/mecanicos");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo escuchar Ctrl+C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo escuchar SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
