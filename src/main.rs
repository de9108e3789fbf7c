use actix_web::{App, HttpServer, web::Data};
use anyhow::{Context, Result};
use env_logger::{Builder, Env, Target};
use eufy_setup::{
    api::{self, Api},
    config::AppConfig,
    device_coordinator::{DeviceCredentials, DeviceError, LocalCoordinator, RuntimeContext},
    record_store::JsonFileStore,
};
use log::{debug, error, info};
use std::io::Write;
use tokio::signal::unix::{SignalKind, signal};

type LocalFactory = fn(&RuntimeContext, &DeviceCredentials) -> Result<LocalCoordinator, DeviceError>;
type SetupApi = Api<JsonFileStore, LocalFactory>;

#[actix_web::main]
async fn main() {
    if let Err(e) = run().await {
        error!("application error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    initialize();

    let config = AppConfig::load().context("failed to load application configuration")?;

    let store = JsonFileStore::open(&config.paths.entries_file)
        .await
        .context("failed to open record store")?;

    let api = Data::new(SetupApi::new(
        store,
        LocalCoordinator::new as LocalFactory,
        RuntimeContext::from(&config.device),
        config.setup_url.clone(),
    ));

    let ui_port = config.ui.port;

    let server = HttpServer::new(move || {
        App::new()
            .app_data(api.clone())
            .configure(api::configure::<JsonFileStore, LocalFactory>)
    })
    .bind(("0.0.0.0", ui_port))
    .context("failed to bind server")?
    .disable_signals()
    .run();

    let server_handle = server.handle();
    let server_task = tokio::spawn(server);

    let mut sigterm =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    info!("listening on port {ui_port}");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => debug!("ctrl-c received"),
        _ = sigterm.recv() => debug!("SIGTERM received"),
        result = server_task => match result {
            Ok(Ok(())) => debug!("server stopped normally"),
            Ok(Err(e)) => error!("server stopped with error: {e}"),
            Err(e) => error!("server task panicked: {e}"),
        },
    }

    server_handle.stop(true).await;
    info!("shutdown complete");

    Ok(())
}

fn initialize() {
    log_panics::init();

    let mut builder = if cfg!(debug_assertions) {
        Builder::from_env(Env::default().default_filter_or("debug"))
    } else {
        Builder::from_env(Env::default().default_filter_or("info"))
    };

    builder.format(|f, record| match record.level() {
        log::Level::Error => {
            eprintln!("{}", record.args());
            Ok(())
        }
        _ => {
            writeln!(f, "{}", record.args())
        }
    });

    builder.target(Target::Stdout).init();

    info!("module version: {}", env!("CARGO_PKG_VERSION"));
}
