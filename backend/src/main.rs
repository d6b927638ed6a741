use std::net::SocketAddr;
use std::path::PathBuf;

use tracing::info;
use tracing_subscriber::EnvFilter;

mod auth;
mod config;
mod db;
mod domain;
mod error;
mod notify;
mod photos;
mod rest;
mod storage;

use auth::AuthService;
use config::AppConfig;
use db::DbConnection;
use domain::{AttendanceService, RosterService};
use rest::AppState;
use storage::{AdminRepository, AttendanceRepository, StudentRepository};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env();

    info!("Setting up database");
    let db = DbConnection::new(&config.database_url).await?;
    db.seed(&config.admin_email, &config.admin_password, &config.admin_name)
        .await?;

    let students = StudentRepository::new(db.clone());
    let state = AppState::new(
        AuthService::new(AdminRepository::new(db.clone()), config.jwt_secret.clone()),
        RosterService::new(
            students.clone(),
            photos::photo_store_from_config(&config.photos),
        ),
        AttendanceService::new(
            students,
            AttendanceRepository::new(db),
            notify::notifier_from_config(&config.sms),
        ),
    );

    // /uploads is only served when photos live on the local disk
    let uploads_dir = if config.photos.is_remote() {
        None
    } else {
        Some(PathBuf::from(&config.photos.uploads_dir))
    };
    let app = rest::router(state, uploads_dir);

    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
