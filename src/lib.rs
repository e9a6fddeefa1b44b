#![forbid(unsafe_code)]

use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tracing::info;

use crate::{
    config::Config,
    server::{AppState, build_router},
    store::IssueStore,
};

pub mod config;
pub mod directory;
pub mod policy;
pub mod server;
pub mod store;
pub mod types;

pub fn build_app(config: Config) -> axum::Router {
    build_router(AppState::new(config, Arc::new(IssueStore::new())))
}

pub async fn serve(config: Config) -> Result<()> {
    let listener = TcpListener::bind(config.bind_addr).await?;
    info!(
        service = %config.service_name,
        bind_addr = %config.bind_addr,
        "issue service listening"
    );
    axum::serve(listener, build_app(config)).await?;
    Ok(())
}
