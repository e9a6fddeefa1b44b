use std::{
    env,
    net::{AddrParseError, SocketAddr},
};

use thiserror::Error;

#[derive(Clone, Debug)]
pub struct Config {
    pub service_name: String,
    pub bind_addr: SocketAddr,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid ISSUE_SERVICE_BIND_ADDR: {0}")]
    BindAddrParse(#[from] AddrParseError),
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind_addr = env::var("ISSUE_SERVICE_BIND_ADDR")
            .unwrap_or_else(|_| "127.0.0.1:8080".to_string())
            .parse()?;
        let service_name =
            env::var("ISSUE_SERVICE_NAME").unwrap_or_else(|_| "issue-service".to_string());
        Ok(Self {
            service_name,
            bind_addr,
        })
    }
}
