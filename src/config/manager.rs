//! Configuration Manager

use super::Config;
use crate::Result;
use anyhow::{bail, Context};
use std::net::SocketAddr;
use std::path::Path;

/// Manages configuration loading and validation
pub struct ConfigManager;

impl ConfigManager {
    /// Load configuration from file
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if path.exists() {
            tracing::info!("Loading configuration from: {}", path.display());
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;

            let config: Config = toml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

            config
                .validate()
                .with_context(|| "Configuration validation failed")?;

            Ok(config)
        } else {
            tracing::warn!(
                "Configuration file not found at {}, using defaults",
                path.display()
            );
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }

    /// Load configuration from environment variables
    pub fn load_from_env() -> Result<Config> {
        let mut config = Config::default();

        if let Ok(bind_addr) = std::env::var("RUSTRELAY_BIND_ADDR") {
            config.server.bind_addr = bind_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid RUSTRELAY_BIND_ADDR: {}", bind_addr))?;
        }

        if let Ok(server_addr) = std::env::var("RUSTRELAY_SERVER_ADDR") {
            config.client.server_addr = server_addr
                .parse::<SocketAddr>()
                .with_context(|| format!("Invalid RUSTRELAY_SERVER_ADDR: {}", server_addr))?;
        }

        if let Ok(backlog) = std::env::var("RUSTRELAY_LISTEN_BACKLOG") {
            config.server.listen_backlog = backlog
                .parse::<u32>()
                .with_context(|| format!("Invalid RUSTRELAY_LISTEN_BACKLOG: {}", backlog))?;
        }

        if let Ok(buffer_size) = std::env::var("RUSTRELAY_RECV_BUFFER") {
            let buffer_size = buffer_size
                .parse::<usize>()
                .with_context(|| format!("Invalid RUSTRELAY_RECV_BUFFER: {}", buffer_size))?;
            config.server.recv_buffer_size = buffer_size;
            config.client.recv_buffer_size = buffer_size;
        }

        if let Ok(timeout) = std::env::var("RUSTRELAY_POLL_TIMEOUT") {
            let timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid RUSTRELAY_POLL_TIMEOUT: {}", timeout))?;
            config.server.poll_timeout = timeout;
            config.client.poll_timeout = timeout;
        }

        if let Ok(timeout) = std::env::var("RUSTRELAY_CONNECT_TIMEOUT") {
            config.client.connect_timeout = humantime::parse_duration(&timeout)
                .with_context(|| format!("Invalid RUSTRELAY_CONNECT_TIMEOUT: {}", timeout))?;
        }

        if let Ok(log_level) = std::env::var("RUSTRELAY_LOG_LEVEL") {
            config.monitoring.log_level = log_level;
        }

        config.validate()?;
        Ok(config)
    }
}

impl Config {
    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.validate_server_config()
            .with_context(|| "Server configuration validation failed")?;

        self.validate_client_config()
            .with_context(|| "Client configuration validation failed")?;

        self.validate_monitoring_config()
            .with_context(|| "Monitoring configuration validation failed")?;

        Ok(())
    }

    /// Validate server configuration
    fn validate_server_config(&self) -> Result<()> {
        if self.server.listen_backlog == 0 {
            bail!("listen_backlog must be greater than 0");
        }

        if self.server.recv_buffer_size < 64 {
            bail!("recv_buffer_size must be at least 64 bytes");
        }

        if self.server.recv_buffer_size > 1048576 {
            bail!("recv_buffer_size cannot exceed 1MB");
        }

        if self.server.poll_timeout.as_secs() == 0 {
            bail!("poll_timeout must be greater than 0");
        }

        if self.server.poll_timeout.as_secs() > 3600 {
            bail!("poll_timeout cannot exceed 1 hour");
        }

        Ok(())
    }

    /// Validate client configuration
    fn validate_client_config(&self) -> Result<()> {
        if self.client.recv_buffer_size < 64 {
            bail!("recv_buffer_size must be at least 64 bytes");
        }

        if self.client.recv_buffer_size > 1048576 {
            bail!("recv_buffer_size cannot exceed 1MB");
        }

        if self.client.connect_timeout.as_millis() == 0 {
            bail!("connect_timeout must be greater than 0");
        }

        if self.client.poll_timeout.as_secs() == 0 {
            bail!("poll_timeout must be greater than 0");
        }

        Ok(())
    }

    /// Validate monitoring configuration
    fn validate_monitoring_config(&self) -> Result<()> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&self.monitoring.log_level.as_str()) {
            bail!(
                "monitoring.log_level must be one of: {}",
                valid_log_levels.join(", ")
            );
        }

        Ok(())
    }

    /// Merge with CLI arguments
    pub fn merge_with_cli_args(
        &mut self,
        addr: Option<&str>,
        port: Option<u16>,
        buffer_size: Option<usize>,
        backlog: Option<u32>,
    ) {
        if let Some(addr_str) = addr {
            if let Ok(addr) = addr_str.parse::<SocketAddr>() {
                self.server.bind_addr = addr;
                self.client.server_addr = addr;
                tracing::info!("CLI override: address set to {}", addr);
            } else {
                tracing::warn!("Invalid address provided: {}", addr_str);
            }
        }

        if let Some(port) = port {
            self.server.bind_addr.set_port(port);
            self.client.server_addr.set_port(port);
            tracing::info!("CLI override: port set to {}", port);
        }

        if let Some(buffer_size) = buffer_size {
            self.server.recv_buffer_size = buffer_size;
            self.client.recv_buffer_size = buffer_size;
            tracing::info!("CLI override: receive buffer set to {} bytes", buffer_size);
        }

        if let Some(backlog) = backlog {
            self.server.listen_backlog = backlog;
            tracing::info!("CLI override: listen backlog set to {}", backlog);
        }
    }
}
