//! `ActorConfig`: job topology and timing, read from the environment keys
//! in the external-interfaces section. `from_env` is the production path;
//! tests build a config directly so they don't depend on process state.

use std::env;

use mlps_core::node::NodeRole;

use crate::error::{ClusterError, ClusterResult};

#[derive(Debug, Clone)]
pub struct ActorConfig {
    pub root_uri: String,
    pub root_port: u16,
    pub node_uri: String,
    pub node_port: u16,
    pub node_role: NodeRole,
    pub server_count: usize,
    pub worker_count: usize,
    pub heartbeat_interval_ms: u64,
    pub heartbeat_timeout_ms: u64,
    pub is_resending_enabled: bool,
    pub resending_timeout_ms: u64,
    pub resending_retry: u32,
    pub drop_rate: f64,
    pub is_local_mode: bool,
    pub bind_retry: u32,
}

impl Default for ActorConfig {
    fn default() -> Self {
        ActorConfig {
            root_uri: "127.0.0.1".to_string(),
            root_port: 0,
            node_uri: "127.0.0.1".to_string(),
            node_port: 0,
            node_role: NodeRole::Worker,
            server_count: 1,
            worker_count: 1,
            heartbeat_interval_ms: 1_000,
            heartbeat_timeout_ms: 10_000,
            is_resending_enabled: false,
            resending_timeout_ms: 1_000,
            resending_retry: 5,
            drop_rate: 0.0,
            is_local_mode: false,
            bind_retry: 3,
        }
    }
}

impl ActorConfig {
    /// Read configuration from the environment keys named in the external
    /// interfaces section. Any key not present falls back to its default.
    pub fn from_env() -> ClusterResult<ActorConfig> {
        let mut config = ActorConfig::default();
        if let Ok(v) = env::var("root_uri") {
            config.root_uri = v;
        }
        if let Some(v) = parse_env("root_port")? {
            config.root_port = v;
        }
        if let Ok(v) = env::var("node_uri") {
            config.node_uri = v;
        }
        if let Some(v) = parse_env("node_port")? {
            config.node_port = v;
        }
        if let Ok(v) = env::var("node_role") {
            config.node_role = v.parse().map_err(|e: mlps_core::node::UnknownNodeRole| {
                ClusterError::BadConfig(e.to_string())
            })?;
        }
        if let Some(v) = parse_env("server_count")? {
            config.server_count = v;
        }
        if let Some(v) = parse_env("worker_count")? {
            config.worker_count = v;
        }
        if let Some(v) = parse_env("heartbeat_interval")? {
            config.heartbeat_interval_ms = v;
        }
        if let Some(v) = parse_env("heartbeat_timeout")? {
            config.heartbeat_timeout_ms = v;
        }
        if let Some(v) = parse_env("is_resending_enabled")? {
            config.is_resending_enabled = v;
        }
        if let Some(v) = parse_env("resending_timeout")? {
            config.resending_timeout_ms = v;
        }
        if let Some(v) = parse_env("resending_retry")? {
            config.resending_retry = v;
        }
        if let Some(v) = parse_env("drop_rate")? {
            config.drop_rate = v;
        }
        if let Some(v) = parse_env("is_local_mode")? {
            config.is_local_mode = v;
        }
        if let Some(v) = parse_env("bind_retry")? {
            config.bind_retry = v;
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ClusterResult<()> {
        if !(0.0..=1.0).contains(&self.drop_rate) {
            return Err(ClusterError::BadConfig(format!(
                "drop_rate must be within [0, 1], got {}",
                self.drop_rate
            )));
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> ClusterResult<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(v) => v
            .parse::<T>()
            .map(Some)
            .map_err(|e| ClusterError::BadConfig(format!("{key}: {e}"))),
        Err(env::VarError::NotPresent) => Ok(None),
        Err(env::VarError::NotUnicode(_)) => {
            Err(ClusterError::BadConfig(format!("{key}: not valid unicode")))
        }
    }
}
