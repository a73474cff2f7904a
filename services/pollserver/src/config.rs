use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::net::SocketAddr;

/// Development fallback used when no secret is configured. Matches the
/// upstream sign-in service's default so locally minted cookies verify.
pub const DEV_SESSION_SECRET: &str = "dev_secret_change_me";

// Poll server configuration sourced from environment variables.
#[derive(Debug, Clone)]
pub struct PollServerConfig {
    pub bind_addr: SocketAddr,
    pub metrics_bind: SocketAddr,
    pub session_secret: String,
}

#[derive(Debug, Deserialize)]
struct PollServerConfigOverride {
    bind_addr: Option<String>,
    metrics_bind: Option<String>,
    session_secret: Option<String>,
}

impl PollServerConfig {
    pub fn from_env() -> Result<Self> {
        let bind_addr = std::env::var("LIVEPOLL_BIND")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()
            .with_context(|| "parse LIVEPOLL_BIND")?;
        let metrics_bind = std::env::var("LIVEPOLL_METRICS_BIND")
            .unwrap_or_else(|_| "0.0.0.0:9090".to_string())
            .parse()
            .with_context(|| "parse LIVEPOLL_METRICS_BIND")?;
        let session_secret = std::env::var("LIVEPOLL_SESSION_SECRET").unwrap_or_else(|_| {
            tracing::warn!("LIVEPOLL_SESSION_SECRET not set, using the development default");
            DEV_SESSION_SECRET.to_string()
        });
        Ok(Self {
            bind_addr,
            metrics_bind,
            session_secret,
        })
    }

    pub fn from_env_or_yaml() -> Result<Self> {
        let mut config = Self::from_env()?;
        if let Ok(path) = std::env::var("LIVEPOLL_CONFIG") {
            let contents =
                fs::read_to_string(&path).with_context(|| format!("read LIVEPOLL_CONFIG: {path}"))?;
            let override_cfg: PollServerConfigOverride =
                serde_yaml::from_str(&contents).with_context(|| "parse poll server config yaml")?;
            if let Some(value) = override_cfg.bind_addr {
                config.bind_addr = value.parse().with_context(|| "parse bind_addr")?;
            }
            if let Some(value) = override_cfg.metrics_bind {
                config.metrics_bind = value.parse().with_context(|| "parse metrics_bind")?;
            }
            if let Some(value) = override_cfg.session_secret {
                config.session_secret = value;
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    struct EnvGuard {
        key: &'static str,
        prev: Option<String>,
    }

    impl EnvGuard {
        fn set(key: &'static str, value: &str) -> Self {
            let prev = std::env::var(key).ok();
            unsafe {
                std::env::set_var(key, value);
            }
            Self { key, prev }
        }

        fn unset(key: &'static str) -> Self {
            let prev = std::env::var(key).ok();
            unsafe {
                std::env::remove_var(key);
            }
            Self { key, prev }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            match &self.prev {
                Some(value) => unsafe {
                    std::env::set_var(self.key, value);
                },
                None => unsafe {
                    std::env::remove_var(self.key);
                },
            }
        }
    }

    #[test]
    #[serial]
    fn from_env_uses_defaults() {
        let _g1 = EnvGuard::unset("LIVEPOLL_BIND");
        let _g2 = EnvGuard::unset("LIVEPOLL_METRICS_BIND");
        let _g3 = EnvGuard::unset("LIVEPOLL_SESSION_SECRET");
        let _g4 = EnvGuard::unset("LIVEPOLL_CONFIG");

        let config = PollServerConfig::from_env().expect("config");
        assert_eq!(config.bind_addr.port(), 3000);
        assert_eq!(config.metrics_bind.port(), 9090);
        assert_eq!(config.session_secret, DEV_SESSION_SECRET);
    }

    #[test]
    #[serial]
    fn from_env_reads_overridden_values() {
        let _g1 = EnvGuard::set("LIVEPOLL_BIND", "127.0.0.1:4100");
        let _g2 = EnvGuard::set("LIVEPOLL_SESSION_SECRET", "hunter2");
        let _g3 = EnvGuard::unset("LIVEPOLL_METRICS_BIND");

        let config = PollServerConfig::from_env().expect("config");
        assert_eq!(config.bind_addr.port(), 4100);
        assert_eq!(config.session_secret, "hunter2");
    }

    #[test]
    #[serial]
    fn invalid_bind_addr_is_an_error() {
        let _g1 = EnvGuard::set("LIVEPOLL_BIND", "not-an-addr");
        let err = PollServerConfig::from_env().err().expect("parse failure");
        assert!(err.to_string().contains("LIVEPOLL_BIND"));
    }

    #[test]
    #[serial]
    fn yaml_override_wins_over_env() {
        let dir = std::env::temp_dir().join("pollserver-config-test");
        std::fs::create_dir_all(&dir).expect("tempdir");
        let path = dir.join("override.yaml");
        std::fs::write(&path, "bind_addr: \"127.0.0.1:4200\"\n").expect("write override");

        let _g1 = EnvGuard::unset("LIVEPOLL_BIND");
        let _g2 = EnvGuard::unset("LIVEPOLL_METRICS_BIND");
        let _g3 = EnvGuard::set("LIVEPOLL_SESSION_SECRET", "from-env");
        let _g4 = EnvGuard::set("LIVEPOLL_CONFIG", path.to_str().expect("utf8 path"));

        let config = PollServerConfig::from_env_or_yaml().expect("config");
        assert_eq!(config.bind_addr.port(), 4200);
        // Fields absent from the override keep their env values.
        assert_eq!(config.session_secret, "from-env");
    }
}
