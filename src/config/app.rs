//! Boot-time application settings.
//!
//! Everything is read once at startup from the environment (after `.env` has
//! been loaded). Unset variables fall back to the defaults the register ships
//! with: the sale page on port 80, the admin page on port 8080.

use crate::errors::{Error, Result};
use std::{net::SocketAddr, path::PathBuf, str::FromStr, time::Duration};

/// Sale endpoint address when `SALE_ADDR` is unset.
pub const DEFAULT_SALE_ADDR: &str = "0.0.0.0:80";
/// Admin endpoint address when `ADMIN_ADDR` is unset.
pub const DEFAULT_ADMIN_ADDR: &str = "0.0.0.0:8080";
/// Image file when `STORE_PATH` is unset.
pub const DEFAULT_STORE_PATH: &str = "data/register.img";
/// Seed product file when `PRODUCTS_CONFIG` is unset.
pub const DEFAULT_PRODUCTS_CONFIG: &str = "config.toml";
/// Restart pause when `RESTART_DELAY_MS` is unset.
pub const DEFAULT_RESTART_DELAY_MS: u64 = 1000;

/// Settings the register boots with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Where the sale endpoint listens
    pub sale_addr: SocketAddr,
    /// Where the admin endpoint listens
    pub admin_addr: SocketAddr,
    /// Image file holding the persisted catalog and ledger
    pub store_path: PathBuf,
    /// TOML file with the seed product list
    pub products_config: PathBuf,
    /// Pause between acknowledging a sales reset and restarting
    pub restart_delay: Duration,
}

impl AppConfig {
    /// Reads `SALE_ADDR`, `ADMIN_ADDR`, `STORE_PATH`, `PRODUCTS_CONFIG` and
    /// `RESTART_DELAY_MS` from the process environment.
    ///
    /// # Errors
    /// Returns [`Error::Config`] for a malformed value or when both endpoints
    /// would share one address.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but with an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let sale_addr: SocketAddr = parse_var(&lookup, "SALE_ADDR", DEFAULT_SALE_ADDR)?;
        let admin_addr: SocketAddr = parse_var(&lookup, "ADMIN_ADDR", DEFAULT_ADMIN_ADDR)?;
        if sale_addr == admin_addr {
            return Err(Error::Config {
                message: format!("SALE_ADDR and ADMIN_ADDR must differ, both are {sale_addr}"),
            });
        }

        let restart_delay_ms: u64 = parse_var(
            &lookup,
            "RESTART_DELAY_MS",
            &DEFAULT_RESTART_DELAY_MS.to_string(),
        )?;

        Ok(Self {
            sale_addr,
            admin_addr,
            store_path: lookup("STORE_PATH")
                .unwrap_or_else(|| DEFAULT_STORE_PATH.to_string())
                .into(),
            products_config: lookup("PRODUCTS_CONFIG")
                .unwrap_or_else(|| DEFAULT_PRODUCTS_CONFIG.to_string())
                .into(),
            restart_delay: Duration::from_millis(restart_delay_ms),
        })
    }
}

fn parse_var<F, T>(lookup: &F, key: &str, default: &str) -> Result<T>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let raw = lookup(key).unwrap_or_else(|| default.to_string());
    raw.trim().parse().map_err(|e| Error::Config {
        message: format!("Invalid {key} '{raw}': {e}"),
    })
}
