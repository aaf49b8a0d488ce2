use clap::{Parser, ValueEnum};
use std::fmt::{Display, Formatter};
use std::net::SocketAddr;

pub const LISTEN_ADDR_ENV: &str = "SHORTBASE_LISTEN_ADDR";
pub const STORAGE_BACKEND_ENV: &str = "SHORTBASE_STORAGE_BACKEND";
pub const MYSQL_DSN_ENV: &str = "SHORTBASE_MYSQL_DSN";
pub const DOMAIN_ENV: &str = "SHORTBASE_DOMAIN";
pub const ACCESS_KEYS_ENV: &str = "SHORTBASE_ACCESS_KEYS";
pub const CACHE_BACKEND_ENV: &str = "SHORTBASE_CACHE_BACKEND";
pub const REDIS_URL_ENV: &str = "SHORTBASE_REDIS_URL";
pub const CACHE_CAPACITY_ENV: &str = "SHORTBASE_CACHE_CAPACITY";
pub const CACHE_IDLE_SECS_ENV: &str = "SHORTBASE_CACHE_IDLE_SECS";
pub const CACHE_TTL_SECS_ENV: &str = "SHORTBASE_CACHE_TTL_SECS";
pub const SHARD_COUNT_ENV: &str = "SHORTBASE_SHARD_COUNT";
pub const LOG_JSON_ENV: &str = "SHORTBASE_LOG_JSON";

pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:8080";
pub const DEFAULT_DOMAIN: &str = "http://127.0.0.1:8080/";

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StorageBackendArg {
    #[value(name = "in-memory")]
    InMemory,
    #[value(name = "mysql")]
    Mysql,
}

impl Display for StorageBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageBackendArg::InMemory => write!(f, "in-memory"),
            StorageBackendArg::Mysql => write!(f, "mysql"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum CacheBackendArg {
    #[value(name = "none")]
    None,
    #[value(name = "moka")]
    Moka,
    #[value(name = "redis")]
    Redis,
}

impl Display for CacheBackendArg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheBackendArg::None => write!(f, "none"),
            CacheBackendArg::Moka => write!(f, "moka"),
            CacheBackendArg::Redis => write!(f, "redis"),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "shortbase-gateway")]
pub struct CLI {
    #[arg(long, env = LISTEN_ADDR_ENV, default_value = DEFAULT_LISTEN_ADDR)]
    pub listen_addr: SocketAddr,

    #[arg(
        long,
        env = STORAGE_BACKEND_ENV,
        value_enum,
        default_value_t = StorageBackendArg::InMemory
    )]
    pub storage: StorageBackendArg,

    #[arg(long, env = MYSQL_DSN_ENV, required_if_eq("storage", "mysql"))]
    pub mysql_dsn: Option<String>,

    /// Prefix of returned short URLs.
    #[arg(long, env = DOMAIN_ENV, default_value = DEFAULT_DOMAIN)]
    pub domain: String,

    /// Comma separated keys allowed to create short URLs. Empty means open.
    #[arg(long, env = ACCESS_KEYS_ENV, value_delimiter = ',')]
    pub access_keys: Vec<String>,

    #[arg(
        long,
        env = CACHE_BACKEND_ENV,
        value_enum,
        default_value_t = CacheBackendArg::Moka
    )]
    pub cache: CacheBackendArg,

    #[arg(long, env = REDIS_URL_ENV, required_if_eq("cache", "redis"))]
    pub redis_url: Option<String>,

    #[arg(long, env = CACHE_CAPACITY_ENV, default_value_t = 10_000)]
    pub cache_capacity: u64,

    /// Sliding expiry of cached redirects.
    #[arg(long, env = CACHE_IDLE_SECS_ENV, default_value_t = 600)]
    pub cache_idle_secs: u64,

    #[arg(long, env = CACHE_TTL_SECS_ENV, default_value_t = 3600)]
    pub cache_ttl_secs: u64,

    #[arg(long, env = SHARD_COUNT_ENV, default_value_t = 99)]
    pub shard_count: usize,

    #[arg(long, env = LOG_JSON_ENV)]
    pub log_json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cli = CLI::try_parse_from(["shortbase-gateway"]).unwrap();

        assert_eq!(cli.listen_addr.to_string(), DEFAULT_LISTEN_ADDR);
        assert_eq!(cli.storage, StorageBackendArg::InMemory);
        assert_eq!(cli.cache, CacheBackendArg::Moka);
        assert_eq!(cli.shard_count, 99);
        assert!(cli.access_keys.is_empty());
        assert!(!cli.log_json);
    }

    #[test]
    fn mysql_requires_dsn() {
        assert!(CLI::try_parse_from(["shortbase-gateway", "--storage", "mysql"]).is_err());

        let cli = CLI::try_parse_from([
            "shortbase-gateway",
            "--storage",
            "mysql",
            "--mysql-dsn",
            "mysql://u:p@localhost/db",
        ])
        .unwrap();
        assert_eq!(cli.storage, StorageBackendArg::Mysql);
    }

    #[test]
    fn redis_requires_url() {
        assert!(CLI::try_parse_from(["shortbase-gateway", "--cache", "redis"]).is_err());
    }

    #[test]
    fn access_keys_are_comma_separated() {
        let cli =
            CLI::try_parse_from(["shortbase-gateway", "--access-keys", "alpha,beta"]).unwrap();
        assert_eq!(cli.access_keys, vec!["alpha", "beta"]);
    }
}
