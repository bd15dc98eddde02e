// Application configuration, loaded from environment variables and CLI flags.

use std::net::IpAddr;
use std::path::PathBuf;

use serde::Serialize;

/// Longest accepted admin token lifetime (one year).
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

/// Password used when `ADMIN_PASSWORD` is unset. Startup logs a warning.
pub const DEFAULT_ADMIN_PASSWORD: &str = "admin123";

/// Site branding served to the front end at `/api/config`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SiteConfig {
    #[serde(rename = "serverIP")]
    pub server_ip: String,
    #[serde(rename = "serverName")]
    pub server_name: String,
    #[serde(rename = "siteName")]
    pub site_name: String,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            server_ip: "mcpvp.club".to_string(),
            server_name: "PvP Club".to_string(),
            site_name: "StarTiers".to_string(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind the HTTP server to.
    pub bind_addr: IpAddr,
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// SQLite connection string. `None` keeps players in memory.
    pub database_url: Option<String>,
    /// Whether a fresh store starts with the default players.
    pub seed_players: bool,
    pub admin_password: String,
    /// Token signing key. `None` means a random key per process.
    pub jwt_secret: Option<String>,
    pub admin_token_ttl_hours: i64,
    /// Whether to run in local mode (privileged routes need no token).
    pub local_mode: bool,
    /// Directory containing pre-built frontend files to serve.
    pub static_dir: Option<PathBuf>,
    pub site: SiteConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::from([0, 0, 0, 0]),
            port: 5000,
            database_url: None,
            seed_players: true,
            admin_password: DEFAULT_ADMIN_PASSWORD.to_string(),
            jwt_secret: None,
            admin_token_ttl_hours: 12,
            local_mode: false,
            static_dir: None,
            site: SiteConfig::default(),
        }
    }
}

impl Config {
    /// Load configuration from the process environment and arguments.
    ///
    /// Environment variables:
    /// - `PORT` - HTTP server port (default: 5000)
    /// - `BIND_ADDR` - listen address (default: `0.0.0.0`)
    /// - `DATABASE_URL` - SQLite connection string; unset keeps data in memory
    /// - `SEED_PLAYERS` - `false` or `0` starts with an empty store
    /// - `ADMIN_PASSWORD` - admin password (default: `admin123`)
    /// - `JWT_SECRET` - admin token signing key (default: random per process)
    /// - `ADMIN_TOKEN_TTL_HOURS` - admin token lifetime, 1 to 8760 (default: 12)
    /// - `STARTIERS_LOCAL_MODE` - `true` to skip admin token checks
    /// - `STATIC_DIR` - frontend dist directory for static file serving
    /// - `SERVER_IP`, `SERVER_NAME`, `SITE_NAME` - site branding
    ///
    /// CLI flags:
    /// - `--local` - Enable local mode (same as `STARTIERS_LOCAL_MODE=true`)
    /// - `--port <PORT>` - Override the port
    /// - `--no-seed` - Start with an empty store
    pub fn load() -> Self {
        let args: Vec<String> = std::env::args().collect();
        Self::from_sources(&args, |key| std::env::var(key).ok())
    }

    /// Build a config from explicit arguments and an environment lookup.
    pub fn from_sources(args: &[String], env: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Config::default();

        // Port: CLI flag --port takes precedence, then env var, then default
        let port = Self::parse_cli_value(args, "--port")
            .and_then(|v| v.parse().ok())
            .or_else(|| env("PORT").and_then(|v| v.parse().ok()))
            .unwrap_or(defaults.port);

        let bind_addr = env("BIND_ADDR")
            .and_then(|v| v.parse().ok())
            .unwrap_or(defaults.bind_addr);

        let database_url = env("DATABASE_URL").filter(|v| !v.is_empty());

        let seed_players = !args.iter().any(|a| a == "--no-seed")
            && env("SEED_PLAYERS")
                .map(|v| !(v.eq_ignore_ascii_case("false") || v == "0"))
                .unwrap_or(true);

        let admin_password = env("ADMIN_PASSWORD")
            .filter(|v| !v.is_empty())
            .unwrap_or(defaults.admin_password);

        let jwt_secret = env("JWT_SECRET").filter(|v| !v.is_empty());

        let admin_token_ttl_hours = env("ADMIN_TOKEN_TTL_HOURS")
            .and_then(|v| v.parse().ok())
            .filter(|h: &i64| (1..=MAX_TOKEN_TTL_HOURS).contains(h))
            .unwrap_or(defaults.admin_token_ttl_hours);

        let local_mode = args.iter().any(|a| a == "--local")
            || env("STARTIERS_LOCAL_MODE")
                .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
                .unwrap_or(false);

        let static_dir = env("STATIC_DIR").map(PathBuf::from);

        let site = SiteConfig {
            server_ip: env("SERVER_IP").unwrap_or(defaults.site.server_ip),
            server_name: env("SERVER_NAME").unwrap_or(defaults.site.server_name),
            site_name: env("SITE_NAME").unwrap_or(defaults.site.site_name),
        };

        Config {
            bind_addr,
            port,
            database_url,
            seed_players,
            admin_password,
            jwt_secret,
            admin_token_ttl_hours,
            local_mode,
            static_dir,
            site,
        }
    }

    /// Parse a CLI flag value like `--port 8080`.
    fn parse_cli_value(args: &[String], flag: &str) -> Option<String> {
        args.windows(2).find_map(|pair| {
            if pair[0] == flag {
                Some(pair[1].clone())
            } else {
                None
            }
        })
    }

    pub fn uses_default_password(&self) -> bool {
        self.admin_password == DEFAULT_ADMIN_PASSWORD
    }
}
