use std::{env, io::Write, net::IpAddr};

use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tempfile::NamedTempFile;
use topup_common::{parse_boolean_flag, Secret};

use crate::errors::ServerError;

const DEFAULT_TOPUP_HOST: &str = "127.0.0.1";
const DEFAULT_TOPUP_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/topup_store.db";
const DEFAULT_JWT_EXPIRY_DAYS: i64 = 7;
const DEFAULT_SIGNATURE_HEADER: &str = "X-Signature";
pub const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    /// Run the embedded database migrations when the server starts.
    pub auto_migrate: bool,
    pub gateway: GatewayConfig,
    /// Credentials for the admin account that is created at startup, if it does not exist yet.
    pub admin: Option<AdminBootstrap>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_TOPUP_HOST.to_string(),
            port: DEFAULT_TOPUP_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            auto_migrate: true,
            gateway: GatewayConfig::default(),
            admin: None,
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("TOPUP_HOST").ok().unwrap_or_else(|| DEFAULT_TOPUP_HOST.into());
        let port = env::var("TOPUP_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!(
                        "🪛️ {s} is not a valid port for TOPUP_PORT. {e} Using the default, {DEFAULT_TOPUP_PORT}, \
                         instead."
                    );
                    DEFAULT_TOPUP_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_TOPUP_PORT);
        let database_url = env::var("TOPUP_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ TOPUP_DATABASE_URL is not set. Using the default, {DEFAULT_DATABASE_URL}.");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("TOPUP_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("TOPUP_USE_FORWARDED").ok(), false);
        let auto_migrate = parse_boolean_flag(env::var("TOPUP_AUTO_MIGRATE").ok(), true);
        let gateway = GatewayConfig::from_env_or_defaults();
        let admin = AdminBootstrap::from_env();
        Self { host, port, database_url, auth, use_x_forwarded_for, use_forwarded, auto_migrate, gateway, admin }
    }
}

//-------------------------------------------------  GatewayConfig  ----------------------------------------------------
/// Settings for the payment gateway webhook.
#[derive(Clone, Debug)]
pub struct GatewayConfig {
    /// The key used to sign webhook bodies.
    pub hmac_secret: Secret<String>,
    /// If false, webhook signatures are not checked at all. **DANGER**
    pub hmac_checks: bool,
    /// The header carrying the base64-encoded signature.
    pub signature_header: String,
    /// If supplied, webhook requests are only accepted from these addresses.
    /// To explicitly disable the whitelist, set this to "false", "none", or "0".
    pub whitelist: Option<Vec<IpAddr>>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            hmac_secret: Secret::default(),
            hmac_checks: true,
            signature_header: DEFAULT_SIGNATURE_HEADER.to_string(),
            whitelist: None,
        }
    }
}

impl GatewayConfig {
    pub fn from_env_or_defaults() -> Self {
        let hmac_secret = env::var("TOPUP_GATEWAY_HMAC_SECRET").ok().unwrap_or_else(|| {
            error!(
                "🪛️ TOPUP_GATEWAY_HMAC_SECRET is not set. Please set it to the key your payment gateway signs webhook \
                 calls with."
            );
            String::default()
        });
        let hmac_checks = parse_boolean_flag(env::var("TOPUP_GATEWAY_HMAC_CHECKS").ok(), true);
        if !hmac_checks {
            warn!("🚨️ Webhook signature checks are DISABLED. Anyone can mark orders as paid. 🚨️");
        }
        let signature_header =
            env::var("TOPUP_GATEWAY_SIGNATURE_HEADER").ok().filter(|s| !s.trim().is_empty()).unwrap_or_else(|| {
                debug!("🪛️ TOPUP_GATEWAY_SIGNATURE_HEADER is not set. Using {DEFAULT_SIGNATURE_HEADER}.");
                DEFAULT_SIGNATURE_HEADER.to_string()
            });
        let whitelist = env::var("TOPUP_GATEWAY_IP_WHITELIST").ok().and_then(|s| parse_whitelist(&s));
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The gateway IP whitelist was configured, but is empty.  The server will run, but won't \
                     authorise any incoming webhook requests."
                );
            },
            None => {
                info!("🪛️ No gateway IP whitelist is set. Only signature validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Gateway IP whitelist: {addrs}");
            },
        }
        Self { hmac_secret: Secret::new(hmac_secret), hmac_checks, signature_header, whitelist }
    }
}

/// Parses a comma-separated list of IP addresses. Invalid entries are skipped. "none", "false" and "0" mean that no
/// whitelist is used.
pub fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0"].contains(&s.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ Gateway IP whitelist is disabled. If this is not what you want, set TOPUP_GATEWAY_IP_WHITELIST to a \
             comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse::<IpAddr>()
                .map_err(|e| warn!("🪛️ Ignoring invalid IP address ({s}) in TOPUP_GATEWAY_IP_WHITELIST: {e}"))
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HS256 key used to sign and verify access tokens.
    pub jwt_secret: Secret<String>,
    /// How long an access token stays valid.
    pub jwt_expiry: chrono::Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this since every token becomes invalid when the server restarts. 🚨️🚨️🚨️"
        );
        let secret = thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect::<String>();
        match &mut tmpfile {
            Some((f, p)) => match writeln!(f, "{secret}") {
                Ok(()) => warn!(
                    "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, you \
                     are doing it wrong! Set the TOPUP_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                    p.to_str().unwrap_or("???")
                ),
                Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret. ");
            },
        }
        Self { jwt_secret: Secret::new(secret), jwt_expiry: chrono::Duration::days(DEFAULT_JWT_EXPIRY_DAYS) }
    }
}

impl AuthConfig {
    pub fn new(secret: &str, expiry: chrono::Duration) -> Result<Self, ServerError> {
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ServerError::ConfigurationError(format!(
                "The JWT secret must be at least {MIN_JWT_SECRET_LENGTH} bytes long"
            )));
        }
        Ok(Self { jwt_secret: Secret::new(secret.to_string()), jwt_expiry: expiry })
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret = env::var("TOPUP_JWT_SECRET")
            .map_err(|e| ServerError::ConfigurationError(format!("{e} [TOPUP_JWT_SECRET]")))?;
        let days = match env::var("TOPUP_JWT_EXPIRY_DAYS") {
            Ok(s) => s.trim().parse::<i64>().ok().filter(|d| *d > 0).ok_or_else(|| {
                ServerError::ConfigurationError(format!("Invalid value for TOPUP_JWT_EXPIRY_DAYS: {s}"))
            })?,
            Err(_) => DEFAULT_JWT_EXPIRY_DAYS,
        };
        Self::new(&secret, chrono::Duration::days(days))
    }
}

//-------------------------------------------------  AdminBootstrap  ---------------------------------------------------
/// Admins cannot sign up through the API. If these are configured, the account is created when the server starts.
#[derive(Clone, Debug)]
pub struct AdminBootstrap {
    pub username: String,
    pub email: String,
    pub password: Secret<String>,
}

impl AdminBootstrap {
    pub fn from_env() -> Option<Self> {
        let username = env::var("TOPUP_ADMIN_USERNAME").ok().filter(|s| !s.trim().is_empty())?;
        let email = env::var("TOPUP_ADMIN_EMAIL").ok().filter(|s| !s.trim().is_empty());
        let password = env::var("TOPUP_ADMIN_PASSWORD").ok().filter(|s| !s.is_empty());
        match (email, password) {
            (Some(email), Some(password)) => {
                Some(Self { username: username.trim().to_string(), email, password: Secret::new(password) })
            },
            _ => {
                warn!(
                    "🪛️ TOPUP_ADMIN_USERNAME is set, but TOPUP_ADMIN_EMAIL or TOPUP_ADMIN_PASSWORD is missing. No \
                     admin account will be created."
                );
                None
            },
        }
    }
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
