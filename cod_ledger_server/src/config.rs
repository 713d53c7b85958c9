use std::{env, fmt::Display, io::Write, str::FromStr, time::Duration as StdDuration};

use chrono::Duration;
use cod_common::{
    helpers::{env_value, parse_boolean_flag},
    Secret,
};
use cod_ledger_engine::helpers::{ConfirmationCodePolicy, RetryPolicy, SubmissionAllocation};
use log::*;
use rand::{distributions::Alphanumeric, thread_rng, Rng};
use tempfile::NamedTempFile;

use crate::errors::ServerError;

const DEFAULT_COD_HOST: &str = "127.0.0.1";
const DEFAULT_COD_PORT: u16 = 8470;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 25;
const DEFAULT_TX_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_TX_RETRY_BACKOFF_MS: u64 = 50;
const DEFAULT_OTP_TTL_MINUTES: i64 = 240;
const DEFAULT_OTP_MAX_RESENDS: i64 = 3;
const DEFAULT_TOKEN_LIFETIME: Duration = Duration::hours(24);
const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub max_connections: u32,
    /// Apply the embedded migrations on start-up.
    pub run_migrations: bool,
    pub auth: AuthConfig,
    pub ledger: LedgerOptions,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_COD_HOST.to_string(),
            port: DEFAULT_COD_PORT,
            database_url: String::default(),
            max_connections: DEFAULT_DB_MAX_CONNECTIONS,
            run_migrations: true,
            auth: AuthConfig::default(),
            ledger: LedgerOptions::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("COD_HOST").ok().unwrap_or_else(|| {
            info!("🪛️ COD_HOST is not set. Using the default, {DEFAULT_COD_HOST}.");
            DEFAULT_COD_HOST.into()
        });
        let port = env_or_default("COD_PORT", DEFAULT_COD_PORT);
        let database_url = env::var("COD_DATABASE_URL").ok().unwrap_or_else(|| {
            error!("🪛️ COD_DATABASE_URL is not set. Please set it to the URL for the ledger database.");
            String::default()
        });
        let max_connections = env_or_default("COD_DB_MAX_CONNECTIONS", DEFAULT_DB_MAX_CONNECTIONS);
        let run_migrations = parse_boolean_flag(env::var("COD_RUN_MIGRATIONS").ok(), true);
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let ledger = LedgerOptions::from_env_or_default();
        Self { host, port, database_url, max_connections, run_migrations, auth, ledger }
    }
}

/// Reads `name` from the environment, logging and falling back to `default` if it is missing or invalid.
fn env_or_default<T>(name: &str, default: T) -> T
where
    T: FromStr + Display,
    T::Err: Display,
{
    match env_value::<T>(name) {
        Ok(Some(v)) => v,
        Ok(None) => {
            info!("🪛️ {name} is not set. Using the default value of {default}.");
            default
        },
        Err(e) => {
            warn!("🪛️ {e} Using the default value of {default} instead.");
            default
        },
    }
}

//-------------------------------------------------  LedgerOptions  ----------------------------------------------------
/// The tunable behaviour of the ledger APIs.
#[derive(Clone, Copy, Debug, Default)]
pub struct LedgerOptions {
    /// How a declared submission amount is spread over the submitted collections.
    pub allocation: SubmissionAllocation,
    /// Whole-operation retry for transactions the database aborted.
    pub retry: RetryPolicy,
    /// Lifetime and resend allowance of delivery-confirmation codes.
    pub confirmation: ConfirmationCodePolicy,
}

impl LedgerOptions {
    pub fn from_env_or_default() -> Self {
        let allocation = env_or_default("COD_SUBMISSION_ALLOCATION", SubmissionAllocation::default());
        let max_attempts = env_or_default("COD_TX_MAX_ATTEMPTS", DEFAULT_TX_MAX_ATTEMPTS);
        let backoff_ms = env_or_default("COD_TX_RETRY_BACKOFF_MS", DEFAULT_TX_RETRY_BACKOFF_MS);
        let retry = RetryPolicy::new(max_attempts, StdDuration::from_millis(backoff_ms));
        let ttl_minutes = env_or_default("COD_OTP_TTL_MINUTES", DEFAULT_OTP_TTL_MINUTES);
        let ttl = if ttl_minutes > 0 {
            Duration::minutes(ttl_minutes)
        } else {
            warn!("🪛️ COD_OTP_TTL_MINUTES must be positive. Using the default value of {DEFAULT_OTP_TTL_MINUTES}.");
            Duration::minutes(DEFAULT_OTP_TTL_MINUTES)
        };
        let max_resends = env_or_default("COD_OTP_MAX_RESENDS", DEFAULT_OTP_MAX_RESENDS).max(0);
        let confirmation = ConfirmationCodePolicy { ttl, max_resends };
        Self { allocation, retry, confirmation }
    }
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// The HMAC secret used to sign and verify access tokens (HS256).
    pub jwt_secret: Secret<String>,
    /// The lifetime given to tokens issued by this server.
    pub token_lifetime: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let mut tmpfile = NamedTempFile::new().ok().and_then(|f| f.keep().ok());
        warn!(
            "🚨️🚨️🚨️ The JWT secret has not been set. I'm using a random value for this session. DO NOT operate on \
             production like this since every issued token will stop working when the server restarts. 🚨️🚨️🚨️"
        );
        let secret = random_secret();
        match &mut tmpfile {
            Some((f, p)) => match writeln!(f, "{secret}") {
                Ok(()) => warn!(
                    "🚨️🚨️🚨️ The JWT secret for this session was written to {}. If this is a production instance, you \
                     are doing it wrong! Set the COD_JWT_SECRET environment variable instead. 🚨️🚨️🚨️",
                    p.to_str().unwrap_or("???")
                ),
                Err(e) => warn!("🪛️ Could not write the JWT secret to the temporary file. {e}"),
            },
            None => {
                warn!("🪛️ Could not create a temporary file to store the JWT secret.");
            },
        }
        Self { jwt_secret: Secret::new(secret), token_lifetime: DEFAULT_TOKEN_LIFETIME }
    }
}

impl AuthConfig {
    pub fn new<S: Into<String>>(secret: S) -> Self {
        Self { jwt_secret: Secret::new(secret.into()), token_lifetime: DEFAULT_TOKEN_LIFETIME }
    }

    pub fn try_from_env() -> Result<Self, ServerError> {
        let secret =
            env::var("COD_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [COD_JWT_SECRET]")))?;
        if secret.len() < MIN_JWT_SECRET_LENGTH {
            return Err(ServerError::ConfigurationError(format!(
                "COD_JWT_SECRET must be at least {MIN_JWT_SECRET_LENGTH} characters long"
            )));
        }
        Ok(Self::new(secret))
    }
}

fn random_secret() -> String {
    thread_rng().sample_iter(&Alphanumeric).take(64).map(char::from).collect()
}
