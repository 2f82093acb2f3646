use anyhow::{bail, Context};
use secrecy::{ExposeSecret, SecretString};

#[derive(Debug)]
pub struct JwtConfig {
    pub secret: SecretString,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
}

/// Argon2 work factor. Raising `iterations` or `memory_kib` makes every
/// hash (and every login) proportionally slower.
#[derive(Debug, Clone, Copy)]
pub struct PasswordConfig {
    pub iterations: u32,
    pub memory_kib: u32,
    pub parallelism: u32,
}

impl Default for PasswordConfig {
    fn default() -> Self {
        Self {
            iterations: 2,
            memory_kib: 19_456,
            parallelism: 1,
        }
    }
}

#[derive(Debug)]
pub struct AppConfig {
    /// `None` selects the in-memory user store.
    pub database_url: Option<String>,
    pub jwt: JwtConfig,
    pub password: PasswordConfig,
    pub host: String,
    pub port: u16,
}

impl JwtConfig {
    fn validate(&self) -> anyhow::Result<()> {
        if self.secret.expose_secret().trim().is_empty() {
            bail!("JWT_SECRET must not be empty");
        }
        if self.ttl_minutes <= 0 {
            bail!("JWT_TTL_MINUTES must be positive, got {}", self.ttl_minutes);
        }
        Ok(())
    }
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let secret = std::env::var("JWT_SECRET").context("JWT_SECRET is not set")?;
        let jwt = JwtConfig {
            secret: SecretString::from(secret),
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "coursehub".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "coursehub-users".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES")?.unwrap_or(60 * 24),
        };
        jwt.validate()?;
        let defaults = PasswordConfig::default();
        let password = PasswordConfig {
            iterations: env_parse("PASSWORD_HASH_ITERATIONS")?.unwrap_or(defaults.iterations),
            memory_kib: env_parse("PASSWORD_HASH_MEMORY_KIB")?.unwrap_or(defaults.memory_kib),
            parallelism: env_parse("PASSWORD_HASH_PARALLELISM")?.unwrap_or(defaults.parallelism),
        };
        Ok(Self {
            database_url,
            jwt,
            password,
            host: std::env::var("APP_HOST").unwrap_or_else(|_| "0.0.0.0".into()),
            port: env_parse("APP_PORT")?.unwrap_or(3000),
        })
    }
}

/// Unset means "use the default"; set but unparsable is a startup error.
fn env_parse<T: std::str::FromStr>(key: &str) -> anyhow::Result<Option<T>> {
    parse_var(key, std::env::var(key).ok())
}

fn parse_var<T: std::str::FromStr>(key: &str, raw: Option<String>) -> anyhow::Result<Option<T>> {
    match raw {
        None => Ok(None),
        Some(v) => match v.trim().parse::<T>() {
            Ok(parsed) => Ok(Some(parsed)),
            Err(_) => bail!("{key} has an invalid value: {v:?}"),
        },
    }
}
