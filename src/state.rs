use std::sync::Arc;

use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use tracing::{info, warn};

use crate::auth::{jwt::JwtKeys, password::CredentialHasher, AuthService};
use crate::config::AppConfig;
use crate::courses::CourseCatalog;
use crate::users::{MemoryUserStore, PgUserStore, UserStore};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub auth: AuthService,
    pub courses: CourseCatalog,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let store: Arc<dyn UserStore> = match &config.database_url {
            Some(url) => {
                let db = PgPoolOptions::new()
                    .max_connections(10)
                    .connect(url)
                    .await
                    .context("connect to database")?;
                sqlx::migrate!("./migrations")
                    .run(&db)
                    .await
                    .context("run migrations")?;
                info!("using postgres user store");
                Arc::new(PgUserStore::new(db))
            }
            None => {
                warn!("DATABASE_URL not set; accounts are kept in memory only");
                Arc::new(MemoryUserStore::new())
            }
        };

        Self::from_parts(config, store)
    }

    pub fn from_parts(config: Arc<AppConfig>, store: Arc<dyn UserStore>) -> anyhow::Result<Self> {
        let hasher = CredentialHasher::new(config.password).context("build password hasher")?;
        let keys = JwtKeys::new(&config.jwt);
        Ok(Self {
            auth: AuthService::new(store, hasher, keys),
            courses: CourseCatalog::seeded(),
            config,
        })
    }

    /// In-memory state with cheap hashing, for tests.
    #[cfg(test)]
    pub fn fake() -> Self {
        Self::fake_with_store(Arc::new(MemoryUserStore::new()))
    }

    #[cfg(test)]
    pub fn fake_with_store(store: Arc<dyn UserStore>) -> Self {
        use crate::config::JwtConfig;
        use secrecy::SecretString;

        let config = Arc::new(AppConfig {
            database_url: None,
            jwt: JwtConfig {
                secret: SecretString::from("test".to_string()),
                issuer: "test-issuer".into(),
                audience: "test-aud".into(),
                ttl_minutes: 5,
            },
            password: crate::auth::password::test_config(),
            host: "127.0.0.1".into(),
            port: 0,
        });
        Self::from_parts(config, store).expect("fake state")
    }
}
