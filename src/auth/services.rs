use std::sync::Arc;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{LoginRequest, LoginResponse, RegisterRequest, RegisterResponse, UpdateAccountRequest},
    jwt::JwtKeys,
    password::CredentialHasher,
};
use crate::{
    error::AppError,
    users::{Account, AccountPatch, NewAccount, PublicAccount, Role, StoreError, UserStore},
};

pub(crate) const MIN_PASSWORD_LEN: usize = 6;

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Explicit usernames never contain `@`, so they cannot collide with the
/// email-derived default.
pub(crate) fn is_valid_username(username: &str) -> bool {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_.-]{3,32}$").unwrap();
    }
    USERNAME_RE.is_match(username)
}

fn validate_password(password: &str) -> Result<(), AppError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::Validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Registration, login and account management over a `UserStore`.
#[derive(Clone)]
pub struct AuthService {
    store: Arc<dyn UserStore>,
    hasher: CredentialHasher,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(store: Arc<dyn UserStore>, hasher: CredentialHasher, keys: JwtKeys) -> Self {
        Self {
            store,
            hasher,
            keys,
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    #[instrument(skip_all)]
    pub async fn register(&self, req: RegisterRequest) -> Result<RegisterResponse, AppError> {
        let email = normalize_email(&req.email);
        if !is_valid_email(&email) {
            warn!(email = %email, "invalid email");
            return Err(AppError::Validation("Invalid email".into()));
        }
        validate_password(&req.password)?;

        let username = match non_blank(req.username) {
            Some(name) if !is_valid_username(&name) => {
                return Err(AppError::Validation(
                    "Username must be 3-32 characters of letters, digits, '_', '.' or '-'".into(),
                ));
            }
            Some(name) => name,
            None => email.clone(),
        };

        let role = req.role.unwrap_or_default();
        if role == Role::Admin {
            return Err(AppError::Validation(
                "Admin accounts cannot be self-registered".into(),
            ));
        }

        if self.store.find_by_email(&email).await?.is_some() {
            warn!(email = %email, "email already registered");
            return Err(AppError::AccountExists);
        }
        if self.store.find_by_username(&username).await?.is_some() {
            warn!(username = %username, "username already taken");
            return Err(AppError::AccountExists);
        }

        let password_hash = self.hasher.hash_async(req.password).await?;

        let account = self
            .store
            .create(NewAccount {
                username,
                email,
                password_hash,
                firstname: non_blank(req.firstname),
                lastname: non_blank(req.lastname),
                current_organisation: non_blank(req.current_organisation),
                bio: non_blank(req.bio),
                role,
            })
            .await
            .map_err(|e| {
                if let StoreError::DuplicateKey(field) = &e {
                    warn!(field = *field, "concurrent registration lost the race");
                }
                AppError::from(e)
            })?;

        let access_token = self.keys.sign(&account)?;

        info!(user_id = %account.id, email = %account.email, "user registered");
        Ok(RegisterResponse {
            message: "User registered successfully".into(),
            access_token,
        })
    }

    /// Every failure (unknown email, wrong password, inactive account) is the
    /// same `InvalidCredentials`, and all paths pay for one hash verification.
    #[instrument(skip_all)]
    pub async fn login(&self, req: LoginRequest) -> Result<LoginResponse, AppError> {
        let email = normalize_email(&req.email);
        let account = if is_valid_email(&email) {
            self.store.find_by_email(&email).await?
        } else {
            None
        };

        let stored_hash = account.as_ref().map(|a| a.password_hash.clone());
        let password_ok = self.hasher.verify_async(req.password, stored_hash).await?;

        let account = match account {
            Some(a) if password_ok && a.is_active => a,
            Some(a) if password_ok => {
                warn!(user_id = %a.id, "login on inactive account");
                return Err(AppError::InvalidCredentials);
            }
            Some(a) => {
                warn!(user_id = %a.id, "login invalid password");
                return Err(AppError::InvalidCredentials);
            }
            None => {
                warn!(email = %email, "login unknown email");
                return Err(AppError::InvalidCredentials);
            }
        };

        let access_token = self.keys.sign(&account)?;
        info!(user_id = %account.id, email = %account.email, "user logged in");
        Ok(LoginResponse { access_token })
    }

    pub async fn list_accounts(&self) -> Result<Vec<PublicAccount>, AppError> {
        let accounts = self.store.find_all().await?;
        Ok(accounts.into_iter().map(PublicAccount::from).collect())
    }

    /// Resolves a token subject. A deactivated account's tokens stop working
    /// immediately, even before they expire.
    async fn active_account(&self, id: Uuid) -> Result<Account, AppError> {
        let account = self
            .store
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("account"))?;
        if !account.is_active {
            warn!(user_id = %id, "token presented for inactive account");
            return Err(AppError::InvalidToken);
        }
        Ok(account)
    }

    pub async fn account(&self, id: Uuid) -> Result<PublicAccount, AppError> {
        Ok(self.active_account(id).await?.into())
    }

    /// Partial profile update; the password is re-hashed only when supplied.
    #[instrument(skip(self, req))]
    pub async fn update_account(
        &self,
        id: Uuid,
        req: UpdateAccountRequest,
    ) -> Result<PublicAccount, AppError> {
        self.active_account(id).await?;
        let password_hash = match req.password {
            Some(password) => {
                validate_password(&password)?;
                Some(self.hasher.hash_async(password).await?)
            }
            None => None,
        };

        let patch = AccountPatch {
            firstname: non_blank(req.firstname),
            lastname: non_blank(req.lastname),
            current_organisation: non_blank(req.current_organisation),
            bio: non_blank(req.bio),
            password_hash,
            is_active: None,
        };
        let updated = self
            .store
            .update(id, patch)
            .await?
            .ok_or(AppError::NotFound("account"))?;
        info!(user_id = %id, "account updated");
        Ok(updated.into())
    }

    #[instrument(skip(self))]
    pub async fn remove_account(&self, id: Uuid) -> Result<(), AppError> {
        self.active_account(id).await?;
        if !self.store.remove(id).await? {
            return Err(AppError::NotFound("account"));
        }
        info!(user_id = %id, "account removed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password;
    use crate::config::JwtConfig;
    use crate::users::MemoryUserStore;
    use secrecy::SecretString;

    fn service() -> (AuthService, Arc<dyn UserStore>) {
        let store: Arc<dyn UserStore> = Arc::new(MemoryUserStore::new());
        let hasher = CredentialHasher::new(password::test_config()).unwrap();
        let keys = JwtKeys::new(&JwtConfig {
            secret: SecretString::from("test-secret".to_string()),
            issuer: "test".into(),
            audience: "test".into(),
            ttl_minutes: 60 * 24,
        });
        (AuthService::new(store.clone(), hasher, keys), store)
    }

    fn register_req(email: &str, password: &str) -> RegisterRequest {
        RegisterRequest {
            username: None,
            firstname: None,
            lastname: None,
            email: email.into(),
            password: password.into(),
            current_organisation: None,
            bio: None,
            role: None,
        }
    }

    fn login_req(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: email.into(),
            password: password.into(),
        }
    }

    #[test]
    fn email_and_username_validation() {
        assert!(is_valid_email("a@x.com"));
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("missing-domain@"));
        assert!(is_valid_username("jane_doe.99"));
        assert!(!is_valid_username("ab"));
        assert!(!is_valid_username("a@x.com"));
        assert_eq!(normalize_email("  A@X.Com "), "a@x.com");
    }

    #[tokio::test]
    async fn register_login_scenario() {
        let (svc, _) = service();

        let registered = svc.register(register_req("a@x.com", "secret1")).await.unwrap();
        assert_eq!(registered.message, "User registered successfully");
        let claims = svc.keys().verify(&registered.access_token).unwrap();
        assert_eq!(claims.role, Role::Student);
        assert_eq!(claims.email, "a@x.com");

        let err = svc.register(register_req("a@x.com", "secret1")).await.unwrap_err();
        assert!(matches!(err, AppError::AccountExists));

        let err = svc.login(login_req("a@x.com", "wrong")).await.unwrap_err();
        assert!(matches!(err, AppError::InvalidCredentials));

        let ok = svc.login(login_req("a@x.com", "secret1")).await.unwrap();
        let login_claims = svc.keys().verify(&ok.access_token).unwrap();
        assert_eq!(login_claims.sub, claims.sub);
    }

    #[tokio::test]
    async fn register_normalizes_email_and_defaults_username() {
        let (svc, store) = service();
        svc.register(register_req("  Mixed@Case.COM ", "secret1")).await.unwrap();
        let account = store.find_by_email("mixed@case.com").await.unwrap().unwrap();
        assert_eq!(account.username, "mixed@case.com");
        assert_ne!(account.password_hash, "secret1");

        let err = svc.register(register_req("mixed@case.com", "secret1")).await.unwrap_err();
        assert!(matches!(err, AppError::AccountExists));
    }

    #[tokio::test]
    async fn register_rejects_invalid_input_without_writing() {
        let (svc, store) = service();

        let err = svc.register(register_req("nope", "secret1")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let err = svc.register(register_req("a@x.com", "12345")).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let mut req = register_req("a@x.com", "secret1");
        req.username = Some("x".into());
        assert!(matches!(svc.register(req).await, Err(AppError::Validation(_))));

        let mut req = register_req("a@x.com", "secret1");
        req.role = Some(Role::Admin);
        assert!(matches!(svc.register(req).await, Err(AppError::Validation(_))));

        assert!(store.find_all().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn register_rejects_taken_username() {
        let (svc, _) = service();
        let mut first = register_req("one@x.com", "secret1");
        first.username = Some("teacher".into());
        first.role = Some(Role::Instructor);
        svc.register(first).await.unwrap();

        let mut second = register_req("two@x.com", "secret1");
        second.username = Some("teacher".into());
        let err = svc.register(second).await.unwrap_err();
        assert!(matches!(err, AppError::AccountExists));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_duplicate_registration_succeeds_once() {
        let (svc, store) = service();
        let mut handles = Vec::new();
        for _ in 0..8 {
            let svc = svc.clone();
            handles.push(tokio::spawn(async move {
                svc.register(register_req("race@x.com", "secret1")).await
            }));
        }

        let mut ok = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => ok += 1,
                Err(AppError::AccountExists) => {}
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!(ok, 1);
        assert_eq!(store.find_all().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (svc, store) = service();
        let token = svc.register(register_req("a@x.com", "secret1")).await.unwrap().access_token;
        let id = svc.keys().verify(&token).unwrap().sub;

        let wrong_password = svc.login(login_req("a@x.com", "wrong1")).await.unwrap_err();
        let unknown_email = svc.login(login_req("b@x.com", "secret1")).await.unwrap_err();
        let malformed_email = svc.login(login_req("b", "secret1")).await.unwrap_err();

        store
            .update(
                id,
                AccountPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        let inactive = svc.login(login_req("a@x.com", "secret1")).await.unwrap_err();

        for err in [wrong_password, unknown_email, malformed_email, inactive] {
            assert!(matches!(err, AppError::InvalidCredentials));
            assert_eq!(err.to_string(), "Invalid credentials");
        }
    }

    #[tokio::test]
    async fn update_account_rehashes_password() {
        let (svc, _) = service();
        let token = svc.register(register_req("a@x.com", "secret1")).await.unwrap().access_token;
        let id = svc.keys().verify(&token).unwrap().sub;

        let updated = svc
            .update_account(
                id,
                UpdateAccountRequest {
                    bio: Some("Rustacean".into()),
                    password: Some("secret2".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.bio.as_deref(), Some("Rustacean"));

        assert!(svc.login(login_req("a@x.com", "secret1")).await.is_err());
        assert!(svc.login(login_req("a@x.com", "secret2")).await.is_ok());

        let err = svc
            .update_account(
                id,
                UpdateAccountRequest {
                    password: Some("short".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn update_account_trims_and_ignores_blank_fields() {
        let (svc, _) = service();
        let mut req = register_req("a@x.com", "secret1");
        req.bio = Some("original".into());
        let token = svc.register(req).await.unwrap().access_token;
        let id = svc.keys().verify(&token).unwrap().sub;

        let updated = svc
            .update_account(
                id,
                UpdateAccountRequest {
                    firstname: Some("  Ada  ".into()),
                    bio: Some("   ".into()),
                    current_organisation: Some(String::new()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.firstname.as_deref(), Some("Ada"));
        assert_eq!(updated.bio.as_deref(), Some("original"));
        assert_eq!(updated.current_organisation, None);
    }

    #[tokio::test]
    async fn inactive_account_rejects_self_service() {
        let (svc, store) = service();
        let token = svc.register(register_req("a@x.com", "secret1")).await.unwrap().access_token;
        let id = svc.keys().verify(&token).unwrap().sub;
        store
            .update(
                id,
                AccountPatch {
                    is_active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(matches!(svc.account(id).await, Err(AppError::InvalidToken)));
        assert!(matches!(
            svc.update_account(id, UpdateAccountRequest::default()).await,
            Err(AppError::InvalidToken)
        ));
        assert!(matches!(svc.remove_account(id).await, Err(AppError::InvalidToken)));
        assert!(store.find_by_id(id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn account_lookup_and_removal() {
        let (svc, _) = service();
        let token = svc.register(register_req("a@x.com", "secret1")).await.unwrap().access_token;
        let id = svc.keys().verify(&token).unwrap().sub;

        assert_eq!(svc.account(id).await.unwrap().email, "a@x.com");
        assert_eq!(svc.list_accounts().await.unwrap().len(), 1);

        svc.remove_account(id).await.unwrap();
        assert!(matches!(svc.account(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(svc.remove_account(id).await, Err(AppError::NotFound(_))));
        assert!(matches!(
            svc.update_account(id, UpdateAccountRequest::default()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
