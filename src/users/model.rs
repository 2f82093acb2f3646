use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;
use uuid::Uuid;

/// Account role. Closed set, least-privileged first.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "user_role", rename_all = "lowercase")]
pub enum Role {
    #[default]
    #[serde(alias = "STUDENT")]
    Student,
    #[serde(alias = "INSTRUCTOR")]
    Instructor,
    #[serde(alias = "ADMIN")]
    Admin,
}

/// Account record in the user store.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // Argon2 PHC string, never exposed
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub current_organisation: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
    pub email_verified: bool,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Fields required to insert an account. `password_hash` must come from
/// `CredentialHasher`.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub current_organisation: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
}

/// Partial update. `None` leaves the stored value untouched.
#[derive(Debug, Clone, Default)]
pub struct AccountPatch {
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub current_organisation: Option<String>,
    pub bio: Option<String>,
    pub password_hash: Option<String>,
    pub is_active: Option<bool>,
}

impl AccountPatch {
    pub(crate) fn apply(self, account: &mut Account) {
        if let Some(v) = self.firstname {
            account.firstname = Some(v);
        }
        if let Some(v) = self.lastname {
            account.lastname = Some(v);
        }
        if let Some(v) = self.current_organisation {
            account.current_organisation = Some(v);
        }
        if let Some(v) = self.bio {
            account.bio = Some(v);
        }
        if let Some(v) = self.password_hash {
            account.password_hash = v;
        }
        if let Some(v) = self.is_active {
            account.is_active = v;
        }
    }
}

/// Account as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct PublicAccount {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub firstname: Option<String>,
    pub lastname: Option<String>,
    pub current_organisation: Option<String>,
    pub bio: Option<String>,
    pub role: Role,
    pub email_verified: bool,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Account> for PublicAccount {
    fn from(a: Account) -> Self {
        Self {
            id: a.id,
            username: a.username,
            email: a.email,
            firstname: a.firstname,
            lastname: a.lastname,
            current_organisation: a.current_organisation,
            bio: a.bio,
            role: a.role,
            email_verified: a.email_verified,
            is_active: a.is_active,
            created_at: a.created_at,
        }
    }
}
