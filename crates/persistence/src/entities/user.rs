//! User profile entity (database row mapping).

use chrono::{DateTime, Utc};
use domain::models::{Role, User};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for the role chosen at sign-up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "user_role")]
pub enum UserRoleDb {
    Admin,
    Client,
}

impl From<UserRoleDb> for Role {
    fn from(role: UserRoleDb) -> Self {
        match role {
            UserRoleDb::Admin => Role::Admin,
            UserRoleDb::Client => Role::Client,
        }
    }
}

impl From<Role> for UserRoleDb {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => UserRoleDb::Admin,
            Role::Client => UserRoleDb::Client,
        }
    }
}

/// Database row mapping for the users table.
#[derive(Debug, Clone, FromRow)]
pub struct UserEntity {
    pub id: Uuid,
    pub email: String,
    pub role: UserRoleDb,
    pub name: String,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<UserEntity> for User {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            email: entity.email,
            role: entity.role.into(),
            name: entity.name,
            phone: entity.phone,
            location: entity.location,
        }
    }
}
