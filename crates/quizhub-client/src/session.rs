//! The signed-in user, as resolved after authentication.

use domain::models::{Role, User};
use uuid::Uuid;

use crate::error::{ClientError, ClientResult};

/// Identity and role of the user driving the services.
///
/// Authentication itself is external; a session is built from the
/// authenticated user id and the role stored on their profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Session {
    pub user_id: Uuid,
    pub role: Role,
}

impl Session {
    pub fn new(user_id: Uuid, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn for_user(user: &User) -> Self {
        Self::new(user.id, user.role)
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn require_role(&self, role: Role) -> ClientResult<()> {
        if self.role != role {
            return Err(ClientError::Forbidden(format!(
                "This action requires the {role} role"
            )));
        }
        Ok(())
    }
}
