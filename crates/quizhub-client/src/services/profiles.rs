//! User profiles and sign-in sessions.

use domain::models::user::non_empty;
use domain::models::{RegisterUserRequest, UpdateContactRequest, User};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::Stores;
use crate::error::{ClientError, ClientResult};
use crate::session::Session;

#[derive(Clone)]
pub struct ProfileService {
    stores: Stores,
}

impl ProfileService {
    pub fn new(stores: Stores) -> Self {
        Self { stores }
    }

    /// Stores the profile for an account the auth service just created.
    pub async fn register_profile(
        &self,
        user_id: Uuid,
        request: RegisterUserRequest,
    ) -> ClientResult<User> {
        request.validate()?;
        let user = self
            .stores
            .users
            .insert_user(User::new(user_id, request))
            .await?;
        info!(user_id = %user.id, role = %user.role, "Profile registered");
        Ok(user)
    }

    pub async fn get_profile(&self, user_id: Uuid) -> ClientResult<User> {
        self.stores
            .users
            .get_user(user_id)
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("Profile {user_id}")))
    }

    /// Resolves the role of an authenticated user into a session.
    pub async fn sign_in(&self, user_id: Uuid) -> ClientResult<Session> {
        let user = self.get_profile(user_id).await?;
        Ok(Session::for_user(&user))
    }

    /// Updates phone and/or location of the signed-in user.
    pub async fn update_contact(
        &self,
        session: &Session,
        request: UpdateContactRequest,
    ) -> ClientResult<User> {
        request.validate()?;
        let phone = non_empty(request.phone);
        let location = non_empty(request.location);

        self.stores
            .users
            .update_contact(session.user_id, phone, location)
            .await?
            .ok_or_else(|| ClientError::NotFound(format!("Profile {}", session.user_id)))
    }
}
