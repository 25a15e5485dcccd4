//! User account service.

use crate::model::user::{NewUser, User, UserId};
use crate::repo::user_repo::{UserRepository, UserSettingsPatch};
use crate::repo::RepoError;
use crate::service::{ServiceError, ServiceResult};
use log::{info, warn};

/// Account flows over an injected user repository.
pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Returns the account registered under `params.email`, creating it on
    /// first sign-in.
    pub fn sign_in(&self, params: NewUser) -> ServiceResult<User> {
        if let Some(existing) = self.repo.find_user_by_email(&params.email)? {
            info!(
                "event=user_sign_in module=service status=ok user_id={} created=false",
                existing.entity.id()
            );
            return Ok(existing.into_inner());
        }

        let user = User::new(params)?;
        if let Err(err) = self.repo.insert_user(&user) {
            warn!(
                "event=user_sign_in module=service status=error user_id={} error={}",
                user.id(),
                err
            );
            return Err(err.into());
        }
        info!(
            "event=user_sign_in module=service status=ok user_id={} created=true",
            user.id()
        );
        Ok(user)
    }

    pub fn get_user(&self, id: UserId) -> ServiceResult<User> {
        self.repo
            .get_user(id)?
            .map(|stored| stored.into_inner())
            .ok_or(ServiceError::UserNotFound(id))
    }

    /// Overwrites the supplied profile settings.
    pub fn update_settings(&self, id: UserId, patch: &UserSettingsPatch) -> ServiceResult<User> {
        let result = match self.repo.update_user_settings(id, patch) {
            Ok(updated) => Ok(updated.into_inner()),
            Err(RepoError::NotFound { .. }) => Err(ServiceError::UserNotFound(id)),
            Err(err) => Err(err.into()),
        };
        match &result {
            Ok(_) => info!(
                "event=user_update_settings module=service status=ok user_id={}",
                id
            ),
            Err(err) => warn!(
                "event=user_update_settings module=service status=error user_id={} error={}",
                id, err
            ),
        }
        result
    }
}
