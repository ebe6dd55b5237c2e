// signed-in session
// built from a sign-in event, handed to whoever needs to know who is asking,
// consumed by sign_out. nothing here is global

use tracing::{info, warn};

use super::model::{Identity, UserRecord};
use super::users::UserDirectory;
use crate::Error;

#[derive(Debug, Clone)]
pub struct Session {
    identity: Identity,
    user: UserRecord,
}

impl Session {
    /// Handle a sign-in from the auth provider: make sure the user exists
    /// and stamp the login.
    pub async fn sign_in(users: &UserDirectory, identity: Identity) -> Result<Self, Error> {
        let mut user = users.ensure_user(&identity).await?;

        // a failed stamp shouldn't keep anyone out
        match users.record_login(&identity.uid).await {
            Ok(()) => {
                if let Some(fresh) = users.user(&identity.uid).await? {
                    user = fresh;
                }
            }
            Err(e) => warn!(uid = %identity.uid, error = %e, "could not record login"),
        }

        info!(uid = %identity.uid, role = %user.role, "signed in");
        Ok(Self { identity, user })
    }

    /// Pick up an existing user by uid, without creating one.
    pub async fn resume(users: &UserDirectory, uid: &str) -> Result<Self, Error> {
        let user = users.user(uid).await?.ok_or(Error::Unauthenticated)?;
        let identity = Identity {
            uid: user.uid.clone(),
            email: user.email.clone(),
            display_name: user.display_name.clone(),
        };
        Ok(Self { identity, user })
    }

    /// Reload the stored record, e.g. after a role change.
    pub async fn refresh(self, users: &UserDirectory) -> Result<Self, Error> {
        let user = users
            .user(&self.identity.uid)
            .await?
            .ok_or(Error::Unauthenticated)?;
        Ok(Self { user, ..self })
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn user(&self) -> &UserRecord {
        &self.user
    }

    pub fn is_admin(&self) -> bool {
        self.user.is_admin()
    }

    pub fn require_admin(&self) -> Result<(), Error> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(Error::Forbidden)
        }
    }

    pub fn sign_out(self) -> Identity {
        info!(uid = %self.identity.uid, "signed out");
        self.identity
    }
}
