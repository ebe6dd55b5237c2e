// user directory - maps auth provider uids to roles
//
// the first user registered becomes admin; the last admin can't be demoted.
// each rule is enforced inside a single statement

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use std::str::FromStr;
use tracing::{info, warn};

use super::model::{Identity, ProfileUpdate, Role, UserRecord};
use crate::Error;

const SELECT_USER: &str = "SELECT uid, email, role, display_name, profile_image, \
     created_at, last_login FROM users";

#[derive(Clone)]
pub struct UserDirectory {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    uid: String,
    email: String,
    role: String,
    display_name: Option<String>,
    profile_image: Option<String>,
    created_at: DateTime<Utc>,
    last_login: Option<DateTime<Utc>>,
}

impl UserRow {
    fn into_record(self) -> Result<UserRecord, Error> {
        Ok(UserRecord {
            role: Role::from_str(&self.role).map_err(Error::Validation)?,
            uid: self.uid,
            email: self.email,
            display_name: self.display_name,
            profile_image: self.profile_image,
            created_at: self.created_at,
            last_login: self.last_login,
        })
    }
}

impl UserDirectory {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn user(&self, uid: &str) -> Result<Option<UserRecord>, Error> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT_USER} WHERE uid = ?"))
            .bind(uid)
            .fetch_optional(&self.pool)
            .await?;

        row.map(UserRow::into_record).transpose()
    }

    /// Every user, oldest first.
    pub async fn users(&self) -> Result<Vec<UserRecord>, Error> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("{SELECT_USER} ORDER BY created_at, rowid"))
                .fetch_all(&self.pool)
                .await?;

        rows.into_iter().map(UserRow::into_record).collect()
    }

    pub async fn is_admin(&self, uid: &str) -> Result<bool, Error> {
        Ok(self.user(uid).await?.is_some_and(|u| u.is_admin()))
    }

    /// Existing record for this identity, or a new one.
    pub async fn ensure_user(&self, identity: &Identity) -> Result<UserRecord, Error> {
        if identity.uid.trim().is_empty() || identity.email.trim().is_empty() {
            return Err(Error::Validation("user id and email are required".into()));
        }

        let now = Utc::now();
        let done = sqlx::query(
            "INSERT INTO users (uid, email, role, display_name, created_at, last_login) \
             VALUES (?, ?, CASE WHEN EXISTS (SELECT 1 FROM users) THEN 'user' ELSE 'admin' END, ?, ?, ?) \
             ON CONFLICT(uid) DO NOTHING",
        )
        .bind(&identity.uid)
        .bind(&identity.email)
        .bind(identity.display_name.as_deref().filter(|n| !n.trim().is_empty()))
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let user = self
            .user(&identity.uid)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {}", identity.uid)))?;

        if done.rows_affected() == 1 {
            info!(uid = %user.uid, email = %user.email, role = %user.role, "user created");
        }
        Ok(user)
    }

    pub async fn set_role(&self, uid: &str, role: Role) -> Result<UserRecord, Error> {
        // a demotion only goes through if another admin remains
        let done = sqlx::query(
            "UPDATE users SET role = ? WHERE uid = ? AND (? = 'admin' OR role != 'admin' \
             OR (SELECT COUNT(*) FROM users WHERE role = 'admin') > 1)",
        )
        .bind(role.as_str())
        .bind(uid)
        .bind(role.as_str())
        .execute(&self.pool)
        .await?;

        let user = self
            .user(uid)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {uid}")))?;

        if done.rows_affected() == 0 {
            warn!(uid, "refused to demote the last admin");
            return Err(Error::LastAdmin);
        }

        info!(uid, %role, "role updated");
        Ok(user)
    }

    pub async fn update_profile(&self, uid: &str, update: ProfileUpdate) -> Result<UserRecord, Error> {
        if update.is_empty() {
            return Err(Error::Validation("no updates provided".into()));
        }

        let (set_image, image) = match update.profile_image {
            Some(image) => (true, image),
            None => (false, None),
        };

        let done = sqlx::query(
            "UPDATE users SET display_name = COALESCE(?, display_name), \
             profile_image = CASE WHEN ? THEN ? ELSE profile_image END WHERE uid = ?",
        )
        .bind(update.display_name)
        .bind(set_image)
        .bind(image)
        .bind(uid)
        .execute(&self.pool)
        .await?;

        if done.rows_affected() == 0 {
            return Err(Error::NotFound(format!("user {uid}")));
        }

        self.user(uid)
            .await?
            .ok_or_else(|| Error::NotFound(format!("user {uid}")))
    }

    pub async fn record_login(&self, uid: &str) -> Result<(), Error> {
        sqlx::query("UPDATE users SET last_login = ? WHERE uid = ?")
            .bind(Utc::now())
            .bind(uid)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
