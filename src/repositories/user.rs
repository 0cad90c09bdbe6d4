//! # User Repository
//!
//! Account storage. Emails are normalized (trimmed, lower-cased) before every
//! read and write so uniqueness is case-insensitive.

use std::sync::OnceLock;

use crate::auth::password::{MIN_PASSWORD_LEN, hash_password};
use crate::config::AppConfig;
use crate::error::RepositoryError;
use crate::models::user::{ActiveModel as UserActiveModel, Column, Entity as User, Model as UserModel};
use chrono::Utc;
use regex::Regex;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use uuid::Uuid;

static EMAIL_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();

fn looks_like_email(candidate: &str) -> bool {
    EMAIL_PATTERN
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").ok())
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(candidate))
}

/// Trims and lower-cases `raw`, rejecting anything that is not an email address.
pub fn normalize_email(raw: &str) -> Result<String, RepositoryError> {
    let email = raw.trim().to_lowercase();
    if email.len() > 254 || !looks_like_email(&email) {
        return Err(RepositoryError::validation_error(
            "email",
            "Enter a valid email address",
        ));
    }
    Ok(email)
}

fn check_password(password: &str) -> Result<(), RepositoryError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(RepositoryError::validation_error(
            "password",
            format!("Password must be at least {MIN_PASSWORD_LEN} characters"),
        ));
    }
    Ok(())
}

fn hash(password: &str) -> Result<String, RepositoryError> {
    check_password(password)?;
    hash_password(password).map_err(|err| RepositoryError::validation_error("password", err.to_string()))
}

/// Data for a new account
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub is_admin: bool,
    pub is_active: bool,
}

/// Partial update of an account; `None` keeps the current value
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub email: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
}

/// Repository for User database operations
pub struct UserRepository<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> UserRepository<'a> {
    pub fn new(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<UserModel>, RepositoryError> {
        User::find_by_id(id)
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn require(&self, id: Uuid) -> Result<UserModel, RepositoryError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| RepositoryError::not_found("User"))
    }

    /// Case-insensitive lookup. Malformed input simply finds nothing.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UserModel>, RepositoryError> {
        let email = email.trim().to_lowercase();
        User::find()
            .filter(Column::Email.eq(email))
            .one(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Every account ordered by email
    pub async fn list(&self) -> Result<Vec<UserModel>, RepositoryError> {
        User::find()
            .order_by_asc(Column::Email)
            .all(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    pub async fn create(&self, new_user: NewUser) -> Result<UserModel, RepositoryError> {
        let email = normalize_email(&new_user.email)?;
        let password_hash = hash(&new_user.password)?;

        if self.find_by_email(&email).await?.is_some() {
            return Err(duplicate_email());
        }

        UserActiveModel {
            id: Set(Uuid::new_v4()),
            email: Set(email),
            password_hash: Set(Some(password_hash)),
            is_admin: Set(new_user.is_admin),
            is_active: Set(new_user.is_active),
            date_joined: Set(Utc::now().into()),
        }
        .insert(self.db)
        .await
        .map_err(|err| match RepositoryError::database_error(err) {
            RepositoryError::Conflict { .. } => duplicate_email(),
            other => other,
        })
    }

    /// Applies `changes`; the principal admin can be neither renamed nor deactivated.
    pub async fn update(
        &self,
        id: Uuid,
        changes: UserChanges,
        config: &AppConfig,
    ) -> Result<UserModel, RepositoryError> {
        let existing = self.require(id).await?;
        let is_principal = config.is_principal_admin(&existing.email);
        let mut active = existing.clone().into_active_model();

        if let Some(email) = changes.email {
            let email = normalize_email(&email)?;
            if email != existing.email {
                if is_principal {
                    return Err(RepositoryError::forbidden(
                        "The principal administrator's email cannot be changed",
                    ));
                }
                if self.find_by_email(&email).await?.is_some() {
                    return Err(duplicate_email());
                }
                active.email = Set(email);
            }
        }

        if let Some(password) = changes.password {
            active.password_hash = Set(Some(hash(&password)?));
        }

        if let Some(is_active) = changes.is_active {
            if is_principal && !is_active {
                return Err(RepositoryError::forbidden(
                    "The principal administrator cannot be deactivated",
                ));
            }
            active.is_active = Set(is_active);
        }

        active
            .update(self.db)
            .await
            .map_err(|err| match RepositoryError::database_error(err) {
                RepositoryError::Conflict { .. } => duplicate_email(),
                other => other,
            })
    }

    /// Deletes an account and, by cascade, its reservations.
    pub async fn delete(&self, id: Uuid, config: &AppConfig) -> Result<(), RepositoryError> {
        let existing = self.require(id).await?;
        if config.is_principal_admin(&existing.email) {
            return Err(RepositoryError::forbidden(
                "The principal administrator cannot be deleted",
            ));
        }

        User::delete_by_id(existing.id)
            .exec(self.db)
            .await
            .map_err(RepositoryError::database_error)?;
        Ok(())
    }

    /// Marks an existing account as administrator.
    pub async fn promote_to_admin(&self, user: UserModel) -> Result<UserModel, RepositoryError> {
        if user.is_admin {
            return Ok(user);
        }
        let mut active = user.into_active_model();
        active.is_admin = Set(true);
        active
            .update(self.db)
            .await
            .map_err(RepositoryError::database_error)
    }

    /// Creates or resets an active administrator account with the given password.
    pub async fn upsert_admin(&self, email: &str, password: &str) -> Result<UserModel, RepositoryError> {
        let email = normalize_email(email)?;

        match self.find_by_email(&email).await? {
            Some(existing) => {
                let mut active = existing.into_active_model();
                active.is_admin = Set(true);
                active.is_active = Set(true);
                active.password_hash = Set(Some(hash(password)?));
                active
                    .update(self.db)
                    .await
                    .map_err(RepositoryError::database_error)
            }
            None => {
                self.create(NewUser {
                    email,
                    password: password.to_string(),
                    is_admin: true,
                    is_active: true,
                })
                .await
            }
        }
    }
}

fn duplicate_email() -> RepositoryError {
    RepositoryError::Conflict {
        message: "A user with this email already exists".to_string(),
        details: None,
    }
}
