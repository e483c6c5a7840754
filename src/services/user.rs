//! User service
//!
//! Account registration, login and session management. The first account
//! ever registered becomes an admin; everyone after that is a visitor
//! unless a role is given explicitly (seeding, tests).

use crate::db::is_unique_violation;
use crate::db::repositories::{SessionRepository, UserRepository};
use crate::models::{CreateUserInput, Session, User, UserRole};
use crate::services::password::{check_password_policy, hash_password, verify_password};
use anyhow::Context;
use chrono::Duration;
use std::sync::Arc;
use uuid::Uuid;

const DEFAULT_SESSION_EXPIRATION_DAYS: i64 = 7;

/// Width of the `users.email` column
pub const MAX_EMAIL_LENGTH: usize = 255;

/// Error types for user service operations
#[derive(Debug, thiserror::Error)]
pub enum UserServiceError {
    /// Invalid credentials
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("User already exists: {0}")]
    UserExists(String),

    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// User service for managing accounts and login sessions
pub struct UserService {
    user_repo: Arc<dyn UserRepository>,
    session_repo: Arc<dyn SessionRepository>,
    session_expiration_days: i64,
}

impl UserService {
    pub fn new(user_repo: Arc<dyn UserRepository>, session_repo: Arc<dyn SessionRepository>) -> Self {
        Self::with_session_expiration(user_repo, session_repo, DEFAULT_SESSION_EXPIRATION_DAYS)
    }

    /// Create a user service whose sessions last `session_expiration_days`
    pub fn with_session_expiration(
        user_repo: Arc<dyn UserRepository>,
        session_repo: Arc<dyn SessionRepository>,
        session_expiration_days: i64,
    ) -> Self {
        Self {
            user_repo,
            session_repo,
            session_expiration_days,
        }
    }

    /// Register a new account.
    ///
    /// # Errors
    ///
    /// - `ValidationError` for a malformed email or a weak password
    /// - `UserExists` if the email is taken
    pub async fn register(&self, input: CreateUserInput) -> Result<User, UserServiceError> {
        let email = normalize_email(&input.email);
        validate_email(&email)?;
        check_password_policy(&input.password).map_err(UserServiceError::ValidationError)?;

        if self
            .user_repo
            .get_by_email(&email)
            .await
            .context("Failed to check email")?
            .is_some()
        {
            return Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            )));
        }

        let role = if self.is_first_user().await? {
            UserRole::Admin
        } else {
            input.role.unwrap_or_default()
        };

        let password_hash = hash_password(&input.password)?;
        let user = User::new(email.clone(), password_hash, role);

        match self.user_repo.create(&user).await {
            Ok(created) => {
                tracing::info!(user_id = created.id, role = %created.role, "User registered");
                Ok(created)
            }
            // Lost a race with a concurrent registration
            Err(e) if is_unique_violation(&e) => Err(UserServiceError::UserExists(format!(
                "Email '{}' is already registered",
                email
            ))),
            Err(e) => Err(e.context("Failed to create user").into()),
        }
    }

    /// Check credentials and open a new session.
    ///
    /// Unknown email and wrong password produce the same error.
    pub async fn login(&self, email: &str, password: &str) -> Result<(User, Session), UserServiceError> {
        let invalid = || UserServiceError::AuthenticationError("Invalid email or password".to_string());

        let user = self
            .user_repo
            .get_by_email(&normalize_email(email))
            .await
            .context("Failed to get user by email")?
            .ok_or_else(invalid)?;

        if !verify_password(password, &user.password_hash)? {
            return Err(invalid());
        }

        let session = self.create_session(user.id).await?;
        tracing::info!(user_id = user.id, "User logged in");

        Ok((user, session))
    }

    pub async fn logout(&self, session_id: &str) -> Result<(), UserServiceError> {
        self.session_repo
            .delete(session_id)
            .await
            .context("Failed to delete session")?;
        Ok(())
    }

    pub async fn get_by_id(&self, id: i64) -> Result<Option<User>, UserServiceError> {
        let user = self.user_repo.get_by_id(id).await.context("Failed to get user")?;
        Ok(user)
    }

    /// Resolve a session token to its user.
    ///
    /// Expired sessions are deleted and treated as absent.
    pub async fn validate_session(&self, token: &str) -> Result<Option<User>, UserServiceError> {
        let session = match self
            .session_repo
            .get_by_id(token)
            .await
            .context("Failed to get session")?
        {
            Some(session) => session,
            None => return Ok(None),
        };

        if session.is_expired() {
            self.session_repo
                .delete(&session.id)
                .await
                .context("Failed to delete expired session")?;
            return Ok(None);
        }

        self.get_by_id(session.user_id).await
    }

    pub async fn is_first_user(&self) -> Result<bool, UserServiceError> {
        let count = self.user_repo.count().await.context("Failed to count users")?;
        Ok(count == 0)
    }

    /// Remove every expired session, returning how many were deleted
    pub async fn cleanup_expired_sessions(&self) -> Result<u64, UserServiceError> {
        let count = self
            .session_repo
            .delete_expired()
            .await
            .context("Failed to delete expired sessions")?;

        if count > 0 {
            tracing::info!(count, "Expired sessions removed");
        }
        Ok(count)
    }

    async fn create_session(&self, user_id: i64) -> Result<Session, UserServiceError> {
        let session = Session::new(
            Uuid::new_v4().to_string(),
            user_id,
            Duration::days(self.session_expiration_days),
        );

        let created = self
            .session_repo
            .create(&session)
            .await
            .context("Failed to create session")?;

        Ok(created)
    }
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> Result<(), UserServiceError> {
    if email.is_empty() {
        return Err(UserServiceError::ValidationError(
            "Email cannot be empty".to_string(),
        ));
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(UserServiceError::ValidationError(format!(
            "Email cannot exceed {} characters",
            MAX_EMAIL_LENGTH
        )));
    }

    let valid = match email.split_once('@') {
        Some((local, domain)) => !local.is_empty() && !domain.is_empty() && !domain.contains('@'),
        None => false,
    };
    if !valid {
        return Err(UserServiceError::ValidationError(
            "Invalid email format".to_string(),
        ));
    }

    Ok(())
}
