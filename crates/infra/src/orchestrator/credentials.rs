//! Login and password change.
//!
//! Password change walks `Requested -> OldPasswordVerified -> NewPasswordApplied`
//! and short-circuits with a named error at each gate.

use chrono::{DateTime, Utc};
use serde::Serialize;

use accountd_auth::{Action, Permission, Principal, ResourceType, authorize};
use accountd_core::{AccountId, DomainError, DomainResult, Payload, ValidationError};
use accountd_directory::validation::{validate_credentials, validate_password_change};
use accountd_directory::{Account, Profile};

use super::Orchestrator;
use crate::repository::RepositoryError;

/// Same message for unknown user and wrong password.
const INVALID_CREDENTIALS: &str = "Authentication failed for the username and/or password provided.";

/// Plaintext behind the decoy hash. The decoy verification result is discarded.
const DECOY_PASSWORD: &str = "decoy-password-for-unknown-users";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AccessToken {
    pub access_token: String,
}

impl Orchestrator {
    /// Verify credentials, record the login and issue a bearer token.
    ///
    /// An unknown username still costs one hash verification.
    pub async fn login(&self, payload: impl Into<Payload>, now: DateTime<Utc>) -> DomainResult<AccessToken> {
        let payload: Payload = payload.into();
        let credentials = validate_credentials(payload.json()?)?;

        let account = match self.repo.find_account_by_username(&credentials.username).await? {
            Some(account) => self
                .hasher
                .verify(&credentials.password, &account.password_hash)
                .then_some(account),
            None => {
                let _ = self.hasher.verify(&credentials.password, self.decoy_hash());
                None
            }
        };
        let Some(account) = account else {
            tracing::warn!(username = %credentials.username, "login rejected");
            return Err(DomainError::unauthorized(INVALID_CREDENTIALS));
        };

        match self.repo.touch_last_login(account.id, now).await {
            Ok(()) => {}
            Err(RepositoryError::NotFound(_)) => {
                tracing::warn!(account_id = %account.id, "login raced account removal");
                return Err(DomainError::unauthorized(INVALID_CREDENTIALS));
            }
            Err(e) => return Err(e.into()),
        }

        let principal = Principal::new(account.id, account.role());
        let access_token = self.issuer.issue(&principal, now).map_err(|e| {
            tracing::error!(error = %e, "token issuing failed");
            DomainError::store("token issuing failed")
        })?;

        tracing::info!(account_id = %account.id, role = %principal.role, "login succeeded");
        Ok(AccessToken { access_token })
    }

    /// Change the password of any account. The target must exist: absence is
    /// reported, not treated as success.
    pub async fn change_password(
        &self,
        principal: &Principal,
        raw_id: &str,
        payload: impl Into<Payload>,
    ) -> DomainResult<()> {
        let target = raw_id.parse::<AccountId>().ok();
        authorize(principal, Permission::new(ResourceType::Password, Action::Update), target.as_ref())?;
        let id = AccountId::parse_field("id", raw_id)?;
        let payload: Payload = payload.into();
        let change = validate_password_change(payload.json()?)?;

        let account = self
            .repo
            .get_account(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User not found!"))?;

        if !self.hasher.verify(&change.old_password, &account.password_hash) {
            return Err(ValidationError::PasswordMismatch.into());
        }

        let password_hash = self.hash_password(&change.new_password)?;
        self.repo.set_password_hash(id, password_hash).await?;

        tracing::info!(account_id = %id, "password changed");
        Ok(())
    }

    /// Lazily computed; empty if hashing failed, which verifies as a mismatch.
    fn decoy_hash(&self) -> &str {
        self.decoy_hash
            .get_or_init(|| self.hasher.hash(DECOY_PASSWORD).unwrap_or_default())
    }

    /// Seed an admin account unless the username is already registered.
    /// Returns whether an account was created.
    pub async fn ensure_admin(&self, username: &str, password: &str) -> DomainResult<bool> {
        if self.repo.find_account_by_username(username).await?.is_some() {
            return Ok(false);
        }

        let account = Account {
            id: AccountId::new(),
            username: username.to_string(),
            password_hash: self.hash_password(password)?,
            institution_id: None,
            last_login: None,
            created_at: Utc::now(),
            profile: Profile::Admin,
        };
        self.repo.insert_account(account.clone()).await?;

        tracing::info!(account_id = %account.id, username, "bootstrap admin created");
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;
    use serde_json::json;

    use accountd_auth::{Hs256Jwt, Principal, Role, TokenValidator};
    use accountd_core::{AccountId, DomainError, ValidationError};

    use crate::orchestrator::test_support::*;

    #[tokio::test]
    async fn login_issues_token_and_records_last_login() {
        let orch = orchestrator();
        assert!(orch.ensure_admin("root", "secret").await.unwrap());
        assert!(!orch.ensure_admin("root", "other").await.unwrap());

        let now = Utc::now();
        let token = orch
            .login(&json!({"username": "root", "password": "secret"}), now)
            .await
            .unwrap();

        let jwt = Arc::new(Hs256Jwt::new(b"test-secret", chrono::Duration::hours(1)));
        let claims = jwt.validate(&token.access_token, now).unwrap();
        assert_eq!(claims.role, Role::Admin);

        let stored = orch
            .repository()
            .find_account_by_username("root")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.id, claims.sub);
        assert!(stored.last_login.is_some());
    }

    #[tokio::test]
    async fn unknown_user_and_wrong_password_look_the_same() {
        let orch = orchestrator();
        orch.ensure_admin("root", "secret").await.unwrap();

        let wrong_password = orch
            .login(&json!({"username": "root", "password": "nope"}), Utc::now())
            .await
            .unwrap_err();
        let unknown_user = orch
            .login(&json!({"username": "ghost", "password": "secret"}), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(wrong_password, DomainError::Unauthorized(_)));
        assert_eq!(wrong_password, unknown_user);
    }

    #[tokio::test]
    async fn unknown_user_is_still_verified_against_a_hash() {
        let orch = orchestrator();
        assert!(orch.decoy_hash.get().is_none());

        orch.login(&json!({"username": "ghost", "password": "secret"}), Utc::now())
            .await
            .unwrap_err();
        let decoy = orch.decoy_hash.get().expect("decoy hash computed");
        assert!(decoy.starts_with("$argon2"));
    }

    #[tokio::test]
    async fn passwords_are_not_trimmed() {
        let orch = orchestrator();
        orch.ensure_admin("root", "secret").await.unwrap();

        let err = orch
            .login(&json!({"username": "root", "password": " secret "}), Utc::now())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized(_)));
    }

    #[tokio::test]
    async fn incomplete_login_is_a_validation_error() {
        let orch = orchestrator();
        let err = orch.login(&json!({"username": "root"}), Utc::now()).await.unwrap_err();
        assert_eq!(err, DomainError::Validation(ValidationError::missing("password")));
    }

    #[tokio::test]
    async fn password_change_gates() {
        let orch = orchestrator();
        let inst = institution(&orch, "North").await;
        let id = child(&orch, "c1", &inst).await.to_string();

        let err = orch
            .change_password(&admin(), &id, &json!({"new_password": "n"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "old_password_not_provided");

        let err = orch
            .change_password(&admin(), &id, &json!({"old_password": "p1"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "new_password_not_provided");

        let err = orch
            .change_password(&admin(), &id, &json!({"old_password": "wrong", "new_password": "n"}))
            .await
            .unwrap_err();
        assert_eq!(err, DomainError::Validation(ValidationError::PasswordMismatch));

        let err = orch
            .change_password(
                &admin(),
                &AccountId::new().to_string(),
                &json!({"old_password": "p1", "new_password": "n"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));

        orch.change_password(&admin(), &id, &json!({"old_password": "p1", "new_password": "p2"}))
            .await
            .unwrap();
        orch.login(&json!({"username": "c1", "password": "p2"}), Utc::now())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn only_admin_changes_passwords_even_own() {
        let orch = orchestrator();
        let inst = institution(&orch, "North").await;
        let id = child(&orch, "c1", &inst).await;

        let err = orch
            .change_password(
                &Principal::new(id, Role::Child),
                &id.to_string(),
                &json!({"old_password": "p1", "new_password": "p2"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}
