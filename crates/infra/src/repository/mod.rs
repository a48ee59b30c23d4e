//! Persistence collaborator for the account core.
//!
//! The orchestrator pre-checks every uniqueness rule so it can name the
//! conflicting key; implementations must still enforce the same rules on
//! write and report a lost race as [`RepositoryError::Duplicate`].

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use accountd_auth::Role;
use chrono::{DateTime, Utc};

use accountd_core::{AccountId, DomainError, GroupId, InstitutionId, ValidationError};
use accountd_directory::{Account, ChildrenGroup, Institution};

pub mod in_memory;

pub use in_memory::InMemoryRepository;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    /// A unique key is already taken.
    #[error("duplicate key: {0}")]
    Duplicate(String),

    /// The record to change no longer exists.
    #[error("not found: {0}")]
    NotFound(String),

    /// Accounts still reference the institution being removed.
    #[error("institution is referenced by {dependents} account(s)")]
    InUse { dependents: usize },

    /// An account points at an institution that is not stored.
    #[error("institution {0} does not exist")]
    UnknownInstitution(InstitutionId),

    /// The backing store could not serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl From<RepositoryError> for DomainError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::Duplicate(msg) => DomainError::conflict(msg),
            RepositoryError::NotFound(msg) => DomainError::not_found(msg),
            RepositoryError::InUse { .. } => DomainError::conflict(INSTITUTION_IN_USE),
            RepositoryError::UnknownInstitution(id) => ValidationError::InstitutionNotRegistered(id.to_string()).into(),
            RepositoryError::Unavailable(msg) => DomainError::store(msg),
        }
    }
}

const INSTITUTION_IN_USE: &str = "The institution is associated with one or more users and cannot be removed.";

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn get_account(&self, id: AccountId) -> RepositoryResult<Option<Account>>;

    async fn find_account_by_username(&self, username: &str) -> RepositoryResult<Option<Account>>;

    async fn list_accounts(&self, role: Role) -> RepositoryResult<Vec<Account>>;

    /// Fails with `Duplicate` when the username is taken and with
    /// `UnknownInstitution` when the referenced institution is gone.
    async fn insert_account(&self, account: Account) -> RepositoryResult<()>;

    /// Replace a stored account. Never inserts: fails with `NotFound` when the
    /// account was removed meanwhile. Same uniqueness and institution rules as
    /// `insert_account`.
    async fn update_account(&self, account: Account) -> RepositoryResult<()>;

    /// Set `last_login` only. Fails with `NotFound` when the account is gone.
    async fn touch_last_login(&self, id: AccountId, at: DateTime<Utc>) -> RepositoryResult<()>;

    /// Set the password hash only. Fails with `NotFound` when the account is gone.
    async fn set_password_hash(&self, id: AccountId, password_hash: String) -> RepositoryResult<()>;

    /// Returns whether an account was removed.
    async fn delete_account(&self, id: AccountId) -> RepositoryResult<bool>;
}

#[async_trait]
pub trait InstitutionRepository: Send + Sync {
    async fn get_institution(&self, id: InstitutionId) -> RepositoryResult<Option<Institution>>;

    async fn find_institution_by_key(
        &self,
        institution_type: &str,
        name: &str,
    ) -> RepositoryResult<Option<Institution>>;

    async fn list_institutions(&self) -> RepositoryResult<Vec<Institution>>;

    /// Fails with `Duplicate` when `(type, name)` is taken.
    async fn insert_institution(&self, institution: Institution) -> RepositoryResult<()>;

    /// Fails with `NotFound` when the institution was removed meanwhile.
    async fn update_institution(&self, institution: Institution) -> RepositoryResult<()>;

    /// Returns whether an institution was removed. Fails with `InUse` while
    /// any account references it; the check and the removal are atomic.
    async fn delete_institution(&self, id: InstitutionId) -> RepositoryResult<bool>;
}

#[async_trait]
pub trait GroupRepository: Send + Sync {
    async fn get_group(&self, id: GroupId) -> RepositoryResult<Option<ChildrenGroup>>;

    async fn find_group_by_name(&self, owner_id: AccountId, name: &str) -> RepositoryResult<Option<ChildrenGroup>>;

    async fn list_groups(&self, owner_id: AccountId) -> RepositoryResult<Vec<ChildrenGroup>>;

    /// Fails with `Duplicate` when `(owner, name)` is taken.
    async fn insert_group(&self, group: ChildrenGroup) -> RepositoryResult<()>;

    /// Fails with `NotFound` when the group was removed meanwhile.
    async fn update_group(&self, group: ChildrenGroup) -> RepositoryResult<()>;

    async fn delete_group(&self, id: GroupId) -> RepositoryResult<bool>;

    /// Remove every group owned by `owner_id`; returns how many were removed.
    async fn delete_groups_of_owner(&self, owner_id: AccountId) -> RepositoryResult<usize>;
}

/// Everything the orchestrator needs from storage.
pub trait Repository: AccountRepository + InstitutionRepository + GroupRepository {}

impl<T> Repository for T where T: AccountRepository + InstitutionRepository + GroupRepository {}

pub type SharedRepository = Arc<dyn Repository>;
