//! Resource orchestrator (application-level pipeline).
//!
//! Every operation runs the same stages, in this order, and stops at the
//! first failure:
//!
//! ```text
//! Principal + raw request
//!   ↓
//! 1. Authorize (static policy table, no IO)
//!   ↓
//! 2. Validate shape (validator pipeline, path id format)
//!   ↓
//! 3. Resolve references (consistency checker, repository reads)
//!   ↓
//! 4. Uniqueness pre-check (names the conflicting key)
//!   ↓
//! 5. Persist (repository write; a lost uniqueness race is still a Conflict)
//! ```
//!
//! Only stages 3-5 suspend. Dropping the returned future abandons the
//! operation between repository calls.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde_json::Value as JsonValue;

use accountd_auth::{PasswordHasher, TokenIssuer};
use accountd_core::{DomainError, DomainResult, InstitutionId};
use accountd_directory::{Account, Institution};

use crate::consistency::ConsistencyChecker;
use crate::repository::SharedRepository;

mod accounts;
mod credentials;
mod groups;
mod institutions;

pub use credentials::AccessToken;

/// An account together with its resolved institution, ready for output.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountView {
    pub account: Account,
    pub institution: Option<Institution>,
}

impl AccountView {
    pub fn to_json(&self) -> JsonValue {
        self.account.to_json(self.institution.as_ref())
    }
}

#[derive(Clone)]
pub struct Orchestrator {
    repo: SharedRepository,
    hasher: Arc<dyn PasswordHasher>,
    issuer: Arc<dyn TokenIssuer>,
    checker: ConsistencyChecker,
    /// Hash verified against when a login names an unknown user.
    decoy_hash: Arc<OnceLock<String>>,
}

impl Orchestrator {
    pub fn new(repo: SharedRepository, hasher: Arc<dyn PasswordHasher>, issuer: Arc<dyn TokenIssuer>) -> Self {
        Self {
            checker: ConsistencyChecker::new(repo.clone()),
            repo,
            hasher,
            issuer,
            decoy_hash: Arc::new(OnceLock::new()),
        }
    }

    pub fn repository(&self) -> &SharedRepository {
        &self.repo
    }

    fn hash_password(&self, plaintext: &str) -> DomainResult<String> {
        self.hasher.hash(plaintext).map_err(|e| {
            tracing::error!(error = %e, "password hashing failed");
            DomainError::store("password hashing failed")
        })
    }

    /// Attach institutions to accounts, looking each institution up once.
    async fn views(&self, accounts: Vec<Account>) -> DomainResult<Vec<AccountView>> {
        let mut cache: HashMap<InstitutionId, Option<Institution>> = HashMap::new();
        let mut views = Vec::with_capacity(accounts.len());
        for account in accounts {
            let institution = match account.institution_id {
                Some(id) => {
                    if !cache.contains_key(&id) {
                        let resolved = self.repo.get_institution(id).await?;
                        cache.insert(id, resolved);
                    }
                    cache.get(&id).cloned().flatten()
                }
                None => None,
            };
            views.push(AccountView { account, institution });
        }
        Ok(views)
    }

    async fn view(&self, account: Account) -> DomainResult<AccountView> {
        let institution = match account.institution_id {
            Some(id) => self.repo.get_institution(id).await?,
            None => None,
        };
        Ok(AccountView { account, institution })
    }
}
