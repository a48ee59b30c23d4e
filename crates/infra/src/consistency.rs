//! Consistency checker: resolves weak references against the repository.
//!
//! Ids reach this layer already shape-checked (typed ids only come out of the
//! validator pipeline or path parsing), so every failure here is about
//! existence.

use accountd_core::{AccountId, DomainResult, InstitutionId, ValidationError};
use accountd_directory::{Account, Institution};

use crate::repository::SharedRepository;

/// Which write path is resolving children. Create and update report missing
/// children under different error kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

#[derive(Clone)]
pub struct ConsistencyChecker {
    repo: SharedRepository,
}

impl ConsistencyChecker {
    pub fn new(repo: SharedRepository) -> Self {
        Self { repo }
    }

    /// The institution must exist.
    pub async fn require_institution(&self, id: InstitutionId) -> DomainResult<Institution> {
        self.repo
            .get_institution(id)
            .await?
            .ok_or_else(|| ValidationError::InstitutionNotRegistered(id.to_string()).into())
    }

    /// Every id must resolve to a child account. All ids are looked up before
    /// failing so the error names every offender, in request order.
    pub async fn require_children(&self, ids: &[AccountId], mode: WriteMode) -> DomainResult<Vec<Account>> {
        let mut found = Vec::with_capacity(ids.len());
        let mut missing = Vec::new();

        for id in ids {
            match self.repo.get_account(*id).await? {
                Some(account) if account.is_child() => found.push(account),
                _ => missing.push(id.to_string()),
            }
        }

        if missing.is_empty() {
            return Ok(found);
        }

        tracing::debug!(?mode, missing = ?missing, "unresolved children references");
        Err(match mode {
            WriteMode::Create => ValidationError::ChildrenNotRegistered(missing),
            WriteMode::Update => ValidationError::InvalidChildrenIds(missing),
        }
        .into())
    }

    /// Family children must exist and belong to the family's institution.
    pub async fn require_family_children(
        &self,
        ids: &[AccountId],
        institution_id: InstitutionId,
        mode: WriteMode,
    ) -> DomainResult<()> {
        let children = self.require_children(ids, mode).await?;
        if let Some(stray) = children.iter().find(|c| c.institution_id != Some(institution_id)) {
            return Err(ValidationError::invalid(
                "children",
                format!("child {} does not belong to institution {institution_id}", stray.id),
            )
            .into());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use accountd_core::DomainError;
    use accountd_directory::{Gender, Profile};
    use chrono::Utc;

    use crate::repository::{AccountRepository, InMemoryRepository, InstitutionRepository};

    fn child(institution_id: InstitutionId) -> Account {
        Account {
            id: AccountId::new(),
            username: format!("child-{}", AccountId::new()),
            password_hash: "hash".to_string(),
            institution_id: Some(institution_id),
            last_login: None,
            created_at: Utc::now(),
            profile: Profile::Child {
                gender: Gender::Female,
                age: 8,
            },
        }
    }

    fn school(name: &str) -> Institution {
        Institution {
            id: InstitutionId::new(),
            institution_type: "School".to_string(),
            name: name.to_string(),
            address: None,
            latitude: None,
            longitude: None,
            created_at: Utc::now(),
        }
    }

    async fn setup() -> (ConsistencyChecker, Arc<InMemoryRepository>, InstitutionId) {
        let repo = Arc::new(InMemoryRepository::new());
        let institution = school("North");
        let id = institution.id;
        repo.insert_institution(institution).await.unwrap();
        (ConsistencyChecker::new(repo.clone()), repo, id)
    }

    #[tokio::test]
    async fn unknown_institution_is_not_registered() {
        let (checker, _, known) = setup().await;
        assert!(checker.require_institution(known).await.is_ok());

        let unknown = InstitutionId::new();
        let err = checker.require_institution(unknown).await.unwrap_err();
        assert_eq!(
            err,
            DomainError::Validation(ValidationError::InstitutionNotRegistered(unknown.to_string()))
        );
    }

    #[tokio::test]
    async fn missing_children_error_depends_on_mode() {
        let (checker, repo, inst) = setup().await;
        let present = child(inst);
        repo.insert_account(present.clone()).await.unwrap();
        let absent = AccountId::new();

        let err = checker
            .require_children(&[present.id, absent], WriteMode::Create)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "children_not_registered");
        assert!(err.description().unwrap().contains(&absent.to_string()));

        let err = checker
            .require_children(&[present.id, absent], WriteMode::Update)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_children_ids");
    }

    #[tokio::test]
    async fn non_child_account_is_not_a_child_reference() {
        let (checker, repo, inst) = setup().await;
        let mut educator = child(inst);
        educator.profile = Profile::Educator;
        repo.insert_account(educator.clone()).await.unwrap();

        let err = checker
            .require_children(&[educator.id], WriteMode::Create)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "children_not_registered");
    }

    #[tokio::test]
    async fn family_children_must_share_institution() {
        let (checker, repo, inst) = setup().await;
        let south = school("South");
        let local = child(inst);
        let foreign = child(south.id);
        repo.insert_institution(south).await.unwrap();
        repo.insert_account(local.clone()).await.unwrap();
        repo.insert_account(foreign.clone()).await.unwrap();

        checker
            .require_family_children(&[local.id], inst, WriteMode::Create)
            .await
            .unwrap();
        let err = checker
            .require_family_children(&[local.id, foreign.id], inst, WriteMode::Create)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_value");
    }
}
