use chrono::Utc;
use serde_json::Value as JsonValue;

use accountd_auth::{Action, Permission, Principal, ResourceType, Role, authorize};
use accountd_core::{AccountId, DomainError, DomainResult, ListParams, Payload};
use accountd_directory::validation::{validate_account_patch, validate_new_account};
use accountd_directory::{Account, Profile};

use super::{AccountView, Orchestrator};
use crate::consistency::WriteMode;

const USER_NOT_FOUND: &str = "User not found!";

fn username_conflict(username: &str) -> DomainError {
    DomainError::conflict(format!("A user with username '{username}' is already registered!"))
}

impl Orchestrator {
    /// Create an account of `role` from a raw payload.
    pub async fn create_account(
        &self,
        principal: &Principal,
        role: Role,
        payload: impl Into<Payload>,
    ) -> DomainResult<AccountView> {
        let payload: Payload = payload.into();
        authorize(principal, Permission::new(ResourceType::for_role(role), Action::Create), None)?;

        let new = validate_new_account(role, payload.json()?)?;

        let institution = match new.institution_id {
            Some(id) => Some(self.checker.require_institution(id).await?),
            None => None,
        };
        if let (Profile::Family { children }, Some(institution)) = (&new.profile, &institution) {
            if !children.is_empty() {
                self.checker
                    .require_family_children(children, institution.id, WriteMode::Create)
                    .await?;
            }
        }

        if self.repo.find_account_by_username(&new.username).await?.is_some() {
            return Err(username_conflict(&new.username));
        }

        let account = Account {
            id: AccountId::new(),
            username: new.username,
            password_hash: self.hash_password(&new.password)?,
            institution_id: new.institution_id,
            last_login: None,
            created_at: Utc::now(),
            profile: new.profile,
        };
        self.repo.insert_account(account.clone()).await?;

        tracing::info!(account_id = %account.id, role = %role, "account created");
        Ok(AccountView { account, institution })
    }

    pub async fn get_account(&self, principal: &Principal, role: Role, raw_id: &str) -> DomainResult<AccountView> {
        let target = raw_id.parse::<AccountId>().ok();
        authorize(
            principal,
            Permission::new(ResourceType::for_role(role), Action::Read),
            target.as_ref(),
        )?;
        let id = AccountId::parse_field("id", raw_id)?;

        let account = self.load_account(id, role).await?;
        self.view(account).await
    }

    /// List accounts of `role` with sort, pagination and field projection
    /// applied. Returns output documents.
    pub async fn list_accounts(
        &self,
        principal: &Principal,
        role: Role,
        params: &ListParams,
    ) -> DomainResult<Vec<JsonValue>> {
        authorize(principal, Permission::new(ResourceType::for_role(role), Action::List), None)?;
        let query = params.parse()?;

        let accounts = self.repo.list_accounts(role).await?;
        let views = self.views(accounts).await?;
        let page = query.sort_and_paginate(views, AccountView::to_json);
        Ok(page.iter().map(|v| query.project(v.to_json())).collect())
    }

    /// Partial update: only supplied fields change.
    pub async fn update_account(
        &self,
        principal: &Principal,
        role: Role,
        raw_id: &str,
        payload: impl Into<Payload>,
    ) -> DomainResult<AccountView> {
        let payload: Payload = payload.into();
        let target = raw_id.parse::<AccountId>().ok();
        authorize(
            principal,
            Permission::new(ResourceType::for_role(role), Action::Update),
            target.as_ref(),
        )?;
        let id = AccountId::parse_field("id", raw_id)?;
        let patch = validate_account_patch(role, payload.json()?)?;

        let mut account = self.load_account(id, role).await?;

        if let Some(institution_id) = patch.institution_id {
            self.checker.require_institution(institution_id).await?;
            account.institution_id = Some(institution_id);
        }
        if let Some(username) = patch.username {
            if let Some(existing) = self.repo.find_account_by_username(&username).await? {
                if existing.id != account.id {
                    return Err(username_conflict(&username));
                }
            }
            account.username = username;
        }

        let institution_changed = patch.institution_id.is_some();
        match &mut account.profile {
            Profile::Child { gender, age } => {
                if let Some(g) = patch.gender {
                    *gender = g;
                }
                if let Some(a) = patch.age {
                    *age = a;
                }
            }
            Profile::Family { children } => {
                if let Some(next) = patch.children {
                    *children = next;
                }
                if let (Some(institution_id), true) = (
                    account.institution_id,
                    institution_changed || !children.is_empty(),
                ) {
                    self.checker
                        .require_family_children(children, institution_id, WriteMode::Update)
                        .await?;
                }
            }
            Profile::Application { application_name } => {
                if let Some(name) = patch.application_name {
                    *application_name = name;
                }
            }
            Profile::Admin | Profile::Educator | Profile::HealthProfessional => {}
        }

        self.repo.update_account(account.clone()).await?;

        tracing::info!(account_id = %account.id, role = %role, "account updated");
        self.view(account).await
    }

    /// Delete any account. Absent accounts are not an error. Deleting a group
    /// owner removes the groups it owns.
    pub async fn delete_account(&self, principal: &Principal, raw_id: &str) -> DomainResult<()> {
        let target = raw_id.parse::<AccountId>().ok();
        authorize(principal, Permission::new(ResourceType::Account, Action::Delete), target.as_ref())?;
        let id = AccountId::parse_field("id", raw_id)?;

        let Some(account) = self.repo.get_account(id).await? else {
            tracing::debug!(account_id = %id, "delete of absent account");
            return Ok(());
        };

        if account.role().can_own_groups() {
            let removed = self.repo.delete_groups_of_owner(id).await?;
            tracing::debug!(account_id = %id, removed, "owned children groups removed");
        }
        self.repo.delete_account(id).await?;

        tracing::info!(account_id = %id, role = %account.role(), "account deleted");
        Ok(())
    }

    /// Fetch an account that must exist and have `role`.
    async fn load_account(&self, id: AccountId, role: Role) -> DomainResult<Account> {
        self.repo
            .get_account(id)
            .await?
            .filter(|a| a.role() == role)
            .ok_or_else(|| DomainError::not_found(USER_NOT_FOUND))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use accountd_auth::{Principal, Role};
    use accountd_core::{AccountId, DomainError, ListParams, Payload, ValidationError};

    use crate::orchestrator::test_support::*;

    #[tokio::test]
    async fn create_then_read_returns_supplied_fields() {
        let orch = orchestrator();
        let inst = institution(&orch, "North").await;

        let created = orch
            .create_account(&admin(), Role::Child, &child_payload("c1", &inst))
            .await
            .unwrap();
        let read = orch
            .get_account(&admin(), Role::Child, &created.account.id.to_string())
            .await
            .unwrap();

        let out = read.to_json();
        assert_eq!(out["username"], "c1");
        assert_eq!(out["gender"], "male");
        assert_eq!(out["age"], 11);
        assert_eq!(out["institution"]["id"], inst);
        assert_eq!(out["institution"]["name"], "North");
        assert!(out.get("password").is_none());
    }

    #[tokio::test]
    async fn non_admin_cannot_create_and_is_denied_before_validation() {
        let orch = orchestrator();
        let inst = institution(&orch, "North").await;
        let educator = educator(&orch, "e1", &inst).await;

        // Empty payload would fail validation; authorization is checked first.
        let err = orch
            .create_account(&educator, Role::Child, &json!({}))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn malformed_input_from_a_denied_caller_is_forbidden() {
        let orch = orchestrator();
        let inst = institution(&orch, "North").await;
        let me = child(&orch, "c1", &inst).await;
        let principal = Principal::new(me, Role::Child);

        let err = orch
            .create_account(&principal, Role::Child, Payload::from_slice(b"{not json"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let bad_page = ListParams { page: Some("abc".into()), ..ListParams::default() };
        let err = orch.list_accounts(&principal, Role::Child, &bad_page).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        // The same input from an admin reaches validation.
        let err = orch
            .create_account(&admin(), Role::Child, Payload::from_slice(b"{not json"))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "invalid_json");
        let err = orch.list_accounts(&admin(), Role::Child, &bad_page).await.unwrap_err();
        assert_eq!(err.code(), "invalid_query");
    }

    #[tokio::test]
    async fn unknown_institution_is_reported_before_duplicate_username() {
        let orch = orchestrator();
        let inst = institution(&orch, "North").await;
        child(&orch, "c1", &inst).await;

        let unknown = accountd_core::InstitutionId::new().to_string();
        let err = orch
            .create_account(&admin(), Role::Child, &child_payload("c1", &unknown))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "institution_not_registered");

        let err = orch
            .create_account(&admin(), Role::Child, &child_payload("c1", &inst))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn username_is_unique_across_roles() {
        let orch = orchestrator();
        let inst = institution(&orch, "North").await;
        child(&orch, "taken", &inst).await;

        let err = orch
            .create_account(
                &admin(),
                Role::Application,
                &json!({"username": "taken", "password": "p", "application_name": "app"}),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn child_reads_only_itself() {
        let orch = orchestrator();
        let inst = institution(&orch, "North").await;
        let me = child(&orch, "c1", &inst).await;
        let other = child(&orch, "c2", &inst).await;
        let principal = Principal::new(me, Role::Child);

        assert!(orch.get_account(&principal, Role::Child, &me.to_string()).await.is_ok());
        let err = orch
            .get_account(&principal, Role::Child, &other.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
        let err = orch
            .list_accounts(&principal, Role::Child, &ListParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn malformed_id_beats_not_found() {
        let orch = orchestrator();
        let err = orch.get_account(&admin(), Role::Child, "123").await.unwrap_err();
        assert_eq!(err, DomainError::Validation(ValidationError::invalid_id("id", "123")));

        let err = orch
            .get_account(&admin(), Role::Child, &AccountId::new().to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn account_of_another_role_is_not_found_under_this_role() {
        let orch = orchestrator();
        let inst = institution(&orch, "North").await;
        let educator = educator(&orch, "e1", &inst).await;
        let err = orch
            .get_account(&admin(), Role::Child, &educator.subject_id.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound(_)));
    }

    #[tokio::test]
    async fn list_projects_sorts_and_paginates() {
        let orch = orchestrator();
        let inst = institution(&orch, "North").await;
        for name in ["b", "c", "a"] {
            child(&orch, name, &inst).await;
        }

        let params = ListParams {
            fields: Some("username".into()),
            sort: Some("-username".into()),
            page: Some("1".into()),
            limit: Some("2".into()),
        };
        let page = orch.list_accounts(&admin(), Role::Child, &params).await.unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0]["username"], "c");
        assert_eq!(page[1]["username"], "b");
        let keys: Vec<_> = page[0].as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys.len(), 2);
        assert!(page[0].get("gender").is_none());
    }

    #[tokio::test]
    async fn patch_changes_only_supplied_fields() {
        let orch = orchestrator();
        let inst = institution(&orch, "North").await;
        let id = child(&orch, "c1", &inst).await;

        let updated = orch
            .update_account(&admin(), Role::Child, &id.to_string(), &json!({"age": 12, "id": "ignored"}))
            .await
            .unwrap();
        let out = updated.to_json();
        assert_eq!(out["age"], 12);
        assert_eq!(out["gender"], "male");
        assert_eq!(out["username"], "c1");
        assert_eq!(out["id"], id.to_string());
    }

    #[tokio::test]
    async fn patch_rejects_password_and_foreign_username() {
        let orch = orchestrator();
        let inst = institution(&orch, "North").await;
        let id = child(&orch, "c1", &inst).await;
        child(&orch, "c2", &inst).await;

        let err = orch
            .update_account(&admin(), Role::Child, &id.to_string(), &json!({"password": "x"}))
            .await
            .unwrap_err();
        assert_eq!(err.code(), "read_only_field");

        let err = orch
            .update_account(&admin(), Role::Child, &id.to_string(), &json!({"username": "c2"}))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));

        // Keeping one's own username is not a conflict.
        orch.update_account(&admin(), Role::Child, &id.to_string(), &json!({"username": "c1"}))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn nobody_but_admin_updates_accounts_even_themselves() {
        let orch = orchestrator();
        let inst = institution(&orch, "North").await;
        let me = child(&orch, "c1", &inst).await;
        let err = orch
            .update_account(&Principal::new(me, Role::Child), Role::Child, &me.to_string(), &json!({"age": 3}))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn family_children_must_exist() {
        let orch = orchestrator();
        let inst = institution(&orch, "North").await;
        let kid = child(&orch, "c1", &inst).await;
        let ghost = AccountId::new();

        let family = orch
            .create_account(
                &admin(),
                Role::Family,
                &json!({"username": "f1", "password": "p", "institution_id": inst, "children": [kid.to_string()]}),
            )
            .await
            .unwrap();
        assert_eq!(family.to_json()["children"], json!([kid.to_string()]));

        let err = orch
            .create_account(
                &admin(),
                Role::Family,
                &json!({"username": "f2", "password": "p", "institution_id": inst, "children": [ghost.to_string()]}),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code(), "children_not_registered");
    }

    #[tokio::test]
    async fn delete_is_idempotent_and_admin_only() {
        let orch = orchestrator();
        let inst = institution(&orch, "North").await;
        let id = child(&orch, "c1", &inst).await;

        let err = orch
            .delete_account(&Principal::new(id, Role::Child), &id.to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        orch.delete_account(&admin(), &id.to_string()).await.unwrap();
        orch.delete_account(&admin(), &id.to_string()).await.unwrap();

        let err = orch.delete_account(&admin(), "not-an-id").await.unwrap_err();
        assert_eq!(err.code(), "invalid_id_format");
    }
}
