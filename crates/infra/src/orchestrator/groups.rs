use chrono::Utc;
use serde_json::Value as JsonValue;

use accountd_auth::{Action, Permission, Principal, ResourceType, Role, authorize};
use accountd_core::{AccountId, DomainError, DomainResult, GroupId, ListParams, Payload};
use accountd_directory::ChildrenGroup;
use accountd_directory::validation::{validate_group_patch, validate_new_group};

use super::Orchestrator;
use crate::consistency::WriteMode;

const GROUP_NOT_FOUND: &str = "Children group not found!";

/// Authorize `action` on the groups of the owner named in the path, then
/// parse the owner id. A malformed owner id cannot match the caller, so it
/// is denied before it is reported as malformed.
fn authorize_owner(principal: &Principal, action: Action, raw_owner: &str) -> DomainResult<AccountId> {
    let target = raw_owner.parse::<AccountId>().ok();
    authorize(principal, Permission::new(ResourceType::ChildrenGroup, action), target.as_ref())?;
    Ok(AccountId::parse_field("id", raw_owner)?)
}

fn name_conflict(name: &str) -> DomainError {
    DomainError::conflict(format!("A children group named '{name}' is already registered for this owner!"))
}

impl Orchestrator {
    /// Create a group owned by the account in the path. The owner must exist
    /// with `owner_role`, and every child must be registered.
    pub async fn create_group(
        &self,
        principal: &Principal,
        owner_role: Role,
        raw_owner: &str,
        payload: impl Into<Payload>,
    ) -> DomainResult<ChildrenGroup> {
        let payload: Payload = payload.into();
        let owner_id = authorize_owner(principal, Action::Create, raw_owner)?;
        let new = validate_new_group(payload.json()?)?;

        let owner_exists = self
            .repo
            .get_account(owner_id)
            .await?
            .is_some_and(|a| a.role() == owner_role);
        if !owner_exists {
            return Err(DomainError::not_found(format!("{} not found!", owner_label(owner_role))));
        }

        self.checker.require_children(&new.children, WriteMode::Create).await?;

        if self.repo.find_group_by_name(owner_id, &new.name).await?.is_some() {
            return Err(name_conflict(&new.name));
        }

        let group = ChildrenGroup {
            id: GroupId::new(),
            owner_id,
            name: new.name,
            school_class: new.school_class,
            children: new.children,
            created_at: Utc::now(),
        };
        self.repo.insert_group(group.clone()).await?;

        tracing::info!(group_id = %group.id, owner_id = %owner_id, "children group created");
        Ok(group)
    }

    pub async fn get_group(&self, principal: &Principal, raw_owner: &str, raw_group: &str) -> DomainResult<ChildrenGroup> {
        let owner_id = authorize_owner(principal, Action::Read, raw_owner)?;
        let group_id = GroupId::parse_field("group_id", raw_group)?;
        self.load_group(owner_id, group_id).await
    }

    pub async fn list_groups(
        &self,
        principal: &Principal,
        raw_owner: &str,
        params: &ListParams,
    ) -> DomainResult<Vec<JsonValue>> {
        let owner_id = authorize_owner(principal, Action::List, raw_owner)?;
        let query = params.parse()?;
        let groups = self.repo.list_groups(owner_id).await?;
        let page = query.sort_and_paginate(groups, ChildrenGroup::to_json);
        Ok(page.iter().map(|g| query.project(g.to_json())).collect())
    }

    pub async fn update_group(
        &self,
        principal: &Principal,
        raw_owner: &str,
        raw_group: &str,
        payload: impl Into<Payload>,
    ) -> DomainResult<ChildrenGroup> {
        let payload: Payload = payload.into();
        let owner_id = authorize_owner(principal, Action::Update, raw_owner)?;
        let group_id = GroupId::parse_field("group_id", raw_group)?;
        let patch = validate_group_patch(payload.json()?)?;

        let mut group = self.load_group(owner_id, group_id).await?;

        if let Some(children) = patch.children {
            self.checker.require_children(&children, WriteMode::Update).await?;
            group.children = children;
        }
        if let Some(name) = patch.name {
            if let Some(existing) = self.repo.find_group_by_name(owner_id, &name).await? {
                if existing.id != group.id {
                    return Err(name_conflict(&name));
                }
            }
            group.name = name;
        }
        if patch.school_class.is_some() {
            group.school_class = patch.school_class;
        }

        self.repo.update_group(group.clone()).await?;
        tracing::info!(group_id = %group.id, owner_id = %owner_id, "children group updated");
        Ok(group)
    }

    /// Succeeds when the group, or its owner, is already gone.
    pub async fn delete_group(&self, principal: &Principal, raw_owner: &str, raw_group: &str) -> DomainResult<()> {
        let owner_id = authorize_owner(principal, Action::Delete, raw_owner)?;
        let group_id = GroupId::parse_field("group_id", raw_group)?;

        match self.repo.get_group(group_id).await? {
            Some(group) if group.owner_id == owner_id => {
                self.repo.delete_group(group_id).await?;
                tracing::info!(group_id = %group_id, owner_id = %owner_id, "children group deleted");
            }
            _ => tracing::debug!(group_id = %group_id, owner_id = %owner_id, "delete of absent children group"),
        }
        Ok(())
    }

    /// A group is only visible under its own owner.
    async fn load_group(&self, owner_id: AccountId, group_id: GroupId) -> DomainResult<ChildrenGroup> {
        self.repo
            .get_group(group_id)
            .await?
            .filter(|g| g.owner_id == owner_id)
            .ok_or_else(|| DomainError::not_found(GROUP_NOT_FOUND))
    }
}

fn owner_label(role: Role) -> &'static str {
    match role {
        Role::HealthProfessional => "Health professional",
        Role::Educator => "Educator",
        _ => "Owner",
    }
}
