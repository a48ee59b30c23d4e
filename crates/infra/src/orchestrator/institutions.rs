use chrono::Utc;
use serde_json::Value as JsonValue;

use accountd_auth::{Action, Permission, Principal, ResourceType, authorize};
use accountd_core::{DomainError, DomainResult, InstitutionId, ListParams, Payload};
use accountd_directory::Institution;
use accountd_directory::validation::{validate_institution_patch, validate_new_institution};

use super::Orchestrator;
use crate::repository::RepositoryError;

fn permission(action: Action) -> Permission {
    Permission::new(ResourceType::Institution, action)
}

fn key_conflict(institution_type: &str, name: &str) -> DomainError {
    DomainError::conflict(format!(
        "A registration with the same unique data already exists: institution '{name}' of type '{institution_type}'."
    ))
}

impl Orchestrator {
    pub async fn create_institution(
        &self,
        principal: &Principal,
        payload: impl Into<Payload>,
    ) -> DomainResult<Institution> {
        let payload: Payload = payload.into();
        authorize(principal, permission(Action::Create), None)?;
        let new = validate_new_institution(payload.json()?)?;

        if self
            .repo
            .find_institution_by_key(&new.institution_type, &new.name)
            .await?
            .is_some()
        {
            return Err(key_conflict(&new.institution_type, &new.name));
        }

        let institution = Institution {
            id: InstitutionId::new(),
            institution_type: new.institution_type,
            name: new.name,
            address: new.address,
            latitude: new.latitude,
            longitude: new.longitude,
            created_at: Utc::now(),
        };
        self.repo.insert_institution(institution.clone()).await?;

        tracing::info!(institution_id = %institution.id, "institution created");
        Ok(institution)
    }

    pub async fn get_institution(&self, principal: &Principal, raw_id: &str) -> DomainResult<Institution> {
        authorize(principal, permission(Action::Read), None)?;
        let id = InstitutionId::parse_field("id", raw_id)?;
        self.load_institution(id).await
    }

    pub async fn list_institutions(&self, principal: &Principal, params: &ListParams) -> DomainResult<Vec<JsonValue>> {
        authorize(principal, permission(Action::List), None)?;
        let query = params.parse()?;
        let institutions = self.repo.list_institutions().await?;
        let page = query.sort_and_paginate(institutions, Institution::to_json);
        Ok(page.iter().map(|i| query.project(i.to_json())).collect())
    }

    pub async fn update_institution(
        &self,
        principal: &Principal,
        raw_id: &str,
        payload: impl Into<Payload>,
    ) -> DomainResult<Institution> {
        let payload: Payload = payload.into();
        authorize(principal, permission(Action::Update), None)?;
        let id = InstitutionId::parse_field("id", raw_id)?;
        let patch = validate_institution_patch(payload.json()?)?;

        let mut institution = self.load_institution(id).await?;
        if let Some(t) = patch.institution_type {
            institution.institution_type = t;
        }
        if let Some(n) = patch.name {
            institution.name = n;
        }
        if patch.address.is_some() {
            institution.address = patch.address;
        }
        if patch.latitude.is_some() {
            institution.latitude = patch.latitude;
        }
        if patch.longitude.is_some() {
            institution.longitude = patch.longitude;
        }

        if let Some(existing) = self
            .repo
            .find_institution_by_key(&institution.institution_type, &institution.name)
            .await?
        {
            if existing.id != institution.id {
                return Err(key_conflict(&institution.institution_type, &institution.name));
            }
        }
        self.repo.update_institution(institution.clone()).await?;

        tracing::info!(institution_id = %institution.id, "institution updated");
        Ok(institution)
    }

    /// Blocked while any account references the institution; otherwise
    /// succeeds whether or not it existed.
    pub async fn delete_institution(&self, principal: &Principal, raw_id: &str) -> DomainResult<()> {
        authorize(principal, permission(Action::Delete), None)?;
        let id = InstitutionId::parse_field("id", raw_id)?;

        let outcome = self.repo.delete_institution(id).await;
        if let Err(RepositoryError::InUse { dependents }) = &outcome {
            tracing::info!(institution_id = %id, dependents, "institution delete blocked by associated accounts");
        }
        if outcome? {
            tracing::info!(institution_id = %id, "institution deleted");
        }
        Ok(())
    }

    async fn load_institution(&self, id: InstitutionId) -> DomainResult<Institution> {
        self.repo
            .get_institution(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Institution not found!"))
    }
}
