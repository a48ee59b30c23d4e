use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use accountd_auth::Role;
use accountd_core::{AccountId, Entity, GroupId, InstitutionId};
use accountd_directory::{Account, ChildrenGroup, Institution};

use super::{
    AccountRepository, GroupRepository, InstitutionRepository, RepositoryError, RepositoryResult,
};

#[derive(Debug, Default)]
struct Tables {
    accounts: HashMap<AccountId, Account>,
    institutions: HashMap<InstitutionId, Institution>,
    groups: HashMap<GroupId, ChildrenGroup>,
}

/// In-memory repository for tests/dev.
///
/// All three tables sit behind one lock so a uniqueness check and the write
/// it guards are atomic.
#[derive(Debug, Default)]
pub struct InMemoryRepository {
    tables: RwLock<Tables>,
}

impl InMemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RepositoryResult<RwLockReadGuard<'_, Tables>> {
        self.tables
            .read()
            .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".to_string()))
    }

    fn write(&self) -> RepositoryResult<RwLockWriteGuard<'_, Tables>> {
        self.tables
            .write()
            .map_err(|_| RepositoryError::Unavailable("repository lock poisoned".to_string()))
    }
}

fn not_found<T: Entity>(id: T::Id) -> RepositoryError {
    RepositoryError::NotFound(format!("{} {id} not found", T::resource_name()))
}

/// Uniqueness and institution reference of an account about to be written.
fn check_account(tables: &Tables, account: &Account, except: Option<AccountId>) -> RepositoryResult<()> {
    let taken = tables
        .accounts
        .values()
        .any(|a| a.username == account.username && Some(a.id) != except);
    if taken {
        return Err(RepositoryError::Duplicate(format!(
            "{} '{}' already exists",
            Account::resource_name(),
            account.username
        )));
    }
    match account.institution_id {
        Some(id) if !tables.institutions.contains_key(&id) => Err(RepositoryError::UnknownInstitution(id)),
        _ => Ok(()),
    }
}

fn institution_key_taken(tables: &Tables, institution: &Institution) -> bool {
    tables
        .institutions
        .values()
        .any(|i| i.key() == institution.key() && i.id != institution.id)
}

fn group_name_taken(tables: &Tables, group: &ChildrenGroup) -> bool {
    tables
        .groups
        .values()
        .any(|g| g.owner_id == group.owner_id && g.name == group.name && g.id != group.id)
}

/// Stable listing order: creation time, then id.
fn ordered<T>(mut items: Vec<T>, created_at: impl Fn(&T) -> DateTime<Utc>) -> Vec<T>
where
    T: Entity,
    T::Id: Ord,
{
    items.sort_by(|a, b| (created_at(a), a.id()).cmp(&(created_at(b), b.id())));
    items
}

#[async_trait]
impl AccountRepository for InMemoryRepository {
    async fn get_account(&self, id: AccountId) -> RepositoryResult<Option<Account>> {
        Ok(self.read()?.accounts.get(&id).cloned())
    }

    async fn find_account_by_username(&self, username: &str) -> RepositoryResult<Option<Account>> {
        Ok(self
            .read()?
            .accounts
            .values()
            .find(|a| a.username == username)
            .cloned())
    }

    async fn list_accounts(&self, role: Role) -> RepositoryResult<Vec<Account>> {
        let tables = self.read()?;
        let accounts: Vec<Account> = tables
            .accounts
            .values()
            .filter(|a| a.role() == role)
            .cloned()
            .collect();
        Ok(ordered(accounts, |a: &Account| a.created_at))
    }

    async fn insert_account(&self, account: Account) -> RepositoryResult<()> {
        let mut tables = self.write()?;
        check_account(&tables, &account, None)?;
        tables.accounts.insert(account.id, account);
        Ok(())
    }

    async fn update_account(&self, account: Account) -> RepositoryResult<()> {
        let mut tables = self.write()?;
        if !tables.accounts.contains_key(&account.id) {
            return Err(not_found::<Account>(account.id));
        }
        check_account(&tables, &account, Some(account.id))?;
        tables.accounts.insert(account.id, account);
        Ok(())
    }

    async fn touch_last_login(&self, id: AccountId, at: DateTime<Utc>) -> RepositoryResult<()> {
        let mut tables = self.write()?;
        let account = tables.accounts.get_mut(&id).ok_or_else(|| not_found::<Account>(id))?;
        account.last_login = Some(at);
        Ok(())
    }

    async fn set_password_hash(&self, id: AccountId, password_hash: String) -> RepositoryResult<()> {
        let mut tables = self.write()?;
        let account = tables.accounts.get_mut(&id).ok_or_else(|| not_found::<Account>(id))?;
        account.password_hash = password_hash;
        Ok(())
    }

    async fn delete_account(&self, id: AccountId) -> RepositoryResult<bool> {
        Ok(self.write()?.accounts.remove(&id).is_some())
    }
}

#[async_trait]
impl InstitutionRepository for InMemoryRepository {
    async fn get_institution(&self, id: InstitutionId) -> RepositoryResult<Option<Institution>> {
        Ok(self.read()?.institutions.get(&id).cloned())
    }

    async fn find_institution_by_key(
        &self,
        institution_type: &str,
        name: &str,
    ) -> RepositoryResult<Option<Institution>> {
        Ok(self
            .read()?
            .institutions
            .values()
            .find(|i| i.key() == (institution_type, name))
            .cloned())
    }

    async fn list_institutions(&self) -> RepositoryResult<Vec<Institution>> {
        let institutions: Vec<Institution> = self.read()?.institutions.values().cloned().collect();
        Ok(ordered(institutions, |i: &Institution| i.created_at))
    }

    async fn insert_institution(&self, institution: Institution) -> RepositoryResult<()> {
        let mut tables = self.write()?;
        if institution_key_taken(&tables, &institution) {
            return Err(RepositoryError::Duplicate(format!(
                "{} '{}' of type '{}' already exists",
                Institution::resource_name(),
                institution.name,
                institution.institution_type
            )));
        }
        tables.institutions.insert(institution.id, institution);
        Ok(())
    }

    async fn update_institution(&self, institution: Institution) -> RepositoryResult<()> {
        let mut tables = self.write()?;
        if !tables.institutions.contains_key(&institution.id) {
            return Err(not_found::<Institution>(institution.id));
        }
        if institution_key_taken(&tables, &institution) {
            return Err(RepositoryError::Duplicate(format!(
                "{} '{}' of type '{}' already exists",
                Institution::resource_name(),
                institution.name,
                institution.institution_type
            )));
        }
        tables.institutions.insert(institution.id, institution);
        Ok(())
    }

    async fn delete_institution(&self, id: InstitutionId) -> RepositoryResult<bool> {
        let mut tables = self.write()?;
        let dependents = tables
            .accounts
            .values()
            .filter(|a| a.institution_id == Some(id))
            .count();
        if dependents > 0 {
            return Err(RepositoryError::InUse { dependents });
        }
        Ok(tables.institutions.remove(&id).is_some())
    }
}

#[async_trait]
impl GroupRepository for InMemoryRepository {
    async fn get_group(&self, id: GroupId) -> RepositoryResult<Option<ChildrenGroup>> {
        Ok(self.read()?.groups.get(&id).cloned())
    }

    async fn find_group_by_name(&self, owner_id: AccountId, name: &str) -> RepositoryResult<Option<ChildrenGroup>> {
        Ok(self
            .read()?
            .groups
            .values()
            .find(|g| g.owner_id == owner_id && g.name == name)
            .cloned())
    }

    async fn list_groups(&self, owner_id: AccountId) -> RepositoryResult<Vec<ChildrenGroup>> {
        let groups: Vec<ChildrenGroup> = self
            .read()?
            .groups
            .values()
            .filter(|g| g.owner_id == owner_id)
            .cloned()
            .collect();
        Ok(ordered(groups, |g: &ChildrenGroup| g.created_at))
    }

    async fn insert_group(&self, group: ChildrenGroup) -> RepositoryResult<()> {
        let mut tables = self.write()?;
        if group_name_taken(&tables, &group) {
            return Err(RepositoryError::Duplicate(format!(
                "{} '{}' already exists",
                ChildrenGroup::resource_name(),
                group.name
            )));
        }
        tables.groups.insert(group.id, group);
        Ok(())
    }

    async fn update_group(&self, group: ChildrenGroup) -> RepositoryResult<()> {
        let mut tables = self.write()?;
        if !tables.groups.contains_key(&group.id) {
            return Err(not_found::<ChildrenGroup>(group.id));
        }
        if group_name_taken(&tables, &group) {
            return Err(RepositoryError::Duplicate(format!(
                "{} '{}' already exists",
                ChildrenGroup::resource_name(),
                group.name
            )));
        }
        tables.groups.insert(group.id, group);
        Ok(())
    }

    async fn delete_group(&self, id: GroupId) -> RepositoryResult<bool> {
        Ok(self.write()?.groups.remove(&id).is_some())
    }

    async fn delete_groups_of_owner(&self, owner_id: AccountId) -> RepositoryResult<usize> {
        let mut tables = self.write()?;
        let before = tables.groups.len();
        tables.groups.retain(|_, g| g.owner_id != owner_id);
        Ok(before - tables.groups.len())
    }
}
