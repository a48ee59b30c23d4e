//! Infrastructure layer: persistence collaborator, reference resolution and
//! the resource orchestrator that composes the account core.

pub mod consistency;
pub mod orchestrator;
pub mod repository;

pub use consistency::{ConsistencyChecker, WriteMode};
pub use orchestrator::{AccessToken, AccountView, Orchestrator};
pub use repository::{
    AccountRepository, GroupRepository, InMemoryRepository, InstitutionRepository, Repository, RepositoryError,
    SharedRepository,
};
