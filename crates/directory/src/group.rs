use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use accountd_core::{AccountId, Entity, GroupId};

/// Named collection of child references, owned by exactly one educator or
/// health professional. Unique on `(owner_id, name)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildrenGroup {
    pub id: GroupId,
    pub owner_id: AccountId,
    pub name: String,
    pub school_class: Option<String>,
    /// Ordered, duplicate-free.
    pub children: Vec<AccountId>,
    pub created_at: DateTime<Utc>,
}

impl ChildrenGroup {
    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "id": self.id.to_string(),
            "name": self.name,
            "school_class": self.school_class,
            "children": self.children.iter().map(|c| c.to_string()).collect::<Vec<_>>(),
            "owner_id": self.owner_id.to_string(),
        })
    }
}

impl Entity for ChildrenGroup {
    type Id = GroupId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn resource_name() -> &'static str {
        "children group"
    }
}

/// Drop repeated ids, keeping first occurrences in order.
pub fn dedup_ordered(ids: Vec<AccountId>) -> Vec<AccountId> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(*id)).collect()
}
