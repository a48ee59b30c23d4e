use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;

use accountd_core::{Entity, InstitutionId};

/// Organizational entity that child, educator, health professional and
/// family accounts belong to. Unique on `(institution_type, name)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Institution {
    pub id: InstitutionId,
    #[serde(rename = "type")]
    pub institution_type: String,
    pub name: String,
    pub address: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub created_at: DateTime<Utc>,
}

impl Institution {
    /// Uniqueness key.
    pub fn key(&self) -> (&str, &str) {
        (&self.institution_type, &self.name)
    }

    pub fn to_json(&self) -> serde_json::Value {
        json!({
            "id": self.id.to_string(),
            "type": self.institution_type,
            "name": self.name,
            "address": self.address,
            "latitude": self.latitude,
            "longitude": self.longitude,
        })
    }
}

impl Entity for Institution {
    type Id = InstitutionId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn resource_name() -> &'static str {
        "institution"
    }
}
