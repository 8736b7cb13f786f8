//! Integration records.
//!
//! Only the fields the integration reads or writes are typed. Anything else
//! the API returns is kept in `extra` so a fetched record can be modified and
//! sent back without losing data.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{Map, Value};

pub trait Resource: Serialize + DeserializeOwned + Send + Sync {
    /// Path segment of the collection under `/api/v4/integration`.
    const COLLECTION: &'static str;

    /// Internal id, assigned by the API on creation.
    fn id(&self) -> Option<&str>;
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub external_project_number: String,
    pub external_id: String,
    #[serde(rename = "externalDim01", default, skip_serializing_if = "Option::is_none")]
    pub external_dim01: Option<String>,
    pub name: String,
    #[serde(default)]
    pub active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Task {
    const COLLECTION: &'static str = "tasks";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}

#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Machine {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub company_id: String,
    pub machine_number: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub build_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    #[serde(default)]
    pub active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Resource for Machine {
    const COLLECTION: &'static str = "machines";

    fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }
}
