use serde_json::Value;

use crate::ditio::model::{Machine, Task};

pub type Id = String;
pub type IdRef = str;

/// Operations the round-trip scenarios need from the integration API.
///
/// `Ok(None)` means the API answered with a failure that was already
/// reported; `Err` is reserved for failures the caller cannot continue past,
/// such as authentication or transport errors.
#[async_trait::async_trait]
pub trait Integration: Send + Sync {
    async fn get_task(&self, id: &IdRef) -> Result<Option<Task>, anyhow::Error>;
    async fn get_task_by_external_ids(
        &self,
        external_project_number: &str,
        external_id: &str,
    ) -> Result<Option<Task>, anyhow::Error>;
    async fn create_task(&self, task: &Task) -> Result<Option<Task>, anyhow::Error>;
    async fn update_task(&self, task: &Task) -> Result<Option<Value>, anyhow::Error>;
    async fn delete_task(&self, id: &IdRef) -> Result<Option<Value>, anyhow::Error>;

    async fn get_machine(&self, id: &IdRef) -> Result<Option<Machine>, anyhow::Error>;
    async fn get_machine_by_number(
        &self,
        machine_number: &str,
    ) -> Result<Option<Machine>, anyhow::Error>;
    async fn create_machine(&self, machine: &Machine) -> Result<Option<Machine>, anyhow::Error>;
    async fn update_machine(&self, machine: &Machine) -> Result<Option<Value>, anyhow::Error>;
    async fn delete_machine(&self, id: &IdRef) -> Result<Option<Value>, anyhow::Error>;
}
