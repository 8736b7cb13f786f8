use anyhow::Context;
use tracing::{info, warn};

use super::Outcome;
use crate::core::Integration;
use crate::ditio::model::Machine;

pub const MACHINE_NAME_SUFFIX: &str = " (Modified machine name)";

/// Create `draft`, fetch it back by machine number, rename it, then delete it.
pub async fn run_machine_round_trip(
    integration: &dyn Integration,
    draft: &Machine,
) -> Result<Outcome, anyhow::Error> {
    let Some(created) = integration.create_machine(draft).await? else {
        info!(
            message = "Machine was not created, it may already exist",
            machine_number = %draft.machine_number,
        );
        return Ok(Outcome::NotCreated);
    };
    let id = created.id.clone().context("created machine has no id")?;

    let Some(mut machine) = integration
        .get_machine_by_number(&created.machine_number)
        .await?
    else {
        warn!(message = "Created machine could not be fetched by number", machine_id = %id);
        return Ok(Outcome::NotFetched { id });
    };

    machine.id.get_or_insert_with(|| id.clone());
    machine.name.push_str(MACHINE_NAME_SUFFIX);
    let updated = integration.update_machine(&machine).await?.is_some();

    let deleted = integration.delete_machine(&id).await?.is_some();

    info!(message = "Machine round trip finished", machine_id = %id, updated, deleted);
    Ok(Outcome::Completed {
        id,
        updated,
        deleted,
    })
}
