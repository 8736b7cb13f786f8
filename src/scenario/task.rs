use anyhow::Context;
use tracing::{info, warn};

use super::Outcome;
use crate::core::Integration;
use crate::ditio::model::Task;

pub const TASK_NAME_SUFFIX: &str = " (Modified task name)";

/// Create `draft`, fetch it back by its external key, rename it, then delete it.
pub async fn run_task_round_trip(
    integration: &dyn Integration,
    draft: &Task,
) -> Result<Outcome, anyhow::Error> {
    let Some(created) = integration.create_task(draft).await? else {
        info!(
            message = "Task was not created, it may already exist",
            external_project_number = %draft.external_project_number,
            external_id = %draft.external_id,
        );
        return Ok(Outcome::NotCreated);
    };
    let id = created.id.clone().context("created task has no id")?;

    let fetched = integration
        .get_task_by_external_ids(&created.external_project_number, &created.external_id)
        .await?;
    let Some(mut task) = fetched else {
        warn!(message = "Created task could not be fetched by external ids", task_id = %id);
        return Ok(Outcome::NotFetched { id });
    };

    task.id.get_or_insert_with(|| id.clone());
    task.name.push_str(TASK_NAME_SUFFIX);
    let updated = integration.update_task(&task).await?.is_some();

    let deleted = integration.delete_task(&id).await?.is_some();

    info!(message = "Task round trip finished", task_id = %id, updated, deleted);
    Ok(Outcome::Completed {
        id,
        updated,
        deleted,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::testing::Recorder;

    fn draft() -> Task {
        Task {
            external_project_number: "3210105".into(),
            external_id: "3210105-0120-999".into(),
            external_dim01: Some("3210".into()),
            name: "TEST TEST".into(),
            active: true,
            ..Task::default()
        }
    }

    #[tokio::test]
    async fn full_round_trip() {
        let recorder = Recorder::default();

        let outcome = run_task_round_trip(&recorder, &draft()).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Completed {
                id: "t-1".into(),
                updated: true,
                deleted: true,
            }
        );
        assert_eq!(
            recorder.calls(),
            vec![
                "create_task TEST TEST",
                "get_task_by_external_ids 3210105/3210105-0120-999",
                "update_task t-1=TEST TEST (Modified task name)",
                "delete_task t-1",
            ]
        );
    }

    #[tokio::test]
    async fn stops_when_creation_fails() {
        let recorder = Recorder::degrading(&["create_task"]);

        let outcome = run_task_round_trip(&recorder, &draft()).await.unwrap();

        assert_eq!(outcome, Outcome::NotCreated);
        assert_eq!(recorder.calls(), vec!["create_task TEST TEST"]);
    }

    #[tokio::test]
    async fn stops_when_lookup_comes_back_empty() {
        let recorder = Recorder::degrading(&["get_task_by_external_ids"]);

        let outcome = run_task_round_trip(&recorder, &draft()).await.unwrap();

        assert_eq!(outcome, Outcome::NotFetched { id: "t-1".into() });
        assert_eq!(recorder.calls().len(), 2);
    }

    #[tokio::test]
    async fn failed_update_still_deletes() {
        let recorder = Recorder::degrading(&["update_task"]);

        let outcome = run_task_round_trip(&recorder, &draft()).await.unwrap();

        assert_eq!(
            outcome,
            Outcome::Completed {
                id: "t-1".into(),
                updated: false,
                deleted: true,
            }
        );
    }
}
