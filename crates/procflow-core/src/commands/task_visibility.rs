use crate::errors::{FlowError, Result};
use crate::flownode::services::ActivityInstanceService;

/// Hide tasks from a user's list
///
/// Every id is checked before anything is hidden. An id repeated within
/// `task_ids` counts once.
///
/// # Errors
///
/// `TaskVisibility` naming the first task already hidden; no task is hidden
/// then.
pub fn hide_tasks(
    activities: &dyn ActivityInstanceService,
    user_id: i64,
    task_ids: &[i64],
) -> Result<()> {
    let mut unique: Vec<i64> = Vec::with_capacity(task_ids.len());
    for &task_id in task_ids {
        if !unique.contains(&task_id) {
            unique.push(task_id);
        }
    }

    for &task_id in &unique {
        if activities.is_task_hidden(user_id, task_id)? {
            return Err(FlowError::TaskVisibility { task_id, user_id });
        }
    }
    activities.hide_tasks(user_id, &unique)
}

/// # Errors
///
/// Store failures.
pub fn unhide_tasks(
    activities: &dyn ActivityInstanceService,
    user_id: i64,
    task_ids: &[i64],
) -> Result<()> {
    activities.unhide_tasks(user_id, task_ids)
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;
    use crate::flownode::model::HiddenTask;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingActivities {
        hidden_batches: Mutex<Vec<Vec<i64>>>,
    }

    impl ActivityInstanceService for RecordingActivities {
        fn is_task_hidden(&self, _user_id: i64, _task_id: i64) -> Result<bool> {
            Ok(false)
        }

        fn hide_tasks(&self, _user_id: i64, task_ids: &[i64]) -> Result<()> {
            self.hidden_batches.lock().unwrap().push(task_ids.to_vec());
            Ok(())
        }

        fn unhide_tasks(&self, _user_id: i64, _task_ids: &[i64]) -> Result<()> {
            Ok(())
        }

        fn hidden_tasks(&self, _user_id: i64) -> Result<Vec<HiddenTask>> {
            Ok(Vec::new())
        }
    }

    #[test]
    fn test_repeated_ids_reach_store_once_in_first_seen_order() {
        let activities = RecordingActivities::default();

        hide_tasks(&activities, 3, &[12, 10, 12, 10, 11]).unwrap();

        assert_eq!(
            *activities.hidden_batches.lock().unwrap(),
            vec![vec![12, 10, 11]]
        );
    }
}
