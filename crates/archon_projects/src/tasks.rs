//! Task CRUD, stage transitions, and fractional-order reordering with
//! opportunistic renormalization (spec §4.10).

use std::sync::Arc;

use archon_db::model::{Priority, Scope, Task};
use archon_db::projects::{
    get_task, list_tasks_for_project, list_tasks_in_stage, put_task, renormalize_stage_orders,
    reorder_task, transition_task_stage,
};
use archon_db::DbPool;
use archon_protocol::{ProjectId, SubjectId, TaskId, Timestamp};
use archon_rbac::{Principal, RbacEngine};

use crate::actions::{RESOURCE_TASK, TASK_ASSIGN, TASK_MANAGE};
use crate::error::ProjectsError;

/// Below this gap between neighboring fractional orders, precision is
/// considered exhausted and the stage is renormalized before the new
/// order is computed.
const MIN_ORDER_GAP: f64 = 1e-6;

pub struct TaskService {
    pool: DbPool,
    rbac: Arc<RbacEngine>,
}

impl TaskService {
    pub fn new(pool: DbPool, rbac: Arc<RbacEngine>) -> Self {
        Self { pool, rbac }
    }

    async fn require(&self, principal: &Principal, action: &str, project_id: ProjectId) -> Result<(), ProjectsError> {
        if self.rbac.authorize(principal, RESOURCE_TASK, action, Scope::Project(project_id)).await? {
            Ok(())
        } else {
            Err(ProjectsError::Forbidden)
        }
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        workflow_stage_id: uuid::Uuid,
        title: String,
        description: String,
        assignee: Option<SubjectId>,
        priority: Priority,
        estimated_hours: Option<f64>,
        feature: Option<String>,
        order: f64,
    ) -> Result<Task, ProjectsError> {
        self.require(principal, TASK_MANAGE, project_id).await?;
        let now = Timestamp::now();
        let task = Task {
            id: TaskId::new(),
            project_id,
            workflow_stage_id,
            sprint_id: None,
            title,
            description,
            assignee,
            priority,
            estimated_hours,
            feature,
            archived: false,
            order,
            created_at: now,
            updated_at: now,
        };
        put_task(&self.pool, &task).await?;
        Ok(task)
    }

    pub async fn get(&self, id: TaskId) -> Result<Task, ProjectsError> {
        Ok(get_task(&self.pool, id).await?)
    }

    /// Unscoped by RBAC action, same as `ProjectService::list`: listing is
    /// a read available to any authenticated member of the project, not
    /// gated by `task:manage`/`task:assign`.
    pub async fn list(&self, project_id: ProjectId) -> Result<Vec<Task>, ProjectsError> {
        Ok(list_tasks_for_project(&self.pool, project_id).await?)
    }

    pub async fn assign(
        &self,
        principal: &Principal,
        mut task: Task,
        assignee: Option<SubjectId>,
    ) -> Result<Task, ProjectsError> {
        self.require(principal, TASK_ASSIGN, task.project_id).await?;
        task.assignee = assignee;
        task.updated_at = Timestamp::now();
        put_task(&self.pool, &task).await?;
        Ok(task)
    }

    /// Moves `task_id` to `new_stage`, permitted only when `new_stage` is
    /// in the old stage's `allowed_transitions`; records `task_history`.
    pub async fn transition(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        task_id: TaskId,
        new_stage: uuid::Uuid,
    ) -> Result<(), ProjectsError> {
        self.require(principal, TASK_MANAGE, project_id).await?;
        transition_task_stage(&self.pool, task_id, new_stage).await?;
        Ok(())
    }

    /// Reorders `task_id` to the fractional midpoint between `before` and
    /// `after`'s orders. When the resulting gap on either side falls below
    /// [`MIN_ORDER_GAP`], the whole stage is renormalized to evenly spaced
    /// integers first and the midpoint is recomputed against the fresh
    /// values.
    pub async fn reorder(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        stage_id: uuid::Uuid,
        task_id: TaskId,
        before: Option<f64>,
        after: Option<f64>,
    ) -> Result<f64, ProjectsError> {
        self.require(principal, TASK_MANAGE, project_id).await?;

        let gap_exhausted = matches!((before, after), (Some(b), Some(a)) if (a - b).abs() < MIN_ORDER_GAP);
        if gap_exhausted {
            renormalize_stage_orders(&self.pool, project_id, stage_id).await?;
            let siblings = list_tasks_in_stage(&self.pool, project_id, stage_id).await?;
            let idx = siblings.iter().position(|t| t.id == task_id);
            let (before, after) = match idx {
                Some(i) => (
                    i.checked_sub(1).and_then(|j| siblings.get(j)).map(|t| t.order),
                    siblings.get(i + 1).map(|t| t.order),
                ),
                None => (before, after),
            };
            return Ok(reorder_task(&self.pool, task_id, before, after).await?);
        }

        Ok(reorder_task(&self.pool, task_id, before, after).await?)
    }
}
