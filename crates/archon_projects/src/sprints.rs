//! Sprint lifecycle (spec §4.10): planned → active → completed | cancelled,
//! at most one active sprint per project, frozen velocity snapshot.

use std::sync::Arc;

use archon_db::model::{Scope, Sprint};
use archon_db::projects::{cancel_sprint, complete_sprint, get_sprint, list_sprints, put_sprint, start_sprint};
use archon_db::DbPool;
use archon_protocol::{ProjectId, SprintId};
use archon_rbac::{Principal, RbacEngine};

use crate::actions::{RESOURCE_SPRINT, SPRINT_MANAGE};
use crate::error::ProjectsError;

pub struct SprintService {
    pool: DbPool,
    rbac: Arc<RbacEngine>,
}

impl SprintService {
    pub fn new(pool: DbPool, rbac: Arc<RbacEngine>) -> Self {
        Self { pool, rbac }
    }

    async fn require(&self, principal: &Principal, project_id: ProjectId) -> Result<(), ProjectsError> {
        if self.rbac.authorize(principal, RESOURCE_SPRINT, SPRINT_MANAGE, Scope::Project(project_id)).await? {
            Ok(())
        } else {
            Err(ProjectsError::Forbidden)
        }
    }

    pub async fn create(&self, principal: &Principal, sprint: Sprint) -> Result<Sprint, ProjectsError> {
        self.require(principal, sprint.project_id).await?;
        put_sprint(&self.pool, &sprint).await?;
        Ok(sprint)
    }

    pub async fn get(&self, id: SprintId) -> Result<Sprint, ProjectsError> {
        Ok(get_sprint(&self.pool, id).await?)
    }

    pub async fn list(&self, project_id: ProjectId) -> Result<Vec<Sprint>, ProjectsError> {
        Ok(list_sprints(&self.pool, project_id).await?)
    }

    /// Rejects the start if another sprint in the project is already
    /// active (spec §4.10); the conflict surfaces from storage.
    pub async fn start(&self, principal: &Principal, project_id: ProjectId, sprint_id: SprintId) -> Result<(), ProjectsError> {
        self.require(principal, project_id).await?;
        start_sprint(&self.pool, sprint_id).await?;
        Ok(())
    }

    /// velocity = sum of `estimated_hours` for tasks that reached
    /// `done_stage`; freezes the sprint's task snapshot.
    pub async fn complete(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        sprint_id: SprintId,
        done_stage: uuid::Uuid,
    ) -> Result<f64, ProjectsError> {
        self.require(principal, project_id).await?;
        Ok(complete_sprint(&self.pool, sprint_id, done_stage).await?)
    }

    pub async fn cancel(&self, principal: &Principal, project_id: ProjectId, sprint_id: SprintId) -> Result<(), ProjectsError> {
        self.require(principal, project_id).await?;
        cancel_sprint(&self.pool, sprint_id).await?;
        Ok(())
    }
}
