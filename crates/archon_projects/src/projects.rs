//! Project tree operations (spec §4.10): cycle rejection, archive cascade,
//! workflow reassignment.

use std::collections::HashMap;
use std::sync::Arc;

use archon_db::model::{Project, ProjectType, Workflow};
use archon_db::projects::{
    archive_project, get_project, get_workflow as db_get_workflow, list_projects, put_project,
    put_workflow as db_put_workflow, reassign_workflow, set_parent, unarchive_project,
};
use archon_db::DbPool;
use archon_protocol::{ProjectId, SubjectId, Timestamp, WorkflowId};
use archon_rbac::{Principal, RbacEngine};

use crate::actions::{PROJECT_MANAGE, RESOURCE_PROJECT};
use crate::error::ProjectsError;

pub struct ProjectService {
    pool: DbPool,
    rbac: Arc<RbacEngine>,
}

impl ProjectService {
    pub fn new(pool: DbPool, rbac: Arc<RbacEngine>) -> Self {
        Self { pool, rbac }
    }

    async fn require_manage(&self, principal: &Principal, scope: archon_db::model::Scope) -> Result<(), ProjectsError> {
        if self.rbac.authorize(principal, RESOURCE_PROJECT, PROJECT_MANAGE, scope).await? {
            Ok(())
        } else {
            Err(ProjectsError::Forbidden)
        }
    }

    pub async fn create(
        &self,
        principal: &Principal,
        owner: SubjectId,
        title: String,
        description: String,
        parent_id: Option<ProjectId>,
        workflow_id: WorkflowId,
        project_type: ProjectType,
    ) -> Result<Project, ProjectsError> {
        self.require_manage(principal, archon_db::model::Scope::Global).await?;
        let now = Timestamp::now();
        let project = Project {
            id: ProjectId::new(),
            title,
            description,
            parent_id,
            workflow_id,
            project_type,
            owner,
            archived: false,
            created_at: now,
            updated_at: now,
        };
        if let Some(parent) = parent_id {
            set_parent(&self.pool, project.id, Some(parent)).await?;
        }
        put_project(&self.pool, &project).await?;
        Ok(project)
    }

    pub async fn get(&self, id: ProjectId) -> Result<Project, ProjectsError> {
        Ok(get_project(&self.pool, id).await?)
    }

    pub async fn list(
        &self,
        parent_id: Option<ProjectId>,
        include_archived: bool,
    ) -> Result<Vec<Project>, ProjectsError> {
        Ok(list_projects(&self.pool, parent_id, include_archived).await?)
    }

    /// Rejects a parent change that would place `project_id` in its own
    /// subtree; enforced inside `archon_db::projects::set_parent`.
    pub async fn reparent(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        new_parent: Option<ProjectId>,
    ) -> Result<(), ProjectsError> {
        self.require_manage(principal, archon_db::model::Scope::Project(project_id)).await?;
        set_parent(&self.pool, project_id, new_parent).await?;
        Ok(())
    }

    /// Idempotent; recursively archives descendants and their tasks.
    pub async fn archive(&self, principal: &Principal, project_id: ProjectId) -> Result<(), ProjectsError> {
        self.require_manage(principal, archon_db::model::Scope::Project(project_id)).await?;
        archive_project(&self.pool, project_id).await?;
        Ok(())
    }

    /// Single-level unarchive: never reaches into descendants.
    pub async fn unarchive(&self, principal: &Principal, project_id: ProjectId) -> Result<(), ProjectsError> {
        self.require_manage(principal, archon_db::model::Scope::Project(project_id)).await?;
        unarchive_project(&self.pool, project_id).await?;
        Ok(())
    }

    pub async fn get_workflow(&self, workflow_id: WorkflowId) -> Result<Workflow, ProjectsError> {
        Ok(db_get_workflow(&self.pool, workflow_id).await?)
    }

    pub async fn put_workflow(&self, principal: &Principal, workflow: &Workflow) -> Result<(), ProjectsError> {
        self.require_manage(principal, archon_db::model::Scope::Global).await?;
        db_put_workflow(&self.pool, workflow).await?;
        Ok(())
    }

    /// Changes `project_id`'s workflow, mapping each existing task's
    /// current stage to a target stage in `stage_mapping`, transactionally
    /// (spec §4.10). `stage_mapping` must cover every stage currently in
    /// use by the project's tasks or the reassignment is rejected.
    pub async fn reassign_workflow(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        new_workflow_id: WorkflowId,
        stage_mapping: HashMap<uuid::Uuid, uuid::Uuid>,
    ) -> Result<(), ProjectsError> {
        self.require_manage(principal, archon_db::model::Scope::Project(project_id)).await?;
        reassign_workflow(&self.pool, project_id, new_workflow_id, &stage_mapping).await?;
        Ok(())
    }
}
