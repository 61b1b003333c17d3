//! Document service (spec §4.11): wraps the ingestion pipeline and the
//! source catalog with project scoping, privacy filtering, and promotion.

use std::sync::Arc;

use archon_db::model::{Scope, Source};
use archon_db::sources::{delete_source, get_source, list_sources, put_source, SourceFilter};
use archon_db::DbPool;
use archon_ingest::{CrawlRequest, Orchestrator, ProgressId, UploadRequest};
use archon_protocol::{ProjectId, SourceId, SubjectId, Timestamp};
use archon_rbac::{Principal, RbacEngine};

use crate::actions::{DOCUMENT_MANAGE, KNOWLEDGE_READ, RESOURCE_DOCUMENT};
use crate::error::ProjectsError;

pub struct DocumentService {
    pool: DbPool,
    rbac: Arc<RbacEngine>,
    orchestrator: Arc<Orchestrator>,
}

impl DocumentService {
    pub fn new(pool: DbPool, rbac: Arc<RbacEngine>, orchestrator: Arc<Orchestrator>) -> Self {
        Self { pool, rbac, orchestrator }
    }

    async fn require_manage(&self, principal: &Principal, project_id: ProjectId) -> Result<(), ProjectsError> {
        if self.rbac.authorize(principal, RESOURCE_DOCUMENT, DOCUMENT_MANAGE, Scope::Project(project_id)).await? {
            Ok(())
        } else {
            Err(ProjectsError::Forbidden)
        }
    }

    async fn require_read(&self, principal: &Principal, scope: Scope) -> Result<(), ProjectsError> {
        if self.rbac.authorize(principal, RESOURCE_DOCUMENT, KNOWLEDGE_READ, scope).await? {
            Ok(())
        } else {
            Err(ProjectsError::Forbidden)
        }
    }

    /// `request.project_id` is required; a global (non-project) crawl goes
    /// through the ingestion crate directly, not this service.
    pub async fn crawl(
        &self,
        principal: &Principal,
        request: CrawlRequest,
        subject: SubjectId,
    ) -> Result<ProgressId, ProjectsError> {
        let project_id = request
            .project_id
            .ok_or_else(|| ProjectsError::InvalidRequest("document crawl requires a project_id".to_string()))?;
        self.require_manage(principal, project_id).await?;
        Ok(self.orchestrator.start_crawl(request, subject)?)
    }

    pub async fn upload(
        &self,
        principal: &Principal,
        request: UploadRequest,
        file_bytes: Vec<u8>,
        subject: SubjectId,
    ) -> Result<ProgressId, ProjectsError> {
        let project_id = request
            .project_id
            .ok_or_else(|| ProjectsError::InvalidRequest("document upload requires a project_id".to_string()))?;
        self.require_manage(principal, project_id).await?;
        Ok(self.orchestrator.start_upload(request, file_bytes, subject)?)
    }

    pub async fn list(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        include_private: bool,
        limit: Option<i64>,
        offset: Option<i64>,
    ) -> Result<Vec<Source>, ProjectsError> {
        self.require_read(principal, Scope::Project(project_id)).await?;
        let filter = SourceFilter {
            project_id: Some(project_id),
            knowledge_type: None,
            include_private,
            limit,
            offset,
        };
        Ok(list_sources(&self.pool, filter).await?)
    }

    /// Flips `is_project_private` to `false`, stamping `promoted_at`/
    /// `promoted_by`. Rejects a source that is already globally visible
    /// (spec §3: a promoted source can't remain private, so re-promoting
    /// one that already isn't private is a no-op the caller should not
    /// rely on — we surface it as an error instead).
    pub async fn promote(
        &self,
        principal: &Principal,
        source_id: SourceId,
        promoted_by: SubjectId,
    ) -> Result<Source, ProjectsError> {
        let mut source = get_source(&self.pool, source_id).await?;
        let project_id = source
            .project_id
            .ok_or_else(|| ProjectsError::InvalidRequest("source has no project to promote from".to_string()))?;
        self.require_manage(principal, project_id).await?;
        if !source.is_project_private {
            return Err(ProjectsError::AlreadyGlobal(source_id));
        }
        source.is_project_private = false;
        source.promoted_at = Some(Timestamp::now());
        source.promoted_by = Some(promoted_by);
        source.updated_at = Timestamp::now();
        put_source(&self.pool, &source).await?;
        Ok(source)
    }

    pub async fn delete(&self, principal: &Principal, project_id: ProjectId, source_id: SourceId) -> Result<(), ProjectsError> {
        self.require_manage(principal, project_id).await?;
        let source = get_source(&self.pool, source_id).await?;
        if source.project_id != Some(project_id) {
            return Err(ProjectsError::InvalidRequest(format!(
                "source {source_id} does not belong to project {project_id}"
            )));
        }
        delete_source(&self.pool, source_id).await?;
        Ok(())
    }
}
