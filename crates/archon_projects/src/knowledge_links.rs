//! Knowledge-link service (spec §3/§4.11): associates a project, task, or
//! sprint with a page, code example, or source, scoped to the owning
//! project for RBAC purposes regardless of which entity kind the link
//! actually names.

use std::sync::Arc;

use archon_db::knowledge_links::{delete_knowledge_link, get_knowledge_link, list_knowledge_links_for_entity, put_knowledge_link};
use archon_db::model::{KnowledgeEntity, KnowledgeItem, KnowledgeLink, Scope};
use archon_db::projects::{get_sprint, get_task};
use archon_db::DbPool;
use archon_protocol::ProjectId;
use archon_rbac::{Principal, RbacEngine};

use crate::actions::{KNOWLEDGE_LINK_MANAGE, KNOWLEDGE_READ, RESOURCE_KNOWLEDGE_LINK};
use crate::error::ProjectsError;

pub struct KnowledgeLinkService {
    pool: DbPool,
    rbac: Arc<RbacEngine>,
}

impl KnowledgeLinkService {
    pub fn new(pool: DbPool, rbac: Arc<RbacEngine>) -> Self {
        Self { pool, rbac }
    }

    async fn project_scope(&self, entity: KnowledgeEntity) -> Result<ProjectId, ProjectsError> {
        match entity {
            KnowledgeEntity::Project(id) => Ok(id),
            KnowledgeEntity::Task(id) => Ok(get_task(&self.pool, id).await?.project_id),
            KnowledgeEntity::Sprint(id) => Ok(get_sprint(&self.pool, id).await?.project_id),
        }
    }

    async fn require_manage(&self, principal: &Principal, project_id: ProjectId) -> Result<(), ProjectsError> {
        if self.rbac.authorize(principal, RESOURCE_KNOWLEDGE_LINK, KNOWLEDGE_LINK_MANAGE, Scope::Project(project_id)).await? {
            Ok(())
        } else {
            Err(ProjectsError::Forbidden)
        }
    }

    async fn require_read(&self, principal: &Principal, project_id: ProjectId) -> Result<(), ProjectsError> {
        if self.rbac.authorize(principal, RESOURCE_KNOWLEDGE_LINK, KNOWLEDGE_READ, Scope::Project(project_id)).await? {
            Ok(())
        } else {
            Err(ProjectsError::Forbidden)
        }
    }

    pub async fn link(
        &self,
        principal: &Principal,
        entity: KnowledgeEntity,
        item: KnowledgeItem,
        relevance_score: Option<f64>,
    ) -> Result<KnowledgeLink, ProjectsError> {
        if let Some(score) = relevance_score {
            if !(0.0..=1.0).contains(&score) {
                return Err(ProjectsError::InvalidRequest("relevance_score must be in [0,1]".to_string()));
            }
        }
        let project_id = self.project_scope(entity).await?;
        self.require_manage(principal, project_id).await?;
        let link = KnowledgeLink { id: uuid::Uuid::new_v4(), entity, item, relevance_score };
        put_knowledge_link(&self.pool, &link).await?;
        Ok(link)
    }

    pub async fn list_for_entity(&self, principal: &Principal, entity: KnowledgeEntity) -> Result<Vec<KnowledgeLink>, ProjectsError> {
        let project_id = self.project_scope(entity).await?;
        self.require_read(principal, project_id).await?;
        Ok(list_knowledge_links_for_entity(&self.pool, entity).await?)
    }

    pub async fn unlink(&self, principal: &Principal, link_id: uuid::Uuid) -> Result<(), ProjectsError> {
        let link = get_knowledge_link(&self.pool, link_id).await?;
        let project_id = self.project_scope(link.entity).await?;
        self.require_manage(principal, project_id).await?;
        Ok(delete_knowledge_link(&self.pool, link_id).await?)
    }
}
