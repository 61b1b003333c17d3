//! Shared application state handed to every handler (mirrors at-bridge's
//! `ApiState`, adapted to Archon's service set).

use std::sync::Arc;

use archon_ingest::Orchestrator;
use archon_projects::{DocumentService, KnowledgeLinkService, ProjectService, ReportService, SprintService, TaskService};
use archon_rbac::RbacEngine;
use archon_retrieval::RetrievalEngine;
use archon_sessions::SessionManager;

#[derive(Clone)]
pub struct ApiState {
    pub projects: Arc<ProjectService>,
    pub tasks: Arc<TaskService>,
    pub sprints: Arc<SprintService>,
    pub reports: Arc<ReportService>,
    pub documents: Arc<DocumentService>,
    pub knowledge_links: Arc<KnowledgeLinkService>,
    pub retrieval: Arc<RetrievalEngine>,
    pub sessions: Arc<SessionManager>,
    pub rbac: Arc<RbacEngine>,
    pub orchestrator: Arc<Orchestrator>,
    pub pool: archon_db::DbPool,
    /// Shared with `AuthLayer`; `None` means dev mode (no tokens issued,
    /// `POST /api/auth/login` fails with `unauthenticated`).
    pub jwt_secret: Option<Arc<String>>,
}
