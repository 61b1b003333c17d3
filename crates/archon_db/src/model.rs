//! Entity types for §3 of the data model.

use std::collections::{BTreeSet, HashMap};

use archon_protocol::{
    EmbeddingId, InvitationId, PageId, PermissionGrantId, ProjectId, RequestId, SessionId,
    SourceId, SprintId, SubjectId, TaskId, Timestamp, WorkflowId,
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeType {
    Technical,
    Business,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Source {
    pub id: SourceId,
    pub display_name: String,
    pub origin: String,
    pub knowledge_type: KnowledgeType,
    pub tags: BTreeSet<String>,
    pub extract_code_examples: bool,
    pub project_id: Option<ProjectId>,
    pub is_project_private: bool,
    pub promoted_at: Option<Timestamp>,
    pub promoted_by: Option<SubjectId>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Source {
    /// Enforces the invariants from spec §3: a source with no project can't
    /// be private, and a promoted source can't remain private.
    pub fn validate(&self) -> Result<(), String> {
        if self.project_id.is_none() && self.is_project_private {
            return Err("source with no project_id cannot be is_project_private".to_string());
        }
        if self.promoted_at.is_some() && self.is_project_private {
            return Err("promoted source cannot remain is_project_private".to_string());
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    pub id: PageId,
    pub source_id: SourceId,
    pub url: String,
    pub chunk_number: i32,
    pub content: String,
    pub content_hash: String,
    pub metadata: HashMap<String, serde_json::Value>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Dimensions a configured embedding model may declare, per spec §3.
pub const VALID_DIMENSIONS: [i32; 6] = [384, 768, 1024, 1536, 3072, 3584];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Embedding {
    pub page_id: PageId,
    pub model: String,
    pub dimension: i32,
    pub vector: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodeExample {
    pub id: EmbeddingId,
    pub source_id: SourceId,
    pub language: Option<String>,
    pub content: String,
    pub summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProjectType {
    Software,
    Marketing,
    Research,
    BugTracking,
    Custom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub title: String,
    pub description: String,
    pub parent_id: Option<ProjectId>,
    pub workflow_id: WorkflowId,
    pub project_type: ProjectType,
    pub owner: SubjectId,
    pub archived: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Stage {
    pub id: uuid::Uuid,
    pub name: String,
    pub color: String,
    pub default_assignee: Option<SubjectId>,
    pub allowed_transitions: BTreeSet<uuid::Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub stages: Vec<Stage>,
    pub initial_stage: uuid::Uuid,
    pub terminal_stages: BTreeSet<uuid::Uuid>,
}

impl Workflow {
    pub fn stage(&self, id: uuid::Uuid) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    pub fn can_transition(&self, from: uuid::Uuid, to: uuid::Uuid) -> bool {
        self.stage(from)
            .map(|s| s.allowed_transitions.contains(&to))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub project_id: ProjectId,
    pub workflow_stage_id: uuid::Uuid,
    pub sprint_id: Option<SprintId>,
    pub title: String,
    pub description: String,
    pub assignee: Option<SubjectId>,
    pub priority: Priority,
    pub estimated_hours: Option<f64>,
    pub feature: Option<String>,
    pub archived: bool,
    pub order: f64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskHistory {
    pub id: uuid::Uuid,
    pub task_id: TaskId,
    pub old_stage_id: uuid::Uuid,
    pub new_stage_id: uuid::Uuid,
    pub changed_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SprintStatus {
    Planned,
    Active,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Sprint {
    pub id: SprintId,
    pub project_id: ProjectId,
    pub name: String,
    pub goal: String,
    pub start_date: chrono::NaiveDate,
    pub end_date: chrono::NaiveDate,
    pub status: SprintStatus,
    pub velocity: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Active,
    Disconnected,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserContext {
    pub user_id: Option<SubjectId>,
    pub email: Option<String>,
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub client_type: String,
    pub client_version: Option<String>,
    pub connected_at: Timestamp,
    pub last_activity_at: Timestamp,
    pub status: SessionStatus,
    pub disconnect_reason: Option<String>,
    pub disconnected_at: Option<Timestamp>,
    pub reconnect_token_hash: Option<String>,
    pub reconnect_expires_at: Option<Timestamp>,
    pub reconnect_count: i32,
    pub user_context: Option<UserContext>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Success,
    Error,
    Timeout,
}

/// Per-subject aggregation backing `archon_mcp_user_stats` (spec §4.8).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserStats {
    pub subject_id: SubjectId,
    pub session_count: i64,
    pub request_count: i64,
    pub total_tokens: i64,
    pub total_cost: f64,
    pub first_activity_at: Option<Timestamp>,
    pub last_activity_at: Option<Timestamp>,
}

/// Fleet-wide session health snapshot (spec §4.8): status breakdown, age
/// buckets, and 24-hour connection statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionHealth {
    pub active_count: i64,
    pub disconnected_count: i64,
    pub healthy_count: i64,
    pub aging_count: i64,
    pub stale_count: i64,
    pub sessions_last_24h: i64,
    pub disconnects_last_24h: i64,
    pub avg_duration_secs: Option<f64>,
}

impl SessionHealth {
    pub fn disconnect_rate_24h(&self) -> f64 {
        if self.sessions_last_24h == 0 {
            0.0
        } else {
            self.disconnects_last_24h as f64 / self.sessions_last_24h as f64
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
    pub id: RequestId,
    pub session_id: SessionId,
    pub method: String,
    pub tool_name: Option<String>,
    pub status: RequestStatus,
    pub duration_ms: i64,
    pub prompt_tokens: i64,
    pub completion_tokens: i64,
    pub total_tokens: i64,
    pub estimated_cost: f64,
    pub error_message: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Member,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub email: Option<String>,
    pub role: Role,
    pub active: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Scope {
    Global,
    Project(ProjectId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PermissionGrant {
    pub id: PermissionGrantId,
    pub subject_or_role: String,
    pub resource_type: String,
    pub action: String,
    pub scope: Scope,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeEntity {
    Project(ProjectId),
    Task(TaskId),
    Sprint(SprintId),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeItem {
    Page(PageId),
    CodeExample(EmbeddingId),
    Source(SourceId),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeLink {
    pub id: uuid::Uuid,
    pub entity: KnowledgeEntity,
    pub item: KnowledgeItem,
    pub relevance_score: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Expired,
    Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: InvitationId,
    pub org_id: String,
    pub email: String,
    pub role: Role,
    pub token_hash: String,
    pub status: InvitationStatus,
    pub expires_at: Timestamp,
}
