//! RBAC action names this service checks against (spec §4.9's examples,
//! extended with the project/workflow actions the examples didn't name).

pub const PROJECT_MANAGE: &str = "project:manage";
pub const TASK_MANAGE: &str = "task:manage";
pub const TASK_ASSIGN: &str = "task:assign";
pub const SPRINT_MANAGE: &str = "sprint:manage";
pub const DOCUMENT_MANAGE: &str = "document:manage";
pub const KNOWLEDGE_READ: &str = "knowledge:read";
pub const KNOWLEDGE_LINK_MANAGE: &str = "knowledge_link:manage";
pub const REPORTS_READ: &str = "reports:read";

pub const RESOURCE_PROJECT: &str = "project";
pub const RESOURCE_TASK: &str = "task";
pub const RESOURCE_SPRINT: &str = "sprint";
pub const RESOURCE_DOCUMENT: &str = "document";
pub const RESOURCE_REPORT: &str = "report";
pub const RESOURCE_KNOWLEDGE_LINK: &str = "knowledge_link";
