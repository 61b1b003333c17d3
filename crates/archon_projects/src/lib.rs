//! Project/task/sprint/document management (spec §4.10-§4.11): the
//! part of the service that isn't retrieval or ingestion.

pub mod actions;
pub mod documents;
pub mod error;
pub mod knowledge_links;
pub mod projects;
pub mod reports;
pub mod sprints;
pub mod tasks;

pub use documents::DocumentService;
pub use error::ProjectsError;
pub use knowledge_links::KnowledgeLinkService;
pub use projects::ProjectService;
pub use reports::{
    BurndownPoint, MemberThroughput, ProjectHealthReport, Report, ReportService, SprintReport,
    TaskMetricsReport, TeamPerformanceReport,
};
pub use sprints::SprintService;
pub use tasks::TaskService;
