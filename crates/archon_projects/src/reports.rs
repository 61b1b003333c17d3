//! Report generation (spec §4.10), served from a 5-minute in-process TTL
//! cache keyed by `(project_id, report_name)`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use archon_cache::TtlCache;
use archon_db::model::{Scope, Task};
use archon_db::projects::{get_project, get_workflow, list_sprints, list_tasks_for_project, task_history_for_sprint};
use archon_db::DbPool;
use archon_protocol::{ProjectId, SprintId, SubjectId, Timestamp};
use archon_rbac::{Principal, RbacEngine};
use serde::{Deserialize, Serialize};

use crate::actions::{REPORTS_READ, RESOURCE_REPORT};
use crate::error::ProjectsError;

const REPORT_CACHE_TTL: Duration = Duration::from_secs(300);
/// A non-archived, non-terminal task untouched for this long counts as
/// stale; untouched for four times as long, it counts as overdue. Neither
/// threshold is named in the data model (there is no due-date field), so
/// these are relative-age proxies rather than literal deadlines.
const STALE_THRESHOLD_DAYS: i64 = 7;
const OVERDUE_THRESHOLD_DAYS: i64 = 28;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectHealthReport {
    pub project_id: ProjectId,
    pub stale_task_ratio: f64,
    pub overdue_task_ratio: f64,
    pub velocity_trend: f64,
    pub composite_score: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BurndownPoint {
    pub at: Timestamp,
    pub remaining_tasks: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SprintReport {
    pub sprint_id: SprintId,
    pub burndown: Vec<BurndownPoint>,
    pub velocity: Option<f64>,
    /// Non-terminal tasks with `Critical` priority, stale beyond
    /// [`STALE_THRESHOLD_DAYS`] — there is no first-class "blocked" task
    /// state in the data model, so this is an approximation.
    pub blocked_task_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskMetricsReport {
    pub by_stage: HashMap<String, i64>,
    pub by_assignee: HashMap<String, i64>,
    pub by_priority: HashMap<String, i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberThroughput {
    pub subject_id: SubjectId,
    pub completed_task_count: i64,
    pub total_estimated_hours: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamPerformanceReport {
    pub per_member: Vec<MemberThroughput>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Report {
    Health(ProjectHealthReport),
    Sprint(SprintReport),
    TaskMetrics(TaskMetricsReport),
    TeamPerformance(TeamPerformanceReport),
}

pub struct ReportService {
    pool: DbPool,
    rbac: Arc<RbacEngine>,
    cache: TtlCache<(ProjectId, String), Report>,
}

impl ReportService {
    pub fn new(pool: DbPool, rbac: Arc<RbacEngine>) -> Self {
        Self { pool, rbac, cache: TtlCache::new(REPORT_CACHE_TTL) }
    }

    async fn require_read(&self, principal: &Principal, project_id: ProjectId) -> Result<(), ProjectsError> {
        if self.rbac.authorize(principal, RESOURCE_REPORT, REPORTS_READ, Scope::Project(project_id)).await? {
            Ok(())
        } else {
            Err(ProjectsError::Forbidden)
        }
    }

    pub async fn project_health(
        &self,
        principal: &Principal,
        project_id: ProjectId,
    ) -> Result<ProjectHealthReport, ProjectsError> {
        self.require_read(principal, project_id).await?;
        let key = (project_id, "health".to_string());
        if let Some(Report::Health(cached)) = self.cache.get(&key) {
            return Ok(cached);
        }

        let project = get_project(&self.pool, project_id).await?;
        let workflow = get_workflow(&self.pool, project.workflow_id).await?;
        let tasks = list_tasks_for_project(&self.pool, project_id).await?;
        let active: Vec<&Task> = tasks
            .iter()
            .filter(|t| !t.archived && !workflow.terminal_stages.contains(&t.workflow_stage_id))
            .collect();

        let now = Timestamp::now().as_datetime();
        let stale = active
            .iter()
            .filter(|t| (now - t.updated_at.as_datetime()).num_days() >= STALE_THRESHOLD_DAYS)
            .count();
        let overdue = active
            .iter()
            .filter(|t| (now - t.created_at.as_datetime()).num_days() >= OVERDUE_THRESHOLD_DAYS)
            .count();

        let denom = active.len().max(1) as f64;
        let stale_task_ratio = stale as f64 / denom;
        let overdue_task_ratio = overdue as f64 / denom;

        let sprints = list_sprints(&self.pool, project_id).await?;
        let mut completed_velocities: Vec<f64> = sprints
            .iter()
            .filter(|s| s.status == archon_db::model::SprintStatus::Completed)
            .filter_map(|s| s.velocity)
            .collect();
        let velocity_trend = match completed_velocities.len() {
            0 | 1 => 0.0,
            n => {
                let last = completed_velocities.remove(n - 1);
                let prev = completed_velocities.remove(n - 2);
                if prev == 0.0 { 0.0 } else { (last - prev) / prev }
            }
        };

        let composite_score = (1.0 - 0.5 * stale_task_ratio - 0.5 * overdue_task_ratio
            + 0.1 * velocity_trend.clamp(-1.0, 1.0))
        .clamp(0.0, 1.0);

        let report = ProjectHealthReport {
            project_id,
            stale_task_ratio,
            overdue_task_ratio,
            velocity_trend,
            composite_score,
        };
        self.cache.put(key, Report::Health(report.clone()));
        Ok(report)
    }

    pub async fn sprint_report(
        &self,
        principal: &Principal,
        project_id: ProjectId,
        sprint_id: SprintId,
    ) -> Result<SprintReport, ProjectsError> {
        self.require_read(principal, project_id).await?;
        let key = (project_id, format!("sprint:{sprint_id}"));
        if let Some(Report::Sprint(cached)) = self.cache.get(&key) {
            return Ok(cached);
        }

        let project = get_project(&self.pool, project_id).await?;
        let workflow = get_workflow(&self.pool, project.workflow_id).await?;
        let sprints = list_sprints(&self.pool, project_id).await?;
        let sprint = sprints
            .into_iter()
            .find(|s| s.id == sprint_id)
            .ok_or_else(|| ProjectsError::InvalidRequest(format!("sprint {sprint_id} not in project {project_id}")))?;

        let tasks = list_tasks_for_project(&self.pool, project_id).await?;
        let sprint_tasks: Vec<&Task> = tasks.iter().filter(|t| t.sprint_id == Some(sprint_id)).collect();
        let total = sprint_tasks.len() as i64;

        let history = task_history_for_sprint(&self.pool, sprint_id).await?;
        let mut remaining = total;
        let mut burndown = vec![BurndownPoint { at: Timestamp::now(), remaining_tasks: remaining }];
        for (_task_id, _old_stage, new_stage, changed_at) in history {
            if workflow.terminal_stages.contains(&new_stage) {
                remaining -= 1;
                burndown.push(BurndownPoint { at: changed_at, remaining_tasks: remaining });
            }
        }

        let now = Timestamp::now().as_datetime();
        let blocked_task_count = sprint_tasks
            .iter()
            .filter(|t| {
                !workflow.terminal_stages.contains(&t.workflow_stage_id)
                    && t.priority == archon_db::model::Priority::Critical
                    && (now - t.updated_at.as_datetime()).num_days() >= STALE_THRESHOLD_DAYS
            })
            .count() as i64;

        let report = SprintReport { sprint_id, burndown, velocity: sprint.velocity, blocked_task_count };
        self.cache.put(key, Report::Sprint(report.clone()));
        Ok(report)
    }

    pub async fn task_metrics(
        &self,
        principal: &Principal,
        project_id: ProjectId,
    ) -> Result<TaskMetricsReport, ProjectsError> {
        self.require_read(principal, project_id).await?;
        let key = (project_id, "task_metrics".to_string());
        if let Some(Report::TaskMetrics(cached)) = self.cache.get(&key) {
            return Ok(cached);
        }

        let tasks = list_tasks_for_project(&self.pool, project_id).await?;
        let mut by_stage: HashMap<String, i64> = HashMap::new();
        let mut by_assignee: HashMap<String, i64> = HashMap::new();
        let mut by_priority: HashMap<String, i64> = HashMap::new();
        for task in &tasks {
            *by_stage.entry(task.workflow_stage_id.to_string()).or_insert(0) += 1;
            let assignee_key = task.assignee.map(|s| s.to_string()).unwrap_or_else(|| "unassigned".to_string());
            *by_assignee.entry(assignee_key).or_insert(0) += 1;
            *by_priority.entry(format!("{:?}", task.priority)).or_insert(0) += 1;
        }

        let report = TaskMetricsReport { by_stage, by_assignee, by_priority };
        self.cache.put(key, Report::TaskMetrics(report.clone()));
        Ok(report)
    }

    pub async fn team_performance(
        &self,
        principal: &Principal,
        project_id: ProjectId,
    ) -> Result<TeamPerformanceReport, ProjectsError> {
        self.require_read(principal, project_id).await?;
        let key = (project_id, "team_performance".to_string());
        if let Some(Report::TeamPerformance(cached)) = self.cache.get(&key) {
            return Ok(cached);
        }

        let project = get_project(&self.pool, project_id).await?;
        let workflow = get_workflow(&self.pool, project.workflow_id).await?;
        let tasks = list_tasks_for_project(&self.pool, project_id).await?;

        let mut per_member: HashMap<SubjectId, MemberThroughput> = HashMap::new();
        for task in &tasks {
            let Some(assignee) = task.assignee else { continue };
            if !workflow.terminal_stages.contains(&task.workflow_stage_id) {
                continue;
            }
            let entry = per_member.entry(assignee).or_insert(MemberThroughput {
                subject_id: assignee,
                completed_task_count: 0,
                total_estimated_hours: 0.0,
            });
            entry.completed_task_count += 1;
            entry.total_estimated_hours += task.estimated_hours.unwrap_or(0.0);
        }

        let report = TeamPerformanceReport { per_member: per_member.into_values().collect() };
        self.cache.put(key, Report::TeamPerformance(report.clone()));
        Ok(report)
    }
}
