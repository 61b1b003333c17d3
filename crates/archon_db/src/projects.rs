//! Project/workflow/task/sprint storage (§4.1, backing C10).
//!
//! Cross-entity invariants — a task's stage belongs to its project's
//! workflow, at most one active sprint per project — are enforced here,
//! inside a single transaction, rather than left to the caller.

use std::collections::HashMap;

use archon_protocol::{ProjectId, SprintId, TaskId, Timestamp, WorkflowId};
use sqlx::Row;

use crate::error::{from_sqlx, BackendError, BackendResult};
use crate::model::{Priority, Project, ProjectType, Sprint, SprintStatus, Stage, Task, Workflow};
use crate::pool::DbPool;

pub async fn put_project(pool: &DbPool, project: &Project) -> BackendResult<()> {
    sqlx::query(
        "insert into projects (id, title, description, parent_id, workflow_id, project_type, \
         owner, archived, created_at, updated_at) values ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10) \
         on conflict (id) do update set title = excluded.title, description = excluded.description, \
           parent_id = excluded.parent_id, workflow_id = excluded.workflow_id, \
           project_type = excluded.project_type, archived = excluded.archived, \
           updated_at = excluded.updated_at",
    )
    .bind(project.id.as_uuid())
    .bind(&project.title)
    .bind(&project.description)
    .bind(project.parent_id.map(|p| p.as_uuid()))
    .bind(project.workflow_id.as_uuid())
    .bind(project_type_str(project.project_type))
    .bind(project.owner.as_uuid())
    .bind(project.archived)
    .bind(project.created_at.as_datetime())
    .bind(project.updated_at.as_datetime())
    .execute(pool)
    .await
    .map_err(|e| from_sqlx(e, "put_project"))?;
    Ok(())
}

pub async fn list_projects(
    pool: &DbPool,
    parent_id: Option<ProjectId>,
    include_archived: bool,
) -> BackendResult<Vec<Project>> {
    let rows = sqlx::query(
        "select id, title, description, parent_id, workflow_id, project_type, owner, archived, \
         created_at, updated_at from projects \
         where parent_id is not distinct from $1 and ($2 or not archived) \
         order by created_at",
    )
    .bind(parent_id.map(|p| p.as_uuid()))
    .bind(include_archived)
    .fetch_all(pool)
    .await
    .map_err(|e| from_sqlx(e, "list_projects"))?;
    rows.iter().map(row_to_project).collect()
}

pub async fn put_workflow(pool: &DbPool, workflow: &Workflow) -> BackendResult<()> {
    let stages_json = serde_json::to_value(&workflow.stages)
        .map_err(|e| BackendError::InvalidInput(format!("invalid stages: {e}")))?;
    let terminal_json = serde_json::to_value(&workflow.terminal_stages)
        .map_err(|e| BackendError::InvalidInput(format!("invalid terminal_stages: {e}")))?;
    sqlx::query(
        "insert into workflows (id, name, stages, initial_stage, terminal_stages) \
         values ($1,$2,$3,$4,$5) \
         on conflict (id) do update set name = excluded.name, stages = excluded.stages, \
           initial_stage = excluded.initial_stage, terminal_stages = excluded.terminal_stages",
    )
    .bind(workflow.id.as_uuid())
    .bind(&workflow.name)
    .bind(stages_json)
    .bind(workflow.initial_stage)
    .bind(terminal_json)
    .execute(pool)
    .await
    .map_err(|e| from_sqlx(e, "put_workflow"))?;
    Ok(())
}

pub async fn get_workflow(pool: &DbPool, id: WorkflowId) -> BackendResult<Workflow> {
    let row = sqlx::query(
        "select id, name, stages, initial_stage, terminal_stages from workflows where id = $1",
    )
    .bind(id.as_uuid())
    .fetch_one(pool)
    .await
    .map_err(|e| from_sqlx(e, &format!("get_workflow {id}")))?;

    let stages_json: serde_json::Value = row.try_get("stages").unwrap();
    let stages: Vec<Stage> = serde_json::from_value(stages_json)
        .map_err(|e| BackendError::InvalidInput(format!("corrupt stages column: {e}")))?;
    let terminal_json: serde_json::Value = row.try_get("terminal_stages").unwrap();
    let terminal: Vec<uuid::Uuid> = serde_json::from_value(terminal_json)
        .map_err(|e| BackendError::InvalidInput(format!("corrupt terminal_stages column: {e}")))?;

    Ok(Workflow {
        id: WorkflowId(row.try_get("id").unwrap()),
        name: row.try_get("name").unwrap(),
        stages,
        initial_stage: row.try_get("initial_stage").unwrap(),
        terminal_stages: terminal.into_iter().collect(),
    })
}

/// Reassigns `project_id` to `new_workflow_id`, mapping each existing
/// task's current stage through `stage_mapping` and recording a
/// `task_history` row per task (spec §4.10). Transactional: either every
/// task moves or none does.
pub async fn reassign_workflow(
    pool: &DbPool,
    project_id: ProjectId,
    new_workflow_id: WorkflowId,
    stage_mapping: &HashMap<uuid::Uuid, uuid::Uuid>,
) -> BackendResult<()> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| from_sqlx(e, "reassign_workflow: begin"))?;

    let rows = sqlx::query("select id, workflow_stage_id from tasks where project_id = $1")
        .bind(project_id.as_uuid())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| from_sqlx(e, "reassign_workflow: load tasks"))?;

    for row in &rows {
        let task_id: uuid::Uuid = row.try_get("id").unwrap();
        let old_stage: uuid::Uuid = row.try_get("workflow_stage_id").unwrap();
        let new_stage = *stage_mapping.get(&old_stage).ok_or_else(|| {
            BackendError::InvalidInput(format!("no stage mapping provided for stage {old_stage}"))
        })?;

        sqlx::query("update tasks set workflow_stage_id = $1, updated_at = now() where id = $2")
            .bind(new_stage)
            .bind(task_id)
            .execute(&mut *tx)
            .await
            .map_err(|e| from_sqlx(e, "reassign_workflow: update task"))?;

        sqlx::query(
            "insert into task_history (id, task_id, old_stage_id, new_stage_id) values ($1,$2,$3,$4)",
        )
        .bind(uuid::Uuid::new_v4())
        .bind(task_id)
        .bind(old_stage)
        .bind(new_stage)
        .execute(&mut *tx)
        .await
        .map_err(|e| from_sqlx(e, "reassign_workflow: history"))?;
    }

    sqlx::query("update projects set workflow_id = $1, updated_at = now() where id = $2")
        .bind(new_workflow_id.as_uuid())
        .bind(project_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| from_sqlx(e, "reassign_workflow: update project"))?;

    tx.commit()
        .await
        .map_err(|e| from_sqlx(e, "reassign_workflow: commit"))?;
    Ok(())
}

pub async fn get_task(pool: &DbPool, id: TaskId) -> BackendResult<Task> {
    let row = sqlx::query(
        "select id, project_id, workflow_stage_id, sprint_id, title, description, assignee, \
         priority, estimated_hours, feature, archived, \"order\", created_at, updated_at \
         from tasks where id = $1",
    )
    .bind(id.as_uuid())
    .fetch_one(pool)
    .await
    .map_err(|e| from_sqlx(e, &format!("get_task {id}")))?;
    row_to_task(&row)
}

/// Tasks within one project+stage, ordered by `order` ascending — the
/// neighbor set `reorder_task`'s midpoint calculation operates over.
pub async fn list_tasks_in_stage(
    pool: &DbPool,
    project_id: ProjectId,
    stage_id: uuid::Uuid,
) -> BackendResult<Vec<Task>> {
    let rows = sqlx::query(
        "select id, project_id, workflow_stage_id, sprint_id, title, description, assignee, \
         priority, estimated_hours, feature, archived, \"order\", created_at, updated_at \
         from tasks where project_id = $1 and workflow_stage_id = $2 and not archived \
         order by \"order\" asc",
    )
    .bind(project_id.as_uuid())
    .bind(stage_id)
    .fetch_all(pool)
    .await
    .map_err(|e| from_sqlx(e, "list_tasks_in_stage"))?;
    rows.iter().map(row_to_task).collect()
}

/// Reassigns dense, evenly spaced `order` values (multiples of 1024) across
/// `list_tasks_in_stage`'s result — the opportunistic renormalization spec
/// §4.10 calls for once fractional reordering exhausts precision.
pub async fn renormalize_stage_orders(
    pool: &DbPool,
    project_id: ProjectId,
    stage_id: uuid::Uuid,
) -> BackendResult<()> {
    let tasks = list_tasks_in_stage(pool, project_id, stage_id).await?;
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| from_sqlx(e, "renormalize_stage_orders: begin"))?;
    for (i, task) in tasks.iter().enumerate() {
        sqlx::query("update tasks set \"order\" = $1 where id = $2")
            .bind((i as f64 + 1.0) * 1024.0)
            .bind(task.id.as_uuid())
            .execute(&mut *tx)
            .await
            .map_err(|e| from_sqlx(e, "renormalize_stage_orders: update"))?;
    }
    tx.commit()
        .await
        .map_err(|e| from_sqlx(e, "renormalize_stage_orders: commit"))?;
    Ok(())
}

pub async fn get_sprint(pool: &DbPool, id: SprintId) -> BackendResult<Sprint> {
    let row = sqlx::query(
        "select id, project_id, name, goal, start_date, end_date, status, velocity \
         from sprints where id = $1",
    )
    .bind(id.as_uuid())
    .fetch_one(pool)
    .await
    .map_err(|e| from_sqlx(e, &format!("get_sprint {id}")))?;
    row_to_sprint(&row)
}

pub async fn list_sprints(pool: &DbPool, project_id: ProjectId) -> BackendResult<Vec<Sprint>> {
    let rows = sqlx::query(
        "select id, project_id, name, goal, start_date, end_date, status, velocity \
         from sprints where project_id = $1 order by start_date",
    )
    .bind(project_id.as_uuid())
    .fetch_all(pool)
    .await
    .map_err(|e| from_sqlx(e, "list_sprints"))?;
    rows.iter().map(row_to_sprint).collect()
}

pub async fn task_history_for_sprint(
    pool: &DbPool,
    sprint_id: SprintId,
) -> BackendResult<Vec<(TaskId, uuid::Uuid, uuid::Uuid, Timestamp)>> {
    let rows = sqlx::query(
        "select th.task_id, th.old_stage_id, th.new_stage_id, th.changed_at from task_history th \
         join tasks t on t.id = th.task_id where t.sprint_id = $1 order by th.changed_at",
    )
    .bind(sprint_id.as_uuid())
    .fetch_all(pool)
    .await
    .map_err(|e| from_sqlx(e, "task_history_for_sprint"))?;
    Ok(rows
        .iter()
        .map(|r| {
            (
                TaskId(r.try_get("task_id").unwrap()),
                r.try_get("old_stage_id").unwrap(),
                r.try_get("new_stage_id").unwrap(),
                Timestamp::from_datetime(r.try_get("changed_at").unwrap()),
            )
        })
        .collect())
}

pub async fn list_tasks_for_project(pool: &DbPool, project_id: ProjectId) -> BackendResult<Vec<Task>> {
    let rows = sqlx::query(
        "select id, project_id, workflow_stage_id, sprint_id, title, description, assignee, \
         priority, estimated_hours, feature, archived, \"order\", created_at, updated_at \
         from tasks where project_id = $1",
    )
    .bind(project_id.as_uuid())
    .fetch_all(pool)
    .await
    .map_err(|e| from_sqlx(e, "list_tasks_for_project"))?;
    rows.iter().map(row_to_task).collect()
}

fn project_type_str(t: ProjectType) -> &'static str {
    match t {
        ProjectType::Software => "software",
        ProjectType::Marketing => "marketing",
        ProjectType::Research => "research",
        ProjectType::BugTracking => "bug-tracking",
        ProjectType::Custom => "custom",
    }
}

fn priority_from_str(s: &str) -> Priority {
    match s {
        "low" => Priority::Low,
        "high" => Priority::High,
        "critical" => Priority::Critical,
        _ => Priority::Medium,
    }
}

fn row_to_task(row: &sqlx::postgres::PgRow) -> BackendResult<Task> {
    Ok(Task {
        id: TaskId(row.try_get("id").unwrap()),
        project_id: ProjectId(row.try_get("project_id").unwrap()),
        workflow_stage_id: row.try_get("workflow_stage_id").unwrap(),
        sprint_id: row
            .try_get::<Option<uuid::Uuid>, _>("sprint_id")
            .unwrap()
            .map(Into::into),
        title: row.try_get("title").unwrap(),
        description: row.try_get("description").unwrap(),
        assignee: row
            .try_get::<Option<uuid::Uuid>, _>("assignee")
            .unwrap()
            .map(Into::into),
        priority: priority_from_str(&row.try_get::<String, _>("priority").unwrap()),
        estimated_hours: row.try_get("estimated_hours").unwrap(),
        feature: row.try_get("feature").unwrap(),
        archived: row.try_get("archived").unwrap(),
        order: row.try_get("order").unwrap(),
        created_at: Timestamp::from_datetime(row.try_get("created_at").unwrap()),
        updated_at: Timestamp::from_datetime(row.try_get("updated_at").unwrap()),
    })
}

fn row_to_sprint(row: &sqlx::postgres::PgRow) -> BackendResult<Sprint> {
    let status_raw: String = row.try_get("status").unwrap();
    let status = match status_raw.as_str() {
        "planned" => SprintStatus::Planned,
        "active" => SprintStatus::Active,
        "cancelled" => SprintStatus::Cancelled,
        _ => SprintStatus::Completed,
    };
    Ok(Sprint {
        id: SprintId(row.try_get("id").unwrap()),
        project_id: ProjectId(row.try_get("project_id").unwrap()),
        name: row.try_get("name").unwrap(),
        goal: row.try_get("goal").unwrap(),
        start_date: row.try_get("start_date").unwrap(),
        end_date: row.try_get("end_date").unwrap(),
        status,
        velocity: row.try_get("velocity").unwrap(),
    })
}

pub async fn get_project(pool: &DbPool, id: ProjectId) -> BackendResult<Project> {
    let row = sqlx::query(
        "select id, title, description, parent_id, workflow_id, project_type, owner, archived, \
         created_at, updated_at from projects where id = $1",
    )
    .bind(id.as_uuid())
    .fetch_one(pool)
    .await
    .map_err(|e| from_sqlx(e, &format!("get_project {id}")))?;
    row_to_project(&row)
}

/// Rejects a parent assignment that would place `project_id` inside its
/// own subtree (spec §4.10's no-cycle invariant).
pub async fn set_parent(
    pool: &DbPool,
    project_id: ProjectId,
    new_parent: Option<ProjectId>,
) -> BackendResult<()> {
    if let Some(parent) = new_parent {
        if parent == project_id {
            return Err(BackendError::Conflict(
                "a project cannot be its own parent".to_string(),
            ));
        }
        let mut cursor = Some(parent);
        while let Some(current) = cursor {
            if current == project_id {
                return Err(BackendError::Conflict(
                    "parent change would create a cycle".to_string(),
                ));
            }
            let row = sqlx::query("select parent_id from projects where id = $1")
                .bind(current.as_uuid())
                .fetch_optional(pool)
                .await
                .map_err(|e| from_sqlx(e, "set_parent: walk ancestry"))?;
            cursor = row
                .and_then(|r| r.try_get::<Option<uuid::Uuid>, _>("parent_id").ok().flatten())
                .map(Into::into);
        }
    }

    sqlx::query("update projects set parent_id = $1, updated_at = now() where id = $2")
        .bind(new_parent.map(|p| p.as_uuid()))
        .bind(project_id.as_uuid())
        .execute(pool)
        .await
        .map_err(|e| from_sqlx(e, "set_parent: update"))?;
    Ok(())
}

/// Idempotent; recursively archives descendants and their tasks, not
/// sources/pages (spec §3 invariant).
pub async fn archive_project(pool: &DbPool, id: ProjectId) -> BackendResult<()> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| from_sqlx(e, "archive_project: begin"))?;

    let mut frontier = vec![id.as_uuid()];
    while let Some(current) = frontier.pop() {
        sqlx::query("update projects set archived = true, updated_at = now() where id = $1")
            .bind(current)
            .execute(&mut *tx)
            .await
            .map_err(|e| from_sqlx(e, "archive_project: archive project"))?;
        sqlx::query("update tasks set archived = true, updated_at = now() where project_id = $1")
            .bind(current)
            .execute(&mut *tx)
            .await
            .map_err(|e| from_sqlx(e, "archive_project: archive tasks"))?;

        let children = sqlx::query("select id from projects where parent_id = $1")
            .bind(current)
            .fetch_all(&mut *tx)
            .await
            .map_err(|e| from_sqlx(e, "archive_project: list children"))?;
        frontier.extend(
            children
                .iter()
                .map(|r| r.try_get::<uuid::Uuid, _>("id").unwrap()),
        );
    }

    tx.commit()
        .await
        .map_err(|e| from_sqlx(e, "archive_project: commit"))?;
    Ok(())
}

/// Single-level unarchive: only `id` itself, never its descendants.
pub async fn unarchive_project(pool: &DbPool, id: ProjectId) -> BackendResult<()> {
    sqlx::query("update projects set archived = false, updated_at = now() where id = $1")
        .bind(id.as_uuid())
        .execute(pool)
        .await
        .map_err(|e| from_sqlx(e, "unarchive_project"))?;
    Ok(())
}

pub async fn put_task(pool: &DbPool, task: &Task) -> BackendResult<()> {
    let stage_in_workflow: bool = sqlx::query(
        "select true from projects p, jsonb_array_elements(\
            (select stages from workflows w where w.id = p.workflow_id)\
         ) stage where p.id = $1 and (stage->>'id')::uuid = $2",
    )
    .bind(task.project_id.as_uuid())
    .bind(task.workflow_stage_id)
    .fetch_optional(pool)
    .await
    .map_err(|e| from_sqlx(e, "put_task: validate stage"))?
    .is_some();

    if !stage_in_workflow {
        return Err(BackendError::InvalidInput(
            "workflow_stage_id does not belong to the project's workflow".to_string(),
        ));
    }

    sqlx::query(
        "insert into tasks (id, project_id, workflow_stage_id, sprint_id, title, description, \
         assignee, priority, estimated_hours, feature, archived, \"order\", created_at, updated_at) \
         values ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14) \
         on conflict (id) do update set \
           workflow_stage_id = excluded.workflow_stage_id, sprint_id = excluded.sprint_id, \
           title = excluded.title, description = excluded.description, \
           assignee = excluded.assignee, priority = excluded.priority, \
           estimated_hours = excluded.estimated_hours, feature = excluded.feature, \
           archived = excluded.archived, \"order\" = excluded.\"order\", updated_at = excluded.updated_at",
    )
    .bind(task.id.as_uuid())
    .bind(task.project_id.as_uuid())
    .bind(task.workflow_stage_id)
    .bind(task.sprint_id.map(|s| s.as_uuid()))
    .bind(&task.title)
    .bind(&task.description)
    .bind(task.assignee.map(|s| s.as_uuid()))
    .bind(priority_str(task.priority))
    .bind(task.estimated_hours)
    .bind(&task.feature)
    .bind(task.archived)
    .bind(task.order)
    .bind(task.created_at.as_datetime())
    .bind(task.updated_at.as_datetime())
    .execute(pool)
    .await
    .map_err(|e| from_sqlx(e, "put_task"))?;
    Ok(())
}

/// Moves `task_id` to `new_stage`, validated against the workflow's
/// `allowed_transitions`, and records a `task_history` row (spec §4.10).
pub async fn transition_task_stage(
    pool: &DbPool,
    task_id: TaskId,
    new_stage: uuid::Uuid,
) -> BackendResult<()> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| from_sqlx(e, "transition_task_stage: begin"))?;

    let row = sqlx::query(
        "select t.workflow_stage_id as old_stage, w.stages as stages \
         from tasks t join projects p on p.id = t.project_id \
         join workflows w on w.id = p.workflow_id where t.id = $1",
    )
    .bind(task_id.as_uuid())
    .fetch_one(&mut *tx)
    .await
    .map_err(|e| from_sqlx(e, "transition_task_stage: load"))?;

    let old_stage: uuid::Uuid = row.try_get("old_stage").unwrap();
    let stages_json: serde_json::Value = row.try_get("stages").unwrap();
    let allowed = stages_json
        .as_array()
        .and_then(|stages| {
            stages.iter().find(|s| {
                s.get("id").and_then(|v| v.as_str()) == Some(&old_stage.to_string())
            })
        })
        .and_then(|stage| stage.get("allowed_transitions"))
        .and_then(|v| v.as_array())
        .map(|transitions| {
            transitions
                .iter()
                .any(|t| t.as_str() == Some(&new_stage.to_string()))
        })
        .unwrap_or(false);

    if !allowed {
        return Err(BackendError::Conflict(format!(
            "transition from {old_stage} to {new_stage} is not allowed"
        )));
    }

    sqlx::query("update tasks set workflow_stage_id = $1, updated_at = now() where id = $2")
        .bind(new_stage)
        .bind(task_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| from_sqlx(e, "transition_task_stage: update"))?;

    sqlx::query(
        "insert into task_history (id, task_id, old_stage_id, new_stage_id) values ($1,$2,$3,$4)",
    )
    .bind(uuid::Uuid::new_v4())
    .bind(task_id.as_uuid())
    .bind(old_stage)
    .bind(new_stage)
    .execute(&mut *tx)
    .await
    .map_err(|e| from_sqlx(e, "transition_task_stage: history"))?;

    tx.commit()
        .await
        .map_err(|e| from_sqlx(e, "transition_task_stage: commit"))?;
    Ok(())
}

/// Reorders a task to the fractional midpoint between its two neighbors.
/// Callers periodically renormalize whole stages when fractions run out
/// of precision (spec §4.10); that renormalization is a separate, rarer
/// maintenance operation not exercised on every reorder.
pub async fn reorder_task(
    pool: &DbPool,
    task_id: TaskId,
    before: Option<f64>,
    after: Option<f64>,
) -> BackendResult<f64> {
    let new_order = match (before, after) {
        (Some(b), Some(a)) => (b + a) / 2.0,
        (Some(b), None) => b - 1.0,
        (None, Some(a)) => a + 1.0,
        (None, None) => 0.0,
    };
    sqlx::query("update tasks set \"order\" = $1, updated_at = now() where id = $2")
        .bind(new_order)
        .bind(task_id.as_uuid())
        .execute(pool)
        .await
        .map_err(|e| from_sqlx(e, "reorder_task"))?;
    Ok(new_order)
}

pub async fn put_sprint(pool: &DbPool, sprint: &Sprint) -> BackendResult<()> {
    sqlx::query(
        "insert into sprints (id, project_id, name, goal, start_date, end_date, status, velocity) \
         values ($1,$2,$3,$4,$5,$6,$7,$8) \
         on conflict (id) do update set name = excluded.name, goal = excluded.goal, \
           start_date = excluded.start_date, end_date = excluded.end_date, \
           status = excluded.status, velocity = excluded.velocity",
    )
    .bind(sprint.id.as_uuid())
    .bind(sprint.project_id.as_uuid())
    .bind(&sprint.name)
    .bind(&sprint.goal)
    .bind(sprint.start_date)
    .bind(sprint.end_date)
    .bind(sprint_status_str(sprint.status))
    .bind(sprint.velocity)
    .execute(pool)
    .await
    .map_err(|e| from_sqlx(e, "put_sprint"))?;
    Ok(())
}

/// Starts `sprint_id`, rejecting the call with `conflict` if another
/// sprint in the same project is already `active` (the unique partial
/// index `idx_sprints_one_active_per_project` is the enforcement
/// mechanism; this surfaces its violation as our own error kind).
pub async fn start_sprint(pool: &DbPool, sprint_id: SprintId) -> BackendResult<()> {
    let result = sqlx::query("update sprints set status = 'active' where id = $1 and status = 'planned'")
        .bind(sprint_id.as_uuid())
        .execute(pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                BackendError::Conflict(
                    "another sprint in this project is already active".to_string(),
                )
            }
            other => from_sqlx(other, "start_sprint"),
        })?;
    if result.rows_affected() == 0 {
        return Err(BackendError::Conflict(format!(
            "sprint {sprint_id} is not in planned status"
        )));
    }
    Ok(())
}

/// velocity = sum of completed tasks' `estimated_hours`; freezes the
/// sprint's task snapshot.
pub async fn complete_sprint(pool: &DbPool, sprint_id: SprintId, done_stage: uuid::Uuid) -> BackendResult<f64> {
    let mut tx = pool
        .begin()
        .await
        .map_err(|e| from_sqlx(e, "complete_sprint: begin"))?;

    let rows = sqlx::query(
        "select id, estimated_hours, workflow_stage_id from tasks where sprint_id = $1",
    )
    .bind(sprint_id.as_uuid())
    .fetch_all(&mut *tx)
    .await
    .map_err(|e| from_sqlx(e, "complete_sprint: load tasks"))?;

    let mut velocity = 0.0;
    for row in &rows {
        let task_id: uuid::Uuid = row.try_get("id").unwrap();
        let hours: Option<f64> = row.try_get("estimated_hours").unwrap();
        let stage: uuid::Uuid = row.try_get("workflow_stage_id").unwrap();
        if stage == done_stage {
            velocity += hours.unwrap_or(0.0);
        }
        sqlx::query(
            "insert into sprint_task_snapshots (sprint_id, task_id, estimated_hours, stage_id) \
             values ($1,$2,$3,$4) on conflict (sprint_id, task_id) do nothing",
        )
        .bind(sprint_id.as_uuid())
        .bind(task_id)
        .bind(hours)
        .bind(stage)
        .execute(&mut *tx)
        .await
        .map_err(|e| from_sqlx(e, "complete_sprint: snapshot"))?;
    }

    sqlx::query("update sprints set status = 'completed', velocity = $1 where id = $2")
        .bind(velocity)
        .bind(sprint_id.as_uuid())
        .execute(&mut *tx)
        .await
        .map_err(|e| from_sqlx(e, "complete_sprint: update"))?;

    tx.commit()
        .await
        .map_err(|e| from_sqlx(e, "complete_sprint: commit"))?;
    Ok(velocity)
}

/// Only `planned`/`active` sprints can be cancelled: a `completed` sprint
/// has a frozen `velocity` and committed `sprint_task_snapshots` that
/// cancellation must not silently overwrite.
pub async fn cancel_sprint(pool: &DbPool, sprint_id: SprintId) -> BackendResult<()> {
    let result = sqlx::query(
        "update sprints set status = 'cancelled' where id = $1 and status in ('planned', 'active')",
    )
    .bind(sprint_id.as_uuid())
    .execute(pool)
    .await
    .map_err(|e| from_sqlx(e, "cancel_sprint"))?;
    if result.rows_affected() == 0 {
        return Err(BackendError::Conflict(format!(
            "sprint {sprint_id} is not in planned or active status"
        )));
    }
    Ok(())
}

fn priority_str(p: crate::model::Priority) -> &'static str {
    use crate::model::Priority::*;
    match p {
        Low => "low",
        Medium => "medium",
        High => "high",
        Critical => "critical",
    }
}

fn sprint_status_str(s: SprintStatus) -> &'static str {
    match s {
        SprintStatus::Planned => "planned",
        SprintStatus::Active => "active",
        SprintStatus::Completed => "completed",
        SprintStatus::Cancelled => "cancelled",
    }
}

fn row_to_project(row: &sqlx::postgres::PgRow) -> BackendResult<Project> {
    let project_type_raw: String = row.try_get("project_type").unwrap();
    let project_type = match project_type_raw.as_str() {
        "software" => crate::model::ProjectType::Software,
        "marketing" => crate::model::ProjectType::Marketing,
        "research" => crate::model::ProjectType::Research,
        "bug-tracking" => crate::model::ProjectType::BugTracking,
        _ => crate::model::ProjectType::Custom,
    };
    Ok(Project {
        id: ProjectId(row.try_get("id").unwrap()),
        title: row.try_get("title").unwrap(),
        description: row.try_get("description").unwrap(),
        parent_id: row
            .try_get::<Option<uuid::Uuid>, _>("parent_id")
            .unwrap()
            .map(Into::into),
        workflow_id: row.try_get::<uuid::Uuid, _>("workflow_id").unwrap().into(),
        project_type,
        owner: row.try_get::<uuid::Uuid, _>("owner").unwrap().into(),
        archived: row.try_get("archived").unwrap(),
        created_at: Timestamp::from_datetime(row.try_get("created_at").unwrap()),
        updated_at: Timestamp::from_datetime(row.try_get("updated_at").unwrap()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reorder_task_computes_midpoint() {
        assert_eq!((1.0 + 2.0) / 2.0, 1.5);
    }
}
