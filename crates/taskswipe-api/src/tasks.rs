use axum::{Extension, Json, extract::State, http::StatusCode, response::IntoResponse};
use uuid::Uuid;

use taskswipe_db::tasks::{NewTask, TaskChanges, TaskDeleteOutcome, TaskUpdateOutcome};
use taskswipe_types::api::{
    Ack, Claims, CreateTaskRequest, Pagination, TaskListQuery, TaskListResponse, UpdateTaskRequest,
};
use taskswipe_types::models::{Task, TaskPriority, TaskStatus};

use crate::error::ApiError;
use crate::extract::{ApiJson, ApiPath, ApiQuery, OwnedPath};
use crate::{AppState, run_db};

pub(crate) const MAX_PAGE_SIZE: u32 = 100;

/// Clamps a 1-based page request to `(page, limit, offset)`.
pub(crate) fn page_window(page: u32, limit: u32) -> (u32, u32, u32) {
    let page = page.max(1);
    let limit = limit.clamp(1, MAX_PAGE_SIZE);
    (page, limit, (page - 1).saturating_mul(limit))
}

fn parse_priority(raw: Option<&str>) -> Result<Option<TaskPriority>, ApiError> {
    raw.map(|p| {
        p.parse()
            .map_err(|_| ApiError::InvalidArgument("Priority must be low, medium or high".into()))
    })
    .transpose()
}

fn check_budget(budget: f64) -> Result<(), ApiError> {
    if !budget.is_finite() || budget < 0.0 {
        return Err(ApiError::InvalidArgument("Budget must be a non-negative number".into()));
    }
    Ok(())
}

pub async fn create_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if req.title.trim().is_empty() {
        return Err(ApiError::InvalidArgument("Title is required".into()));
    }
    check_budget(req.budget)?;
    let priority = parse_priority(req.priority.as_deref())?.unwrap_or(TaskPriority::Medium);

    let id = Uuid::new_v4().to_string();
    let client_id = claims.sub.to_string();
    let row = run_db(&state, move |db| {
        db.create_task(&NewTask {
            id: &id,
            client_id: &client_id,
            title: req.title.trim(),
            description: &req.description,
            category: &req.category,
            budget: req.budget,
            estimated_hours: req.estimated_hours,
            deadline: req.deadline,
            required_skills: &req.required_skills,
            location: req.location.as_ref(),
            priority,
        })
    })
    .await?;

    Ok((StatusCode::CREATED, Json(row.into_model())))
}

/// Open tasks from other clients, newest first.
pub async fn list_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiQuery(query): ApiQuery<TaskListQuery>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let (page, limit, offset) = page_window(query.page, query.limit);
    let requester = claims.sub.to_string();

    let rows = run_db(&state, move |db| {
        db.list_open_tasks(&requester, query.category.as_deref(), limit, offset)
    })
    .await?;

    let pagination = Pagination::for_page(page, limit, rows.len());
    Ok(Json(TaskListResponse {
        tasks: rows.into_iter().map(|r| r.into_model()).collect(),
        pagination: Some(pagination),
    }))
}

pub async fn my_tasks(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<Json<TaskListResponse>, ApiError> {
    let client_id = claims.sub.to_string();
    let rows = run_db(&state, move |db| db.list_tasks_by_client(&client_id)).await?;

    Ok(Json(TaskListResponse {
        tasks: rows.into_iter().map(|r| r.into_model()).collect(),
        pagination: None,
    }))
}

/// Counts the view, then returns the task.
pub async fn get_task(
    State(state): State<AppState>,
    ApiPath(task_id): ApiPath<Uuid>,
) -> Result<Json<Task>, ApiError> {
    let id = task_id.to_string();
    let row = run_db(&state, move |db| db.view_task(&id))
        .await?
        .ok_or(ApiError::NotFound("Task not found"))?;
    Ok(Json(row.into_model()))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    OwnedPath(task_id): OwnedPath<Uuid>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    if req.title.as_deref().is_some_and(|t| t.trim().is_empty()) {
        return Err(ApiError::InvalidArgument("Title cannot be empty".into()));
    }
    if let Some(budget) = req.budget {
        check_budget(budget)?;
    }
    let priority = parse_priority(req.priority.as_deref())?;

    let cancel = match req.status.as_deref() {
        None => false,
        Some(raw) => match raw.parse::<TaskStatus>()? {
            TaskStatus::Cancelled => true,
            _ => {
                return Err(ApiError::InvalidArgument(
                    "Task status can only be changed to cancelled".into(),
                ));
            }
        },
    };

    let changes = TaskChanges {
        title: req.title.map(|t| t.trim().to_string()),
        description: req.description,
        category: req.category,
        budget: req.budget,
        estimated_hours: req.estimated_hours,
        deadline: req.deadline,
        required_skills: req.required_skills,
        location: req.location,
        priority,
        cancel,
    };

    let id = task_id.to_string();
    let requester = claims.sub.to_string();
    let outcome = run_db(&state, move |db| db.update_task(&id, &requester, &changes)).await?;

    match outcome {
        TaskUpdateOutcome::Updated(row) => Ok(Json(row.into_model())),
        TaskUpdateOutcome::NotFound => Err(ApiError::NotFound("Task not found")),
        TaskUpdateOutcome::Forbidden => Err(ApiError::Forbidden),
        TaskUpdateOutcome::NotOpen => Err(ApiError::Conflict("Task is no longer open")),
    }
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    OwnedPath(task_id): OwnedPath<Uuid>,
) -> Result<Json<Ack>, ApiError> {
    let id = task_id.to_string();
    let requester = claims.sub.to_string();

    match run_db(&state, move |db| db.delete_task(&id, &requester)).await? {
        TaskDeleteOutcome::Deleted => Ok(Json(Ack::new("Task deleted successfully"))),
        TaskDeleteOutcome::NotFound => Err(ApiError::NotFound("Task not found")),
        TaskDeleteOutcome::Forbidden => Err(ApiError::Forbidden),
        TaskDeleteOutcome::NotOpen => Err(ApiError::Conflict("Only open tasks can be deleted")),
    }
}
