//! Generated emails: history, edits, and the two generation endpoints.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

use recap_db::MessageFilter;
use recap_types::api::{EmailQuery, GenerateMonthlyRequest, GenerateWeeklyRequest, UpdateEmailRequest};
use recap_types::dates::{
    current_month, current_week, format_month_key, format_week_key, parse_month_key,
    parse_week_key, week_in_month,
};
use recap_types::models::{EmailKind, GeneratedEmail};

use crate::error::AppError;
use crate::state::{AppState, run_blocking};

/// GET /emails?type=weekly|monthly
pub async fn list_emails(
    State(state): State<AppState>,
    query: Result<Query<EmailQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let mut emails = run_blocking(&state, |store| Ok(store.get_emails()?)).await?;

    if let Some(kind) = query.kind {
        emails.retain(|e| e.kind == kind);
    }

    Ok(Json(emails))
}

/// PUT /emails/{id}
///
/// Only subject and content are editable.
pub async fn update_email(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<UpdateEmailRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let Json(req) = payload?;
    if req.subject.is_none() && req.content.is_none() {
        return Err(AppError::Validation(
            "Provide a subject or content to update".to_string(),
        ));
    }
    if [&req.subject, &req.content]
        .into_iter()
        .flatten()
        .any(|v| v.trim().is_empty())
    {
        return Err(AppError::Validation(
            "subject and content cannot be empty".to_string(),
        ));
    }

    let updated = run_blocking(&state, move |store| {
        Ok(store.update_email(id, req.subject.as_deref(), req.content.as_deref())?)
    })
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Email {id} not found")))?;

    Ok(Json(updated))
}

/// DELETE /emails/{id}
pub async fn delete_email(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let removed = run_blocking(&state, move |store| Ok(store.delete_email(id)?)).await?;

    if !removed {
        return Err(AppError::NotFound(format!("Email {id} not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// Request key first, then the stored setting, then the server default.
async fn resolve_api_key(state: &AppState, requested: Option<String>) -> Result<Option<String>, AppError> {
    if let Some(key) = requested.filter(|k| !k.trim().is_empty()) {
        return Ok(Some(key));
    }

    let stored = run_blocking(state, |store| Ok(store.get_api_key()?)).await?;
    Ok(stored.or_else(|| state.default_api_key.clone()))
}

/// POST /emails/weekly
///
/// Summarizes the messages of one week (default: the current week) and
/// stores the result.
pub async fn generate_weekly(
    State(state): State<AppState>,
    payload: Result<Json<GenerateWeeklyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    let week = parse_week_key(req.week_of.as_deref().unwrap_or(&current_week()))?;
    let api_key = resolve_api_key(&state, req.api_key).await?;

    let filter = MessageFilter {
        user_id: req.user_id,
        week_of: Some(format_week_key(week)),
    };
    let messages = run_blocking(&state, move |store| Ok(store.get_messages(&filter)?)).await?;

    let email = recap_ai::generate_weekly(state.model.as_ref(), api_key.as_deref(), week, &messages)
        .await?;

    let email = persist(&state, email).await?;
    info!(
        "Stored weekly email {} for {} ({} messages)",
        email.id,
        format_week_key(week),
        email.raw_message_ids.len()
    );

    Ok((StatusCode::CREATED, Json(email)))
}

/// POST /emails/monthly
///
/// Rolls up the weekly emails whose week starts in the month (default: the
/// current month), oldest week first.
pub async fn generate_monthly(
    State(state): State<AppState>,
    payload: Result<Json<GenerateMonthlyRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    let month = parse_month_key(req.month_of.as_deref().unwrap_or(&current_month()))?;
    let month_key = format_month_key(month);
    let api_key = resolve_api_key(&state, req.api_key).await?;

    let mut weekly = run_blocking(&state, |store| Ok(store.get_emails()?)).await?;
    weekly.retain(|e| {
        e.kind == EmailKind::Weekly
            && e.week_of.as_deref().is_some_and(|w| week_in_month(w, &month_key))
    });
    weekly.sort_by(|a, b| {
        a.week_of
            .cmp(&b.week_of)
            .then(a.generated_at.cmp(&b.generated_at))
    });

    let email =
        recap_ai::generate_monthly(state.model.as_ref(), api_key.as_deref(), month, &weekly).await?;

    let email = persist(&state, email).await?;
    info!("Stored monthly email {} for {}", email.id, month_key);

    Ok((StatusCode::CREATED, Json(email)))
}

async fn persist(state: &AppState, email: GeneratedEmail) -> Result<GeneratedEmail, AppError> {
    run_blocking(state, move |store| {
        store.add_email(&email)?;
        Ok(email)
    })
    .await
}
