use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Utc;
use tracing::{debug, warn};
use uuid::Uuid;

use recap_db::MessageFilter;
use recap_types::api::{CreateMessageRequest, MessageQuery, WeekSummary};
use recap_types::dates::{format_week_key, format_week_range, parse_week_key};
use recap_types::models::{Message, Tag};

use crate::error::AppError;
use crate::state::{AppState, run_blocking};

/// POST /messages
///
/// The owner is whatever `userId` the client claims; there is no session to
/// check it against.
pub async fn create_message(
    State(state): State<AppState>,
    payload: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Json(req) = payload?;

    let (Some(user_id), Some(content), Some(tag)) = (req.user_id, req.content, req.tag) else {
        return Err(AppError::Validation(
            "userId, content and tag are required".to_string(),
        ));
    };
    let content = content.trim().to_string();
    if content.is_empty() {
        return Err(AppError::Validation("content cannot be empty".to_string()));
    }
    let tag: Tag = tag.parse()?;

    let message = run_blocking(&state, move |store| {
        if store.get_user_by_id(user_id)?.is_none() {
            return Err(AppError::NotFound(format!("User {user_id} not found")));
        }

        let message = Message::new(user_id, content, tag, Utc::now());
        store.add_message(&message)?;
        Ok(message)
    })
    .await?;

    debug!("Stored {} message {} for week {}", message.tag, message.id, message.week_of);

    Ok((StatusCode::CREATED, Json(message)))
}

/// GET /messages?userId=&weekOf=
pub async fn list_messages(
    State(state): State<AppState>,
    query: Result<Query<MessageQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;

    // Any day of a week selects that week.
    let week_of = query
        .week_of
        .as_deref()
        .map(parse_week_key)
        .transpose()?
        .map(format_week_key);

    let filter = MessageFilter {
        user_id: query.user_id,
        week_of,
    };

    let messages = run_blocking(&state, move |store| Ok(store.get_messages(&filter)?)).await?;

    Ok(Json(messages))
}

/// DELETE /messages/{id}
pub async fn delete_message(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Path(id) = id?;
    let removed = run_blocking(&state, move |store| Ok(store.delete_message(id)?)).await?;

    if !removed {
        return Err(AppError::NotFound(format!("Message {id} not found")));
    }

    Ok(StatusCode::NO_CONTENT)
}

/// GET /weeks?userId=
///
/// Weeks that have at least one message, newest first.
pub async fn list_weeks(
    State(state): State<AppState>,
    query: Result<Query<MessageQuery>, QueryRejection>,
) -> Result<impl IntoResponse, AppError> {
    let Query(query) = query?;
    let user_id = query.user_id;
    let weeks = run_blocking(&state, move |store| Ok(store.list_weeks(user_id)?)).await?;

    let summaries: Vec<WeekSummary> = weeks
        .into_iter()
        .map(|week| {
            let range = parse_week_key(&week.week_of)
                .map(format_week_range)
                .unwrap_or_else(|e| {
                    warn!("Corrupt week key '{}': {}", week.week_of, e);
                    week.week_of.clone()
                });
            WeekSummary {
                week_of: week.week_of,
                range,
                message_count: week.count,
            }
        })
        .collect();

    Ok(Json(summaries))
}
