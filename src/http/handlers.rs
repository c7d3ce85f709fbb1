use axum::body::Bytes;
use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::app::comments::CommentService;
use crate::app::engagement::EngagementService;
use crate::app::feed::FeedService;
use crate::app::notifications::NotificationService;
use crate::app::posts::PostService;
use crate::app::social::SocialService;
use crate::domain::engagement::{Comment, CommentQuery, Like};
use crate::domain::notification::Notification;
use crate::domain::post::{Post, PostOrdering, PostQuery};
use crate::domain::principal::Principal;
use crate::domain::relation::Edge;
use crate::domain::social_graph::Follow;
use crate::http::extract::{AppPath, AppQuery};
use crate::http::AppError;
use crate::AppState;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 100;

#[derive(Serialize)]
pub(crate) struct HealthResponse {
    status: &'static str,
}

#[derive(Deserialize)]
pub struct PaginationQuery {
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

#[derive(Serialize)]
pub struct ListResponse<T> {
    pub items: Vec<T>,
    pub next_cursor: Option<String>,
}

fn parse_cursor(cursor: Option<String>) -> Result<Option<(OffsetDateTime, Uuid)>, AppError> {
    let Some(cursor) = cursor else {
        return Ok(None);
    };

    let mut parts = cursor.splitn(2, '/');
    let timestamp = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;
    let id = parts
        .next()
        .ok_or_else(|| AppError::bad_request("invalid cursor"))?;

    let timestamp = OffsetDateTime::parse(timestamp, &Rfc3339)
        .map_err(|_| AppError::bad_request("invalid cursor"))?;
    let id = Uuid::parse_str(id).map_err(|_| AppError::bad_request("invalid cursor"))?;

    Ok(Some((timestamp, id)))
}

fn encode_cursor(cursor: Option<(OffsetDateTime, Uuid)>) -> Option<String> {
    let (timestamp, id) = cursor?;
    let timestamp = timestamp.format(&Rfc3339).ok()?;
    Some(format!("{}/{}", timestamp, id))
}

fn page_limit(limit: Option<i64>) -> Result<i64, AppError> {
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);
    if !(1..=MAX_PAGE_SIZE).contains(&limit) {
        return Err(AppError::bad_request(format!(
            "limit must be between 1 and {}",
            MAX_PAGE_SIZE
        )));
    }
    Ok(limit)
}

/// Services are asked for `limit + 1` rows; the extra one only signals that
/// another page exists.
fn into_page<T>(
    mut items: Vec<T>,
    limit: i64,
    cursor_of: impl Fn(&T) -> (OffsetDateTime, Uuid),
) -> ListResponse<T> {
    let limit = limit as usize;
    let next_cursor = if items.len() > limit {
        items.truncate(limit);
        items.last().map(&cursor_of)
    } else {
        None
    };

    ListResponse {
        items,
        next_cursor: encode_cursor(next_cursor),
    }
}

fn follows_page(edges: Vec<Edge>, limit: i64) -> ListResponse<Follow> {
    let page = into_page(edges, limit, Edge::cursor);
    ListResponse {
        items: page.items.into_iter().map(Follow::from).collect(),
        next_cursor: page.next_cursor,
    }
}

pub(crate) async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let status = match state.store.ping().await {
        Ok(()) => "ok",
        Err(err) => {
            tracing::warn!(error = ?err, "store ping failed");
            "degraded"
        }
    };

    Json(HealthResponse { status })
}

// ---------------------------------------------------------------------------
// Posts
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct PostListQuery {
    pub author: Option<Uuid>,
    pub search: Option<String>,
    pub ordering: Option<String>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

pub async fn list_posts(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PostListQuery>,
) -> Result<Json<ListResponse<Post>>, AppError> {
    let limit = page_limit(query.limit)?;
    let ordering = match query.ordering.as_deref() {
        Some(ordering) => ordering.parse::<PostOrdering>().map_err(AppError::bad_request)?,
        None => PostOrdering::default(),
    };
    let search = query
        .search
        .map(|search| search.trim().to_string())
        .filter(|search| !search.is_empty());
    let query = PostQuery {
        author_id: query.author,
        search,
        ordering,
        cursor: parse_cursor(query.cursor)?,
        limit: limit + 1,
    };

    let service = PostService::new(state.store.clone());
    let posts = service.list_posts(&query).await?;

    Ok(Json(into_page(posts, limit, |post| (post.created_at, post.id))))
}

pub async fn create_post(
    principal: Principal,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Post>), AppError> {
    let service = PostService::new(state.store.clone());
    let post = service.create_post(&principal, &body).await?;

    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn get_post(
    AppPath(id): AppPath<Uuid>,
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Post>, AppError> {
    let service = PostService::new(state.store.clone());
    let post = service.get_post(&principal, id).await?;

    Ok(Json(post))
}

pub async fn update_post(
    AppPath(id): AppPath<Uuid>,
    principal: Principal,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Post>, AppError> {
    let service = PostService::new(state.store.clone());
    let post = service.update_post(&principal, id, &body).await?;

    Ok(Json(post))
}

pub async fn delete_post(
    AppPath(id): AppPath<Uuid>,
    principal: Principal,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = PostService::new(state.store.clone());
    service.delete_post(&principal, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Likes
// ---------------------------------------------------------------------------

pub async fn like_post(
    AppPath(id): AppPath<Uuid>,
    principal: Principal,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Like>), AppError> {
    let service = EngagementService::new(state.store.clone(), state.toggles());
    let like = service.like_post(&principal, id).await?;

    Ok((StatusCode::CREATED, Json(like)))
}

pub async fn unlike_post(
    AppPath(id): AppPath<Uuid>,
    principal: Principal,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = EngagementService::new(state.store.clone(), state.toggles());
    service.unlike_post(&principal, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_post_likes(
    AppPath(id): AppPath<Uuid>,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PaginationQuery>,
) -> Result<Json<ListResponse<Like>>, AppError> {
    let limit = page_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;

    let service = EngagementService::new(state.store.clone(), state.toggles());
    let likes = service.list_likes(id, cursor, limit + 1).await?;

    Ok(Json(into_page(likes, limit, |like| (like.created_at, like.id))))
}

// ---------------------------------------------------------------------------
// Comments
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CommentListQuery {
    pub post: Option<Uuid>,
    pub author: Option<Uuid>,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

pub async fn list_comments(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<CommentListQuery>,
) -> Result<Json<ListResponse<Comment>>, AppError> {
    let limit = page_limit(query.limit)?;
    let query = CommentQuery {
        post_id: query.post,
        author_id: query.author,
        cursor: parse_cursor(query.cursor)?,
        limit: limit + 1,
    };

    let service = CommentService::new(state.store.clone());
    let comments = service.list_comments(&query).await?;

    Ok(Json(into_page(comments, limit, |comment| {
        (comment.created_at, comment.id)
    })))
}

pub async fn create_comment(
    principal: Principal,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<Comment>), AppError> {
    let service = CommentService::new(state.store.clone());
    let comment = service.create_comment(&principal, &body).await?;

    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn get_comment(
    AppPath(id): AppPath<Uuid>,
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<Comment>, AppError> {
    let service = CommentService::new(state.store.clone());
    let comment = service.get_comment(&principal, id).await?;

    Ok(Json(comment))
}

pub async fn update_comment(
    AppPath(id): AppPath<Uuid>,
    principal: Principal,
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<Comment>, AppError> {
    let service = CommentService::new(state.store.clone());
    let comment = service.update_comment(&principal, id, &body).await?;

    Ok(Json(comment))
}

pub async fn delete_comment(
    AppPath(id): AppPath<Uuid>,
    principal: Principal,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = CommentService::new(state.store.clone());
    service.delete_comment(&principal, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Social graph
// ---------------------------------------------------------------------------

pub async fn follow_user(
    AppPath(id): AppPath<Uuid>,
    principal: Principal,
    State(state): State<AppState>,
) -> Result<(StatusCode, Json<Follow>), AppError> {
    let service = SocialService::new(state.store.clone(), state.toggles());
    let follow = service.follow(&principal, id).await?;

    Ok((StatusCode::CREATED, Json(follow)))
}

pub async fn unfollow_user(
    AppPath(id): AppPath<Uuid>,
    principal: Principal,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = SocialService::new(state.store.clone(), state.toggles());
    service.unfollow(&principal, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_followers(
    AppPath(id): AppPath<Uuid>,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PaginationQuery>,
) -> Result<Json<ListResponse<Follow>>, AppError> {
    let limit = page_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;

    let service = SocialService::new(state.store.clone(), state.toggles());
    let edges = service.list_followers(id, cursor, limit + 1).await?;

    Ok(Json(follows_page(edges, limit)))
}

pub async fn list_following(
    AppPath(id): AppPath<Uuid>,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PaginationQuery>,
) -> Result<Json<ListResponse<Follow>>, AppError> {
    let limit = page_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;

    let service = SocialService::new(state.store.clone(), state.toggles());
    let edges = service.list_following(id, cursor, limit + 1).await?;

    Ok(Json(follows_page(edges, limit)))
}

#[derive(Serialize)]
pub struct RelationshipResponse {
    pub is_following: bool,
    pub is_followed_by: bool,
}

pub async fn relationship_status(
    AppPath(id): AppPath<Uuid>,
    principal: Principal,
    State(state): State<AppState>,
) -> Result<Json<RelationshipResponse>, AppError> {
    let service = SocialService::new(state.store.clone(), state.toggles());
    let status = service.relationship(&principal, id).await?;

    Ok(Json(RelationshipResponse {
        is_following: status.is_following,
        is_followed_by: status.is_followed_by,
    }))
}

pub async fn home_feed(
    principal: Principal,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<PaginationQuery>,
) -> Result<Json<ListResponse<Post>>, AppError> {
    let limit = page_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;

    let service = FeedService::new(state.store.clone());
    let posts = service.home_feed(&principal, cursor, limit + 1).await?;

    Ok(Json(into_page(posts, limit, |post| (post.created_at, post.id))))
}

// ---------------------------------------------------------------------------
// Notifications
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct NotificationListQuery {
    #[serde(default)]
    pub unread: bool,
    pub limit: Option<i64>,
    pub cursor: Option<String>,
}

pub async fn list_notifications(
    principal: Principal,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<NotificationListQuery>,
) -> Result<Json<ListResponse<Notification>>, AppError> {
    let limit = page_limit(query.limit)?;
    let cursor = parse_cursor(query.cursor)?;

    let service = NotificationService::new(state.store.clone());
    let notifications = service
        .list(&principal, query.unread, cursor, limit + 1)
        .await?;

    Ok(Json(into_page(notifications, limit, |notification| {
        (notification.created_at, notification.id)
    })))
}

pub async fn mark_notification_read(
    AppPath(id): AppPath<Uuid>,
    principal: Principal,
    State(state): State<AppState>,
) -> Result<StatusCode, AppError> {
    let service = NotificationService::new(state.store.clone());
    service.mark_read(&principal, id).await?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursor_round_trips_through_its_text_form() {
        let at = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let id = Uuid::new_v4();

        let encoded = encode_cursor(Some((at, id))).unwrap();

        assert_eq!(parse_cursor(Some(encoded)).unwrap(), Some((at, id)));
        assert!(parse_cursor(Some("not-a-cursor".into())).is_err());
    }

    #[test]
    fn extra_row_becomes_the_next_cursor_boundary() {
        let base = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let rows: Vec<(OffsetDateTime, Uuid)> = (0..3)
            .map(|i| (base - time::Duration::seconds(i), Uuid::new_v4()))
            .collect();

        let page = into_page(rows.clone(), 2, |row| *row);

        assert_eq!(page.items.len(), 2);
        assert_eq!(page.next_cursor, encode_cursor(Some(rows[1])));
    }

    #[test]
    fn limit_outside_range_is_rejected() {
        assert!(page_limit(Some(0)).is_err());
        assert!(page_limit(Some(MAX_PAGE_SIZE + 1)).is_err());
        assert_eq!(page_limit(None).unwrap(), DEFAULT_PAGE_SIZE);
    }
}
