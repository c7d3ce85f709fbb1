//! Turns caller payloads into store writes.
//!
//! Authorship never comes from the payload. On create it is stamped from the
//! acting principal; on update the change types have no author field at all,
//! so a stored author cannot be rewritten. An `author` key in a payload is
//! accepted and ignored.
//!
//! Services hand the raw request body to [`parse_payload`] only after the
//! permission decision.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use uuid::Uuid;

use crate::app::error::{ServiceError, ServiceResult};
use crate::domain::engagement::{CommentChanges, NewComment};
use crate::domain::post::{NewPost, PostChanges};
use crate::domain::principal::Principal;

pub const MAX_TITLE_LEN: usize = 200;
pub const MAX_POST_CONTENT_LEN: usize = 10_000;
pub const MAX_COMMENT_LEN: usize = 2_000;

#[derive(Debug, Default, Deserialize)]
pub struct PostInput {
    pub title: Option<String>,
    pub content: Option<String>,
    /// Ignored.
    pub author: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentInput {
    /// Only read on create.
    pub post: Option<Value>,
    pub content: Option<String>,
    /// Ignored.
    pub author: Option<Value>,
}

/// An empty body reads as an empty object.
pub fn parse_payload<T: DeserializeOwned>(body: &[u8]) -> ServiceResult<T> {
    let body = if body.iter().all(u8::is_ascii_whitespace) {
        b"{}".as_slice()
    } else {
        body
    };
    serde_json::from_slice(body)
        .map_err(|err| ServiceError::validation(format!("invalid request body: {}", err)))
}

fn acting_user(principal: &Principal) -> ServiceResult<Uuid> {
    principal.id().ok_or(ServiceError::AuthenticationRequired)
}

fn note_ignored_author(principal: &Principal, author: Option<Value>) {
    if let Some(author) = author {
        tracing::debug!(?principal, supplied = %author, "ignoring caller-supplied author");
    }
}

fn check_text(field: &str, value: &str, max_len: usize) -> ServiceResult<()> {
    if value.trim().is_empty() {
        return Err(ServiceError::validation(format!("{} cannot be blank", field)));
    }
    if value.chars().count() > max_len {
        return Err(ServiceError::validation(format!(
            "{} must be at most {} characters",
            field, max_len
        )));
    }
    Ok(())
}

fn required_text(field: &str, value: Option<String>, max_len: usize) -> ServiceResult<String> {
    let value = value.ok_or_else(|| ServiceError::validation(format!("{} is required", field)))?;
    check_text(field, &value, max_len)?;
    Ok(value)
}

fn optional_text(
    field: &str,
    value: Option<String>,
    max_len: usize,
) -> ServiceResult<Option<String>> {
    if let Some(value) = &value {
        check_text(field, value, max_len)?;
    }
    Ok(value)
}

pub fn new_post(principal: &Principal, input: PostInput) -> ServiceResult<NewPost> {
    let author_id = acting_user(principal)?;
    note_ignored_author(principal, input.author);
    Ok(NewPost {
        author_id,
        title: required_text("title", input.title, MAX_TITLE_LEN)?,
        content: required_text("content", input.content, MAX_POST_CONTENT_LEN)?,
    })
}

pub fn post_changes(principal: &Principal, input: PostInput) -> ServiceResult<PostChanges> {
    note_ignored_author(principal, input.author);
    Ok(PostChanges {
        title: optional_text("title", input.title, MAX_TITLE_LEN)?,
        content: optional_text("content", input.content, MAX_POST_CONTENT_LEN)?,
    })
}

/// Parent existence is checked by the caller against the store.
pub fn new_comment(principal: &Principal, input: CommentInput) -> ServiceResult<NewComment> {
    let author_id = acting_user(principal)?;
    note_ignored_author(principal, input.author);
    let post_id = match input.post {
        None | Some(Value::Null) => return Err(ServiceError::validation("post is required")),
        Some(Value::String(id)) => {
            Uuid::parse_str(&id).map_err(|_| ServiceError::validation("invalid post"))?
        }
        Some(_) => return Err(ServiceError::validation("invalid post")),
    };
    Ok(NewComment {
        post_id,
        author_id,
        content: required_text("content", input.content, MAX_COMMENT_LEN)?,
    })
}

/// A comment stays on the post it was written for; `post` is ignored here.
pub fn comment_changes(
    principal: &Principal,
    input: CommentInput,
) -> ServiceResult<CommentChanges> {
    note_ignored_author(principal, input.author);
    Ok(CommentChanges {
        content: optional_text("content", input.content, MAX_COMMENT_LEN)?,
    })
}
