//! Post CRUD Tests
//!
//! Covers creation, reading, updating, deleting, listing, and who may do what.

mod common;

use axum::http::StatusCode;
use common::app;
use serde_json::json;
use uuid::Uuid;

// ===========================================================================
// Post Creation
// ===========================================================================

#[tokio::test]
async fn create_post_valid() {
    let app = app().await;
    let user = app.create_user("post_create").await;

    let resp = app
        .post_json(
            "/v1/posts",
            json!({ "title": "Hello", "content": "My first post!" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    let body = resp.json();
    assert!(body["id"].is_string());
    assert_eq!(body["author_id"].as_str().unwrap(), user.id.to_string());
    assert_eq!(body["title"].as_str().unwrap(), "Hello");
    assert_eq!(body["content"].as_str().unwrap(), "My first post!");
}

#[tokio::test]
async fn create_post_ignores_supplied_author() {
    let app = app().await;
    let user = app.create_user("post_forge").await;
    let victim = app.create_user("post_forge_victim").await;

    let resp = app
        .post_json(
            "/v1/posts",
            json!({ "title": "t", "content": "c", "author": victim.id }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::CREATED);
    assert_eq!(resp.json()["author_id"].as_str().unwrap(), user.id.to_string());
}

#[tokio::test]
async fn create_post_no_auth() {
    let app = app().await;

    let resp = app
        .post_json("/v1/posts", json!({ "title": "t", "content": "c" }), None)
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        resp.error_message(),
        "authentication credentials were not provided"
    );
}

#[tokio::test]
async fn create_post_invalid_token() {
    let app = app().await;

    let resp = app
        .post_json(
            "/v1/posts",
            json!({ "title": "t", "content": "c" }),
            Some("v4.local.not-a-token"),
        )
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
    assert_eq!(resp.error_message(), "invalid token");
}

#[tokio::test]
async fn create_post_title_too_long() {
    let app = app().await;
    let user = app.create_user("post_longtitle").await;

    let resp = app
        .post_json(
            "/v1/posts",
            json!({ "title": "a".repeat(201), "content": "c" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "title must be at most 200 characters");
}

#[tokio::test]
async fn create_post_missing_content() {
    let app = app().await;
    let user = app.create_user("post_nocontent").await;

    let resp = app
        .post_json("/v1/posts", json!({ "title": "t" }), Some(&user.access_token))
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "content is required");
}

#[tokio::test]
async fn create_post_no_auth_without_body() {
    let app = app().await;

    let resp = app.post("/v1/posts", None).await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_post_no_auth_with_mistyped_body() {
    let app = app().await;

    let resp = app
        .post_json("/v1/posts", json!({ "title": 5, "content": "x" }), None)
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn create_post_mistyped_body() {
    let app = app().await;
    let user = app.create_user("post_mistyped").await;

    let resp = app
        .post_json(
            "/v1/posts",
            json!({ "title": 5, "content": "x" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert!(resp.error_message().starts_with("invalid request body"));
}

// ===========================================================================
// Post Reading
// ===========================================================================

#[tokio::test]
async fn get_post_anonymous() {
    let app = app().await;
    let user = app.create_user("post_get").await;
    let post_id = app.create_post(&user, "readable").await;

    let resp = app.get(&format!("/v1/posts/{}", post_id), None).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["id"].as_str().unwrap(), post_id.to_string());
}

#[tokio::test]
async fn get_nonexistent_post() {
    let app = app().await;

    let resp = app.get(&format!("/v1/posts/{}", Uuid::new_v4()), None).await;

    assert_eq!(resp.status, StatusCode::NOT_FOUND);
    assert_eq!(resp.error_message(), "post not found");
}

#[tokio::test]
async fn get_post_malformed_id() {
    let app = app().await;

    let resp = app.get("/v1/posts/not-a-uuid", None).await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

// ===========================================================================
// Post Updates
// ===========================================================================

#[tokio::test]
async fn update_post_title() {
    let app = app().await;
    let user = app.create_user("post_update").await;
    let post_id = app.create_post(&user, "before").await;

    let resp = app
        .patch_json(
            &format!("/v1/posts/{}", post_id),
            json!({ "title": "after" }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(body["title"].as_str().unwrap(), "after");
    assert_eq!(body["content"].as_str().unwrap(), "before body");
}

#[tokio::test]
async fn update_post_cannot_reassign_author() {
    let app = app().await;
    let user = app.create_user("post_reassign").await;
    let other = app.create_user("post_reassign_other").await;
    let post_id = app.create_post(&user, "mine").await;

    let resp = app
        .patch_json(
            &format!("/v1/posts/{}", post_id),
            json!({ "author": other.id }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(resp.json()["author_id"].as_str().unwrap(), user.id.to_string());

    let resp = app.get(&format!("/v1/posts/{}", post_id), None).await;
    assert_eq!(resp.json()["author_id"].as_str().unwrap(), user.id.to_string());
}

#[tokio::test]
async fn update_post_wrong_user() {
    let app = app().await;
    let owner = app.create_user("post_upd_owner").await;
    let other = app.create_user("post_upd_other").await;
    let post_id = app.create_post(&owner, "owned").await;

    let resp = app
        .patch_json(
            &format!("/v1/posts/{}", post_id),
            json!({ "title": "hijacked" }),
            Some(&other.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
    assert_eq!(
        resp.error_message(),
        "you do not have permission to perform this action"
    );
}

#[tokio::test]
async fn update_post_no_auth() {
    let app = app().await;
    let owner = app.create_user("post_upd_anon").await;
    let post_id = app.create_post(&owner, "owned").await;

    let resp = app
        .patch_json(
            &format!("/v1/posts/{}", post_id),
            json!({ "title": "x" }),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn update_post_blank_title() {
    let app = app().await;
    let user = app.create_user("post_upd_blank").await;
    let post_id = app.create_post(&user, "fine").await;

    let resp = app
        .patch_json(
            &format!("/v1/posts/{}", post_id),
            json!({ "title": "  " }),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "title cannot be blank");
}

#[tokio::test]
async fn update_post_wrong_user_with_mistyped_body() {
    let app = app().await;
    let owner = app.create_user("post_upd_mistyped_owner").await;
    let other = app.create_user("post_upd_mistyped_other").await;
    let post_id = app.create_post(&owner, "owned").await;

    let resp = app
        .patch_json(
            &format!("/v1/posts/{}", post_id),
            json!({ "title": 5 }),
            Some(&other.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn update_post_non_object_body() {
    let app = app().await;
    let user = app.create_user("post_upd_array").await;
    let post_id = app.create_post(&user, "fine").await;

    let resp = app
        .patch_json(
            &format!("/v1/posts/{}", post_id),
            json!(["title"]),
            Some(&user.access_token),
        )
        .await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

// ===========================================================================
// Post Deletion
// ===========================================================================

#[tokio::test]
async fn delete_post() {
    let app = app().await;
    let user = app.create_user("post_delete").await;
    let post_id = app.create_post(&user, "doomed").await;

    let resp = app
        .delete(&format!("/v1/posts/{}", post_id), Some(&user.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app.get(&format!("/v1/posts/{}", post_id), None).await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_post_wrong_user() {
    let app = app().await;
    let owner = app.create_user("post_del_owner").await;
    let other = app.create_user("post_del_other").await;
    let post_id = app.create_post(&owner, "safe").await;

    let resp = app
        .delete(&format!("/v1/posts/{}", post_id), Some(&other.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::FORBIDDEN);

    let resp = app.get(&format!("/v1/posts/{}", post_id), None).await;
    assert_eq!(resp.status, StatusCode::OK);
}

#[tokio::test]
async fn delete_post_removes_likes_and_comments() {
    let app = app().await;
    let owner = app.create_user("post_cascade_owner").await;
    let fan = app.create_user("post_cascade_fan").await;
    let post_id = app.create_post(&owner, "popular").await;

    app.post(
        &format!("/v1/posts/{}/like", post_id),
        Some(&fan.access_token),
    )
    .await;
    app.post_json(
        "/v1/comments",
        json!({ "post": post_id, "content": "nice" }),
        Some(&fan.access_token),
    )
    .await;

    let resp = app
        .delete(&format!("/v1/posts/{}", post_id), Some(&owner.access_token))
        .await;
    assert_eq!(resp.status, StatusCode::NO_CONTENT);

    let resp = app
        .get(&format!("/v1/comments?post={}", post_id), None)
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    assert!(resp.json()["items"].as_array().unwrap().is_empty());

    let resp = app
        .get(&format!("/v1/posts/{}/likes", post_id), None)
        .await;
    assert_eq!(resp.status, StatusCode::NOT_FOUND);
}

// ===========================================================================
// Post Listing
// ===========================================================================

#[tokio::test]
async fn list_posts_anonymous() {
    let app = app().await;
    let user = app.create_user("post_list").await;
    let first = app.create_post(&user, "first").await;
    let second = app.create_post(&user, "second").await;

    let resp = app
        .get(&format!("/v1/posts?author={}", user.id), None)
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    let ids: Vec<&str> = body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["id"].as_str().unwrap())
        .collect();
    let (first, second) = (first.to_string(), second.to_string());
    assert_eq!(ids, vec![second.as_str(), first.as_str()]);
    assert!(body["next_cursor"].is_null());
}

#[tokio::test]
async fn list_posts_paginates_with_cursor() {
    let app = app().await;
    let user = app.create_user("post_page").await;
    for i in 0..5 {
        app.create_post(&user, &format!("post {}", i)).await;
    }

    let mut seen = Vec::new();
    let mut path = format!("/v1/posts?author={}&limit=2", user.id);
    loop {
        let resp = app.get(&path, None).await;
        assert_eq!(resp.status, StatusCode::OK);
        let body = resp.json();
        let items = body["items"].as_array().unwrap();
        assert!(items.len() <= 2);
        seen.extend(items.iter().map(|post| post["id"].as_str().unwrap().to_string()));

        match body["next_cursor"].as_str() {
            Some(cursor) => {
                path = format!("/v1/posts?author={}&limit=2&cursor={}", user.id, cursor)
            }
            None => break,
        }
    }

    assert_eq!(seen.len(), 5);
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), 5);
}

#[tokio::test]
async fn list_posts_limit_out_of_range() {
    let app = app().await;

    let resp = app.get("/v1/posts?limit=0", None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "limit must be between 1 and 100");

    let resp = app.get("/v1/posts?limit=101", None).await;
    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn list_posts_bad_cursor() {
    let app = app().await;

    let resp = app.get("/v1/posts?cursor=garbage", None).await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(resp.error_message(), "invalid cursor");
}

fn item_ids(body: &serde_json::Value) -> Vec<String> {
    body["items"]
        .as_array()
        .unwrap()
        .iter()
        .map(|post| post["id"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn list_posts_search_matches_title_or_content() {
    let app = app().await;
    let user = app.create_user("post_search").await;
    let token = Uuid::new_v4().simple().to_string();

    let in_title = app
        .post_json(
            "/v1/posts",
            json!({ "title": format!("About {}", token), "content": "nothing here" }),
            Some(&user.access_token),
        )
        .await;
    let in_content = app
        .post_json(
            "/v1/posts",
            json!({ "title": "unrelated", "content": format!("mentions {}", token.to_uppercase()) }),
            Some(&user.access_token),
        )
        .await;
    app.create_post(&user, "no match").await;

    let resp = app.get(&format!("/v1/posts?search={}", token), None).await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(
        item_ids(&resp.json()),
        vec![
            in_content.json()["id"].as_str().unwrap().to_string(),
            in_title.json()["id"].as_str().unwrap().to_string(),
        ]
    );
}

#[tokio::test]
async fn list_posts_search_treats_wildcards_literally() {
    let app = app().await;
    let user = app.create_user("post_search_pct").await;
    app.create_post(&user, "plain title").await;

    let resp = app
        .get(&format!("/v1/posts?author={}&search=%25", user.id), None)
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert!(item_ids(&resp.json()).is_empty());
}

#[tokio::test]
async fn list_posts_oldest_first_pages_forward() {
    let app = app().await;
    let user = app.create_user("post_asc").await;
    let mut created = Vec::new();
    for i in 0..3 {
        created.push(app.create_post(&user, &format!("asc {}", i)).await.to_string());
    }

    let resp = app
        .get(
            &format!("/v1/posts?author={}&ordering=created_at&limit=2", user.id),
            None,
        )
        .await;
    assert_eq!(resp.status, StatusCode::OK);
    let body = resp.json();
    assert_eq!(item_ids(&body), created[..2].to_vec());

    let cursor = body["next_cursor"].as_str().unwrap();
    let resp = app
        .get(
            &format!(
                "/v1/posts?author={}&ordering=created_at&limit=2&cursor={}",
                user.id, cursor
            ),
            None,
        )
        .await;
    let body = resp.json();
    assert_eq!(item_ids(&body), created[2..].to_vec());
    assert!(body["next_cursor"].is_null());
}

#[tokio::test]
async fn list_posts_explicit_newest_first() {
    let app = app().await;
    let user = app.create_user("post_desc").await;
    let older = app.create_post(&user, "older").await.to_string();
    let newer = app.create_post(&user, "newer").await.to_string();

    let resp = app
        .get(
            &format!("/v1/posts?author={}&ordering=-created_at", user.id),
            None,
        )
        .await;

    assert_eq!(resp.status, StatusCode::OK);
    assert_eq!(item_ids(&resp.json()), vec![newer, older]);
}

#[tokio::test]
async fn list_posts_unknown_ordering() {
    let app = app().await;

    let resp = app.get("/v1/posts?ordering=title", None).await;

    assert_eq!(resp.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        resp.error_message(),
        "ordering must be one of created_at, -created_at"
    );
}
