#![cfg(feature = "inmem-store")]

use actix_web::{test, App};
use forumd::auth::create_jwt;
use forumd::rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiterFacade};
use forumd::repo::inmem::InMemRepo;
use forumd::routes::{config, AppState};
use serial_test::serial;
use std::sync::Arc;

// Helper to ensure JWT secret present & unique temp data dir per test
fn setup_env() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("FORUMD_DATA_DIR", tmp.path().to_str().unwrap());
}

fn state() -> AppState {
    AppState {
        repo: Arc::new(InMemRepo::new()),
        // rate limiting exercised separately in tests/rate_limit.rs
        limiter: RateLimiterFacade::new(
            InMemoryRateLimiter::new(false),
            RateLimitConfig::from_env(),
        ),
    }
}

fn token(user_id: &str, username: &str) -> String {
    create_jwt(user_id, username).unwrap()
}

#[actix_web::test]
#[serial]
async fn test_thread_comment_reply_like_flow() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let dicoding = token("user-123", "dicoding");
    let john = token("user-456", "johndoe");

    // create thread
    let req = test::TestRequest::post()
        .uri("/api/v1/threads")
        .insert_header(("Authorization", format!("Bearer {dicoding}")))
        .set_json(serde_json::json!({"title": "sebuah thread", "body": "isi thread"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(body["status"], "success");
    let added = &body["data"]["addedThread"];
    assert_eq!(added["title"], "sebuah thread");
    assert_eq!(added["owner"], "user-123");
    let thread_id = added["id"].as_str().unwrap().to_string();

    // comment from another user
    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/threads/{thread_id}/comments"))
        .insert_header(("Authorization", format!("Bearer {john}")))
        .set_json(serde_json::json!({"content": "sebuah komentar"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let comment_id = body["data"]["addedComment"]["id"].as_str().unwrap().to_string();

    // reply under the comment
    let req = test::TestRequest::post()
        .uri(&format!(
            "/api/v1/threads/{thread_id}/comments/{comment_id}/replies"
        ))
        .insert_header(("Authorization", format!("Bearer {dicoding}")))
        .set_json(serde_json::json!({"content": "sebuah balasan"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let reply_id = body["data"]["addedReply"]["id"].as_str().unwrap().to_string();

    // like the comment
    let req = test::TestRequest::put()
        .uri(&format!(
            "/api/v1/threads/{thread_id}/comments/{comment_id}/likes"
        ))
        .insert_header(("Authorization", format!("Bearer {dicoding}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    // assembled detail view
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/threads/{thread_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let thread = &body["data"]["thread"];
    assert_eq!(thread["id"], thread_id.as_str());
    assert_eq!(thread["username"], "dicoding");
    let comments = thread["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["id"], comment_id.as_str());
    assert_eq!(comments[0]["username"], "johndoe");
    assert_eq!(comments[0]["content"], "sebuah komentar");
    assert_eq!(comments[0]["likeCount"], 1);
    let replies = comments[0]["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["id"], reply_id.as_str());
    assert_eq!(replies[0]["username"], "dicoding");
    // internal fields must not leak into the view
    assert!(comments[0].get("is_deleted").is_none());
    assert!(comments[0].get("owner").is_none());
    assert!(replies[0].get("comment_id").is_none());
}

#[actix_web::test]
#[serial]
async fn test_writes_require_bearer_token() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let req = test::TestRequest::post()
        .uri("/api/v1/threads")
        .set_json(serde_json::json!({"title": "t", "body": "b"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
#[serial]
async fn test_invalid_payload_is_rejected_before_any_write() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let auth = token("user-123", "dicoding");

    // missing body
    let req = test::TestRequest::post()
        .uri("/api/v1/threads")
        .insert_header(("Authorization", format!("Bearer {auth}")))
        .set_json(serde_json::json!({"title": "only a title"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    assert_eq!(body["status"], "fail");

    // wrong type
    let req = test::TestRequest::post()
        .uri("/api/v1/threads")
        .insert_header(("Authorization", format!("Bearer {auth}")))
        .set_json(serde_json::json!({"title": 42, "body": "b"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);
}

#[actix_web::test]
#[serial]
async fn test_missing_parents_yield_404() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let auth = token("user-123", "dicoding");

    let req = test::TestRequest::get()
        .uri("/api/v1/threads/thread-missing")
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::post()
        .uri("/api/v1/threads/thread-missing/comments")
        .insert_header(("Authorization", format!("Bearer {auth}")))
        .set_json(serde_json::json!({"content": "c"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    // real thread, bogus comment
    let req = test::TestRequest::post()
        .uri("/api/v1/threads")
        .insert_header(("Authorization", format!("Bearer {auth}")))
        .set_json(serde_json::json!({"title": "t", "body": "b"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let thread_id = body["data"]["addedThread"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!(
            "/api/v1/threads/{thread_id}/comments/comment-missing/replies"
        ))
        .insert_header(("Authorization", format!("Bearer {auth}")))
        .set_json(serde_json::json!({"content": "r"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);

    let req = test::TestRequest::put()
        .uri(&format!(
            "/api/v1/threads/{thread_id}/comments/comment-missing/likes"
        ))
        .insert_header(("Authorization", format!("Bearer {auth}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
#[serial]
async fn test_delete_comment_enforces_ownership_then_masks_content() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;

    let owner = token("user-123", "dicoding");
    let intruder = token("user-999", "mallory");

    let req = test::TestRequest::post()
        .uri("/api/v1/threads")
        .insert_header(("Authorization", format!("Bearer {owner}")))
        .set_json(serde_json::json!({"title": "t", "body": "b"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let thread_id = body["data"]["addedThread"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::post()
        .uri(&format!("/api/v1/threads/{thread_id}/comments"))
        .insert_header(("Authorization", format!("Bearer {owner}")))
        .set_json(serde_json::json!({"content": "to be deleted"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let comment_id = body["data"]["addedComment"]["id"].as_str().unwrap().to_string();

    // not the owner -> 403
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/threads/{thread_id}/comments/{comment_id}"))
        .insert_header(("Authorization", format!("Bearer {intruder}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 403);

    // owner -> 200
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/threads/{thread_id}/comments/{comment_id}"))
        .insert_header(("Authorization", format!("Bearer {owner}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    // detail still lists the comment, content replaced by the placeholder
    let req = test::TestRequest::get()
        .uri(&format!("/api/v1/threads/{thread_id}"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    let body: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
    let comments = body["data"]["thread"]["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0]["content"], "**komentar telah dihapus**");

    // repeated delete -> 404 (already gone as far as mutation is concerned)
    let req = test::TestRequest::delete()
        .uri(&format!("/api/v1/threads/{thread_id}/comments/{comment_id}"))
        .insert_header(("Authorization", format!("Bearer {owner}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 404);
}
