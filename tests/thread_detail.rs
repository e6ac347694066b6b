#![cfg(feature = "inmem-store")]

// Detail-view behavior end to end against the in-memory store: reply
// grouping/ordering, like counting, and deleted-content masking.

use actix_web::{test, App};
use forumd::auth::create_jwt;
use forumd::rate_limit::{InMemoryRateLimiter, RateLimitConfig, RateLimiterFacade};
use forumd::repo::inmem::InMemRepo;
use forumd::routes::{config, AppState};
use serial_test::serial;
use std::sync::Arc;

fn setup_env() {
    std::env::set_var("JWT_SECRET", "test-secret-must-be-32-bytes-long!!");
    let tmp = tempfile::tempdir().unwrap();
    std::env::set_var("FORUMD_DATA_DIR", tmp.path().to_str().unwrap());
}

fn state() -> AppState {
    AppState {
        repo: Arc::new(InMemRepo::new()),
        limiter: RateLimiterFacade::new(
            InMemoryRateLimiter::new(false),
            RateLimitConfig::from_env(),
        ),
    }
}

fn token(user_id: &str, username: &str) -> String {
    create_jwt(user_id, username).unwrap()
}

macro_rules! post_created {
    ($app:expr, $uri:expr, $auth:expr, $body:expr) => {{
        let req = test::TestRequest::post()
            .uri($uri)
            .insert_header(("Authorization", format!("Bearer {}", $auth)))
            .set_json($body)
            .to_request();
        let resp = test::call_service($app, req).await;
        assert_eq!(resp.status(), 201);
        let v: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
        v
    }};
}

macro_rules! fetch_detail {
    ($app:expr, $thread_id:expr) => {{
        let req = test::TestRequest::get()
            .uri(&format!("/api/v1/threads/{}", $thread_id))
            .to_request();
        let resp = test::call_service($app, req).await;
        assert_eq!(resp.status(), 200);
        let v: serde_json::Value = serde_json::from_slice(&test::read_body(resp).await).unwrap();
        v["data"]["thread"].clone()
    }};
}

#[actix_web::test]
#[serial]
async fn replies_stay_under_their_comment_in_creation_order() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;
    let auth = token("user-123", "dicoding");

    let body = post_created!(
        &app,
        "/api/v1/threads",
        auth,
        serde_json::json!({"title": "t", "body": "b"})
    );
    let thread_id = body["data"]["addedThread"]["id"].as_str().unwrap().to_string();

    let mut comment_ids = Vec::new();
    for content in ["first comment", "second comment"] {
        let body = post_created!(
            &app,
            &format!("/api/v1/threads/{thread_id}/comments"),
            auth,
            serde_json::json!({"content": content})
        );
        comment_ids.push(body["data"]["addedComment"]["id"].as_str().unwrap().to_string());
    }

    // interleave replies across the two comments
    let mut reply_ids = Vec::new();
    for (target, content) in [(0, "reply a"), (1, "reply b"), (0, "reply c")] {
        let body = post_created!(
            &app,
            &format!(
                "/api/v1/threads/{thread_id}/comments/{}/replies",
                comment_ids[target]
            ),
            auth,
            serde_json::json!({"content": content})
        );
        reply_ids.push(body["data"]["addedReply"]["id"].as_str().unwrap().to_string());
    }

    let thread = fetch_detail!(&app, thread_id);
    let comments = thread["comments"].as_array().unwrap();
    assert_eq!(comments.len(), 2);
    // comments keep creation order
    assert_eq!(comments[0]["id"], comment_ids[0].as_str());
    assert_eq!(comments[1]["id"], comment_ids[1].as_str());

    let first: Vec<&str> = comments[0]["replies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(first, [reply_ids[0].as_str(), reply_ids[2].as_str()]);

    let second: Vec<&str> = comments[1]["replies"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["id"].as_str().unwrap())
        .collect();
    assert_eq!(second, [reply_ids[1].as_str()]);
}

#[actix_web::test]
#[serial]
async fn deleted_reply_is_masked_but_still_listed() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;
    let auth = token("user-123", "dicoding");

    let body = post_created!(
        &app,
        "/api/v1/threads",
        auth,
        serde_json::json!({"title": "t", "body": "b"})
    );
    let thread_id = body["data"]["addedThread"]["id"].as_str().unwrap().to_string();

    let body = post_created!(
        &app,
        &format!("/api/v1/threads/{thread_id}/comments"),
        auth,
        serde_json::json!({"content": "ini isi komentar"})
    );
    let comment_id = body["data"]["addedComment"]["id"].as_str().unwrap().to_string();

    let body = post_created!(
        &app,
        &format!("/api/v1/threads/{thread_id}/comments/{comment_id}/replies"),
        auth,
        serde_json::json!({"content": "ini isi balasan"})
    );
    let reply_id = body["data"]["addedReply"]["id"].as_str().unwrap().to_string();

    let req = test::TestRequest::delete()
        .uri(&format!(
            "/api/v1/threads/{thread_id}/comments/{comment_id}/replies/{reply_id}"
        ))
        .insert_header(("Authorization", format!("Bearer {auth}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let thread = fetch_detail!(&app, thread_id);
    let replies = thread["comments"][0]["replies"].as_array().unwrap();
    assert_eq!(replies.len(), 1);
    assert_eq!(replies[0]["content"], "**balasan telah dihapus**");
    // sibling comment content untouched
    assert_eq!(thread["comments"][0]["content"], "ini isi komentar");
}

#[actix_web::test]
#[serial]
async fn double_toggle_restores_like_count() {
    setup_env();
    let app = test::init_service(
        App::new()
            .app_data(actix_web::web::Data::new(state()))
            .configure(config),
    )
    .await;
    let auth = token("user-123", "dicoding");
    let other = token("user-456", "johndoe");

    let body = post_created!(
        &app,
        "/api/v1/threads",
        auth,
        serde_json::json!({"title": "t", "body": "b"})
    );
    let thread_id = body["data"]["addedThread"]["id"].as_str().unwrap().to_string();

    let body = post_created!(
        &app,
        &format!("/api/v1/threads/{thread_id}/comments"),
        auth,
        serde_json::json!({"content": "likeable"})
    );
    let comment_id = body["data"]["addedComment"]["id"].as_str().unwrap().to_string();

    let like_uri = format!("/api/v1/threads/{thread_id}/comments/{comment_id}/likes");

    // two distinct users like the comment
    for bearer in [&auth, &other] {
        let req = test::TestRequest::put()
            .uri(&like_uri)
            .insert_header(("Authorization", format!("Bearer {bearer}")))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), 200);
    }
    let thread = fetch_detail!(&app, thread_id);
    assert_eq!(thread["comments"][0]["likeCount"], 2);

    // one of them toggles again: back to a single like
    let req = test::TestRequest::put()
        .uri(&like_uri)
        .insert_header(("Authorization", format!("Bearer {auth}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
    let thread = fetch_detail!(&app, thread_id);
    assert_eq!(thread["comments"][0]["likeCount"], 1);

    // and forth: restored
    let req = test::TestRequest::put()
        .uri(&like_uri)
        .insert_header(("Authorization", format!("Bearer {auth}")))
        .to_request();
    assert_eq!(test::call_service(&app, req).await.status(), 200);
    let thread = fetch_detail!(&app, thread_id);
    assert_eq!(thread["comments"][0]["likeCount"], 2);
}
