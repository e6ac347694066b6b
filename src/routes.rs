use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde_json::{json, Value};

use crate::auth::Auth;
use crate::error::ApiError;
use crate::models::*;
use crate::rate_limit::RateLimiterFacade;
use crate::repo::Repo;
use crate::usecase;

pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api/v1")
            .service(web::resource("/threads").route(web::post().to(create_thread)))
            .service(web::resource("/threads/{thread_id}").route(web::get().to(get_thread)))
            .service(
                web::resource("/threads/{thread_id}/comments")
                    .route(web::post().to(create_comment)),
            )
            .service(
                web::resource("/threads/{thread_id}/comments/{comment_id}")
                    .route(web::delete().to(delete_comment)),
            )
            .service(
                web::resource("/threads/{thread_id}/comments/{comment_id}/replies")
                    .route(web::post().to(create_reply)),
            )
            .service(
                web::resource("/threads/{thread_id}/comments/{comment_id}/replies/{reply_id}")
                    .route(web::delete().to(delete_reply)),
            )
            .service(
                web::resource("/threads/{thread_id}/comments/{comment_id}/likes")
                    .route(web::put().to(put_like)),
            ),
    );
}

#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<dyn Repo>,
    pub limiter: RateLimiterFacade,
}

// Documentation-only request shapes; handlers take raw JSON so the entity
// constructors can report missing keys and type mismatches themselves.
#[derive(serde::Deserialize, utoipa::ToSchema)]
pub struct ThreadRequest {
    pub title: String,
    pub body: String,
}

#[derive(serde::Deserialize, utoipa::ToSchema)]
pub struct ContentRequest {
    pub content: String,
}

#[utoipa::path(
    post,
    path = "/api/v1/threads",
    request_body = ThreadRequest,
    responses(
        (status = 201, description = "Thread created", body = AddedThread),
        (status = 400, description = "Invalid payload"),
        (status = 401, description = "Missing or invalid token")
    )
)]
pub async fn create_thread(
    auth: Auth,
    data: web::Data<AppState>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    if !data.limiter.allow_thread(&auth.0.sub) {
        return Err(ApiError::RateLimited);
    }
    let added =
        usecase::add_thread(data.repo.as_ref(), &payload, &auth.0.sub, &auth.0.username).await?;
    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "data": { "addedThread": added },
    })))
}

#[utoipa::path(
    get,
    path = "/api/v1/threads/{thread_id}",
    params(("thread_id" = String, Path, description = "Thread id")),
    responses(
        (status = 200, description = "Thread detail with comments, replies and like counts", body = ThreadDetail),
        (status = 404, description = "Thread not found")
    )
)]
pub async fn get_thread(
    data: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse, ApiError> {
    let thread_id = path.into_inner();
    let detail = usecase::get_thread_detail(data.repo.as_ref(), &thread_id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "status": "success",
        "data": { "thread": detail },
    })))
}

#[utoipa::path(
    post,
    path = "/api/v1/threads/{thread_id}/comments",
    request_body = ContentRequest,
    params(("thread_id" = String, Path, description = "Thread id")),
    responses(
        (status = 201, description = "Comment created", body = AddedComment),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Thread not found")
    )
)]
pub async fn create_comment(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<String>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    if !data.limiter.allow_comment(&auth.0.sub) {
        return Err(ApiError::RateLimited);
    }
    let thread_id = path.into_inner();
    let added = usecase::add_comment(
        data.repo.as_ref(),
        &payload,
        &thread_id,
        &auth.0.sub,
        &auth.0.username,
    )
    .await?;
    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "data": { "addedComment": added },
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/threads/{thread_id}/comments/{comment_id}",
    params(
        ("thread_id" = String, Path, description = "Thread id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Comment soft-deleted"),
        (status = 403, description = "Requester does not own the comment"),
        (status = 404, description = "Thread or comment not found")
    )
)]
pub async fn delete_comment(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (thread_id, comment_id) = path.into_inner();
    usecase::delete_comment(data.repo.as_ref(), &thread_id, &comment_id, &auth.0.sub).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "success" })))
}

#[utoipa::path(
    post,
    path = "/api/v1/threads/{thread_id}/comments/{comment_id}/replies",
    request_body = ContentRequest,
    params(
        ("thread_id" = String, Path, description = "Thread id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses(
        (status = 201, description = "Reply created", body = AddedReply),
        (status = 400, description = "Invalid payload"),
        (status = 404, description = "Thread or comment not found")
    )
)]
pub async fn create_reply(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
    payload: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    if !data.limiter.allow_comment(&auth.0.sub) {
        return Err(ApiError::RateLimited);
    }
    let (thread_id, comment_id) = path.into_inner();
    let added = usecase::add_reply(
        data.repo.as_ref(),
        &payload,
        &thread_id,
        &comment_id,
        &auth.0.sub,
        &auth.0.username,
    )
    .await?;
    Ok(HttpResponse::Created().json(json!({
        "status": "success",
        "data": { "addedReply": added },
    })))
}

#[utoipa::path(
    delete,
    path = "/api/v1/threads/{thread_id}/comments/{comment_id}/replies/{reply_id}",
    params(
        ("thread_id" = String, Path, description = "Thread id"),
        ("comment_id" = String, Path, description = "Comment id"),
        ("reply_id" = String, Path, description = "Reply id")
    ),
    responses(
        (status = 200, description = "Reply soft-deleted"),
        (status = 403, description = "Requester does not own the reply"),
        (status = 404, description = "Thread, comment or reply not found")
    )
)]
pub async fn delete_reply(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<(String, String, String)>,
) -> Result<HttpResponse, ApiError> {
    let (thread_id, comment_id, reply_id) = path.into_inner();
    usecase::delete_reply(
        data.repo.as_ref(),
        &thread_id,
        &comment_id,
        &reply_id,
        &auth.0.sub,
    )
    .await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "success" })))
}

#[utoipa::path(
    put,
    path = "/api/v1/threads/{thread_id}/comments/{comment_id}/likes",
    params(
        ("thread_id" = String, Path, description = "Thread id"),
        ("comment_id" = String, Path, description = "Comment id")
    ),
    responses(
        (status = 200, description = "Like toggled"),
        (status = 404, description = "Thread or comment not found")
    )
)]
pub async fn put_like(
    auth: Auth,
    data: web::Data<AppState>,
    path: web::Path<(String, String)>,
) -> Result<HttpResponse, ApiError> {
    if !data.limiter.allow_like(&auth.0.sub) {
        return Err(ApiError::RateLimited);
    }
    let (thread_id, comment_id) = path.into_inner();
    usecase::toggle_comment_like(data.repo.as_ref(), &thread_id, &comment_id, &auth.0.sub).await?;
    Ok(HttpResponse::Ok().json(json!({ "status": "success" })))
}
