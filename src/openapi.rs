use crate::models::{
    AddedComment, AddedReply, AddedThread, CommentDetail, ReplyDetail, ThreadDetail,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::routes::create_thread,
        crate::routes::get_thread,
        crate::routes::create_comment,
        crate::routes::delete_comment,
        crate::routes::create_reply,
        crate::routes::delete_reply,
        crate::routes::put_like,
    ),
    components(schemas(
        AddedThread, AddedComment, AddedReply,
        ThreadDetail, CommentDetail, ReplyDetail,
        crate::routes::ThreadRequest, crate::routes::ContentRequest,
    )),
    tags(
        (name = "threads", description = "Thread operations"),
        (name = "comments", description = "Comment operations"),
        (name = "replies", description = "Reply operations"),
        (name = "likes", description = "Comment like toggling"),
    )
)]
pub struct ApiDoc;
