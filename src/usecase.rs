//! Business operations, one function per endpoint. Handlers translate the
//! error taxonomy to HTTP; nothing is caught here.

use std::collections::HashMap;

use serde_json::Value;

use crate::models::*;
use crate::repo::{Repo, RepoError};

#[derive(thiserror::Error, Debug)]
pub enum UseCaseError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

pub type UseCaseResult<T> = Result<T, UseCaseError>;

pub async fn add_thread(
    repo: &dyn Repo,
    payload: &Value,
    owner: &str,
    username: &str,
) -> UseCaseResult<AddedThread> {
    let new = NewThread::parse(payload, owner, username)?;
    Ok(repo.add_thread(new).await?)
}

pub async fn add_comment(
    repo: &dyn Repo,
    payload: &Value,
    thread_id: &str,
    owner: &str,
    username: &str,
) -> UseCaseResult<AddedComment> {
    let new = NewComment::parse(payload, thread_id, owner, username)?;
    repo.verify_available_thread(thread_id).await?;
    Ok(repo.add_comment(new).await?)
}

pub async fn add_reply(
    repo: &dyn Repo,
    payload: &Value,
    thread_id: &str,
    comment_id: &str,
    owner: &str,
    username: &str,
) -> UseCaseResult<AddedReply> {
    let new = NewReply::parse(payload, thread_id, comment_id, owner, username)?;
    repo.verify_available_thread(thread_id).await?;
    repo.verify_available_comment_in_thread(comment_id, thread_id)
        .await?;
    Ok(repo.add_reply(new).await?)
}

pub async fn delete_comment(
    repo: &dyn Repo,
    thread_id: &str,
    comment_id: &str,
    owner: &str,
) -> UseCaseResult<()> {
    repo.verify_available_thread(thread_id).await?;
    repo.verify_available_comment_in_thread(comment_id, thread_id)
        .await?;
    repo.verify_comment_owner(comment_id, owner).await?;
    repo.delete_comment_by_id(comment_id).await?;
    Ok(())
}

pub async fn delete_reply(
    repo: &dyn Repo,
    thread_id: &str,
    comment_id: &str,
    reply_id: &str,
    owner: &str,
) -> UseCaseResult<()> {
    repo.verify_available_reply(thread_id, comment_id, reply_id)
        .await?;
    repo.verify_reply_owner(reply_id, owner).await?;
    repo.delete_reply_by_id(reply_id).await?;
    Ok(())
}

/// Flip the like state for a (comment, owner) pair.
///
/// A toggle, not an idempotent set: two toggles in sequence restore the
/// original state. Concurrent toggles for the same pair race benignly; the
/// store's uniqueness constraint keeps at most one like per pair.
pub async fn toggle_comment_like(
    repo: &dyn Repo,
    thread_id: &str,
    comment_id: &str,
    owner: &str,
) -> UseCaseResult<()> {
    repo.verify_available_thread(thread_id).await?;
    repo.verify_available_comment_in_thread(comment_id, thread_id)
        .await?;
    if repo.like_exists(comment_id, owner).await? {
        repo.delete_like(comment_id, owner).await?;
    } else {
        repo.store_like(comment_id, owner).await?;
    }
    Ok(())
}

/// Assemble the nested detail view for a thread.
///
/// The thread record, comment list, and reply list are independent fetches
/// and run concurrently. Replies are partitioned under their owning comment
/// in a single linear pass, O(comments + replies); both levels keep the
/// ascending date order their fetch returned. Soft-deleted text is swapped
/// for the fixed placeholders here and nowhere else, and internal fields
/// (owners, foreign keys, deletion flags) never reach the output.
pub async fn get_thread_detail(repo: &dyn Repo, thread_id: &str) -> UseCaseResult<ThreadDetail> {
    let (thread, comments, replies) = tokio::try_join!(
        repo.get_thread_by_id(thread_id),
        repo.get_comments_by_thread_id(thread_id),
        repo.get_replies_by_thread_id(thread_id),
    )?;

    let mut replies_by_comment: HashMap<Id, Vec<ReplyDetail>> = HashMap::new();
    for reply in replies {
        let comment_id = reply.comment_id;
        replies_by_comment
            .entry(comment_id)
            .or_default()
            .push(ReplyDetail {
                id: reply.id,
                content: Content::of(reply.content, reply.is_deleted)
                    .render(DELETED_REPLY_PLACEHOLDER),
                date: reply.date,
                username: reply.username,
            });
    }

    let mut out = Vec::with_capacity(comments.len());
    for comment in comments {
        let like_count = repo.like_count(&comment.id).await?;
        out.push(CommentDetail {
            replies: replies_by_comment.remove(&comment.id).unwrap_or_default(),
            content: Content::of(comment.content, comment.is_deleted)
                .render(DELETED_COMMENT_PLACEHOLDER),
            id: comment.id,
            username: comment.username,
            date: comment.date,
            like_count,
        });
    }

    Ok(ThreadDetail {
        id: thread.id,
        title: thread.title,
        body: thread.body,
        date: thread.date,
        username: thread.username,
        comments: out,
    })
}
