use async_trait::async_trait;
use uuid::Uuid;

use crate::models::*;

#[derive(thiserror::Error, Debug)]
pub enum RepoError {
    #[error("not found")]
    NotFound,
    #[error("forbidden")]
    Forbidden,
    #[error("internal error")]
    Internal(#[from] anyhow::Error),
}

impl From<sqlx::Error> for RepoError {
    fn from(e: sqlx::Error) -> Self {
        RepoError::Internal(e.into())
    }
}

pub type RepoResult<T> = Result<T, RepoError>;

/// Prefixed opaque id, unique per entity ("thread-<uuid>", "comment-<uuid>", ...).
pub(crate) fn fresh_id(prefix: &str) -> Id {
    format!("{prefix}-{}", Uuid::new_v4())
}

#[async_trait]
pub trait ThreadRepo: Send + Sync {
    async fn add_thread(&self, new: NewThread) -> RepoResult<AddedThread>;
    async fn get_thread_by_id(&self, id: &str) -> RepoResult<ThreadRecord>;
    async fn verify_available_thread(&self, id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait CommentRepo: Send + Sync {
    async fn add_comment(&self, new: NewComment) -> RepoResult<AddedComment>;
    /// All comments of a thread, soft-deleted ones included, ascending by date.
    async fn get_comments_by_thread_id(&self, thread_id: &str) -> RepoResult<Vec<CommentRecord>>;
    async fn verify_available_comment_in_thread(
        &self,
        comment_id: &str,
        thread_id: &str,
    ) -> RepoResult<()>;
    async fn verify_comment_owner(&self, comment_id: &str, owner: &str) -> RepoResult<()>;
    /// Conditional soft delete; zero rows affected reports NotFound.
    async fn delete_comment_by_id(&self, comment_id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait ReplyRepo: Send + Sync {
    async fn add_reply(&self, new: NewReply) -> RepoResult<AddedReply>;
    /// All replies across a thread's comments, ascending by date.
    async fn get_replies_by_thread_id(&self, thread_id: &str) -> RepoResult<Vec<ReplyRecord>>;
    async fn verify_available_reply(
        &self,
        thread_id: &str,
        comment_id: &str,
        reply_id: &str,
    ) -> RepoResult<()>;
    async fn verify_reply_owner(&self, reply_id: &str, owner: &str) -> RepoResult<()>;
    async fn delete_reply_by_id(&self, reply_id: &str) -> RepoResult<()>;
}

#[async_trait]
pub trait LikeRepo: Send + Sync {
    async fn store_like(&self, comment_id: &str, owner: &str) -> RepoResult<()>;
    async fn like_exists(&self, comment_id: &str, owner: &str) -> RepoResult<bool>;
    async fn delete_like(&self, comment_id: &str, owner: &str) -> RepoResult<()>;
    async fn like_count(&self, comment_id: &str) -> RepoResult<i64>;
}

pub trait Repo: ThreadRepo + CommentRepo + ReplyRepo + LikeRepo {}

impl<T> Repo for T where T: ThreadRepo + CommentRepo + ReplyRepo + LikeRepo {}

#[cfg(feature = "inmem-store")]
pub mod inmem {
    use super::*;
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Serialize};
    use std::collections::{HashMap, HashSet};
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, RwLock};

    const SNAPSHOT_PATH: &str = "data/state.json";

    #[derive(Clone, Serialize, Deserialize)]
    struct ThreadRow {
        id: Id,
        title: String,
        body: String,
        owner: Id,
        username: String,
        date: DateTime<Utc>,
    }

    #[derive(Clone, Serialize, Deserialize)]
    struct CommentRow {
        id: Id,
        thread_id: Id,
        owner: Id,
        username: String,
        date: DateTime<Utc>,
        content: String,
        is_deleted: bool,
    }

    #[derive(Clone, Serialize, Deserialize)]
    struct ReplyRow {
        id: Id,
        thread_id: Id,
        comment_id: Id,
        owner: Id,
        username: String,
        date: DateTime<Utc>,
        content: String,
        is_deleted: bool,
    }

    #[derive(Default, Serialize, Deserialize)]
    struct State {
        threads: HashMap<Id, ThreadRow>,
        comments: HashMap<Id, CommentRow>,
        replies: HashMap<Id, ReplyRow>,
        // (comment_id, owner) pairs; set membership is the like state.
        likes: HashSet<(Id, Id)>,
    }

    #[derive(Clone)]
    pub struct InMemRepo {
        state: Arc<RwLock<State>>,
        snapshot_path: Arc<PathBuf>,
    }

    impl InMemRepo {
        fn snapshot_path() -> PathBuf {
            match std::env::var("FORUMD_DATA_DIR") {
                Ok(dir) => {
                    let mut p = PathBuf::from(dir);
                    p.push("state.json");
                    p
                }
                Err(_) => PathBuf::from(SNAPSHOT_PATH),
            }
        }

        fn load_state_from(path: &Path) -> State {
            match std::fs::read(path) {
                Ok(bytes) => match serde_json::from_slice::<State>(&bytes) {
                    Ok(s) => {
                        log::info!("loaded snapshot '{}'", path.display());
                        s
                    }
                    Err(e) => {
                        log::warn!(
                            "failed to parse snapshot '{}': {e}; starting empty",
                            path.display()
                        );
                        State::default()
                    }
                },
                Err(_) => State::default(),
            }
        }

        fn persist(&self) {
            let path = self.snapshot_path.clone();
            if let Ok(bytes) = serde_json::to_vec_pretty(&*self.state.read().unwrap()) {
                if let Some(dir) = path.parent() {
                    let _ = std::fs::create_dir_all(dir);
                }
                if let Err(e) = std::fs::write(&*path, bytes) {
                    log::warn!("failed to write snapshot '{}': {e}", path.display());
                }
            }
        }

        pub fn new() -> Self {
            let snapshot_path = Self::snapshot_path();
            let state = Self::load_state_from(&snapshot_path);
            Self {
                state: Arc::new(RwLock::new(state)),
                snapshot_path: Arc::new(snapshot_path),
            }
        }
    }

    impl Default for InMemRepo {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl ThreadRepo for InMemRepo {
        async fn add_thread(&self, new: NewThread) -> RepoResult<AddedThread> {
            let mut s = self.state.write().unwrap();
            let row = ThreadRow {
                id: fresh_id("thread"),
                title: new.title,
                body: new.body,
                owner: new.owner,
                username: new.username,
                date: Utc::now(),
            };
            let added = AddedThread {
                id: row.id.clone(),
                title: row.title.clone(),
                owner: row.owner.clone(),
            };
            s.threads.insert(row.id.clone(), row);
            drop(s); // release lock before persisting
            self.persist();
            Ok(added)
        }

        async fn get_thread_by_id(&self, id: &str) -> RepoResult<ThreadRecord> {
            let s = self.state.read().unwrap();
            s.threads
                .get(id)
                .map(|t| ThreadRecord {
                    id: t.id.clone(),
                    title: t.title.clone(),
                    body: t.body.clone(),
                    date: t.date,
                    username: t.username.clone(),
                })
                .ok_or(RepoError::NotFound)
        }

        async fn verify_available_thread(&self, id: &str) -> RepoResult<()> {
            let s = self.state.read().unwrap();
            if s.threads.contains_key(id) {
                Ok(())
            } else {
                Err(RepoError::NotFound)
            }
        }
    }

    #[async_trait]
    impl CommentRepo for InMemRepo {
        async fn add_comment(&self, new: NewComment) -> RepoResult<AddedComment> {
            let mut s = self.state.write().unwrap();
            if !s.threads.contains_key(&new.thread_id) {
                return Err(RepoError::NotFound);
            }
            let row = CommentRow {
                id: fresh_id("comment"),
                thread_id: new.thread_id,
                owner: new.owner,
                username: new.username,
                date: Utc::now(),
                content: new.content,
                is_deleted: false,
            };
            let added = AddedComment {
                id: row.id.clone(),
                content: row.content.clone(),
                owner: row.owner.clone(),
            };
            s.comments.insert(row.id.clone(), row);
            drop(s);
            self.persist();
            Ok(added)
        }

        async fn get_comments_by_thread_id(
            &self,
            thread_id: &str,
        ) -> RepoResult<Vec<CommentRecord>> {
            let s = self.state.read().unwrap();
            let mut rows: Vec<_> = s
                .comments
                .values()
                .filter(|c| c.thread_id == thread_id)
                .cloned()
                .collect();
            rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
            Ok(rows
                .into_iter()
                .map(|c| CommentRecord {
                    id: c.id,
                    owner: c.owner,
                    username: c.username,
                    date: c.date,
                    content: c.content,
                    is_deleted: c.is_deleted,
                })
                .collect())
        }

        async fn verify_available_comment_in_thread(
            &self,
            comment_id: &str,
            thread_id: &str,
        ) -> RepoResult<()> {
            let s = self.state.read().unwrap();
            match s.comments.get(comment_id) {
                Some(c) if c.thread_id == thread_id && !c.is_deleted => Ok(()),
                _ => Err(RepoError::NotFound),
            }
        }

        async fn verify_comment_owner(&self, comment_id: &str, owner: &str) -> RepoResult<()> {
            let s = self.state.read().unwrap();
            match s.comments.get(comment_id) {
                None => Err(RepoError::NotFound),
                Some(c) if c.owner != owner => Err(RepoError::Forbidden),
                Some(_) => Ok(()),
            }
        }

        async fn delete_comment_by_id(&self, comment_id: &str) -> RepoResult<()> {
            let mut s = self.state.write().unwrap();
            match s.comments.get_mut(comment_id) {
                Some(c) if !c.is_deleted => c.is_deleted = true,
                // already deleted counts as zero rows affected
                _ => return Err(RepoError::NotFound),
            }
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl ReplyRepo for InMemRepo {
        async fn add_reply(&self, new: NewReply) -> RepoResult<AddedReply> {
            let mut s = self.state.write().unwrap();
            match s.comments.get(&new.comment_id) {
                Some(c) if c.thread_id == new.thread_id => {}
                _ => return Err(RepoError::NotFound),
            }
            let row = ReplyRow {
                id: fresh_id("reply"),
                thread_id: new.thread_id,
                comment_id: new.comment_id,
                owner: new.owner,
                username: new.username,
                date: Utc::now(),
                content: new.content,
                is_deleted: false,
            };
            let added = AddedReply {
                id: row.id.clone(),
                content: row.content.clone(),
                owner: row.owner.clone(),
            };
            s.replies.insert(row.id.clone(), row);
            drop(s);
            self.persist();
            Ok(added)
        }

        async fn get_replies_by_thread_id(&self, thread_id: &str) -> RepoResult<Vec<ReplyRecord>> {
            let s = self.state.read().unwrap();
            let mut rows: Vec<_> = s
                .replies
                .values()
                .filter(|r| r.thread_id == thread_id)
                .cloned()
                .collect();
            rows.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
            Ok(rows
                .into_iter()
                .map(|r| ReplyRecord {
                    id: r.id,
                    comment_id: r.comment_id,
                    owner: r.owner,
                    username: r.username,
                    date: r.date,
                    content: r.content,
                    is_deleted: r.is_deleted,
                })
                .collect())
        }

        async fn verify_available_reply(
            &self,
            thread_id: &str,
            comment_id: &str,
            reply_id: &str,
        ) -> RepoResult<()> {
            let s = self.state.read().unwrap();
            match s.replies.get(reply_id) {
                Some(r)
                    if r.comment_id == comment_id
                        && r.thread_id == thread_id
                        && !r.is_deleted =>
                {
                    Ok(())
                }
                _ => Err(RepoError::NotFound),
            }
        }

        async fn verify_reply_owner(&self, reply_id: &str, owner: &str) -> RepoResult<()> {
            let s = self.state.read().unwrap();
            match s.replies.get(reply_id) {
                None => Err(RepoError::NotFound),
                Some(r) if r.owner != owner => Err(RepoError::Forbidden),
                Some(_) => Ok(()),
            }
        }

        async fn delete_reply_by_id(&self, reply_id: &str) -> RepoResult<()> {
            let mut s = self.state.write().unwrap();
            match s.replies.get_mut(reply_id) {
                Some(r) if !r.is_deleted => r.is_deleted = true,
                _ => return Err(RepoError::NotFound),
            }
            drop(s);
            self.persist();
            Ok(())
        }
    }

    #[async_trait]
    impl LikeRepo for InMemRepo {
        async fn store_like(&self, comment_id: &str, owner: &str) -> RepoResult<()> {
            let mut s = self.state.write().unwrap();
            s.likes.insert((comment_id.to_string(), owner.to_string()));
            drop(s);
            self.persist();
            Ok(())
        }

        async fn like_exists(&self, comment_id: &str, owner: &str) -> RepoResult<bool> {
            let s = self.state.read().unwrap();
            Ok(s.likes
                .contains(&(comment_id.to_string(), owner.to_string())))
        }

        async fn delete_like(&self, comment_id: &str, owner: &str) -> RepoResult<()> {
            let mut s = self.state.write().unwrap();
            s.likes.remove(&(comment_id.to_string(), owner.to_string()));
            drop(s);
            self.persist();
            Ok(())
        }

        async fn like_count(&self, comment_id: &str) -> RepoResult<i64> {
            let s = self.state.read().unwrap();
            Ok(s.likes.iter().filter(|(c, _)| c == comment_id).count() as i64)
        }
    }
}

// Postgres implementation (feature = "postgres-store")
#[cfg(feature = "postgres-store")]
pub mod pg {
    use super::*;
    use sqlx::{Pool, Postgres};

    #[derive(Clone)]
    pub struct PgRepo {
        pool: Pool<Postgres>,
    }

    impl PgRepo {
        pub fn new(pool: Pool<Postgres>) -> Self {
            Self { pool }
        }

        // Users are provisioned by the auth collaborator; keep the username
        // current so read-side joins resolve it.
        async fn upsert_user(
            tx: &mut sqlx::Transaction<'_, Postgres>,
            owner: &str,
            username: &str,
        ) -> RepoResult<()> {
            sqlx::query(
                "INSERT INTO users (id, username) VALUES ($1, $2) \
                 ON CONFLICT (id) DO UPDATE SET username = EXCLUDED.username",
            )
            .bind(owner)
            .bind(username)
            .execute(&mut **tx)
            .await?;
            Ok(())
        }
    }

    #[async_trait]
    impl ThreadRepo for PgRepo {
        async fn add_thread(&self, new: NewThread) -> RepoResult<AddedThread> {
            let id = fresh_id("thread");
            let mut tx = self.pool.begin().await?;
            Self::upsert_user(&mut tx, &new.owner, &new.username).await?;
            let added = sqlx::query_as::<_, AddedThread>(
                "INSERT INTO threads (id, title, body, owner) VALUES ($1, $2, $3, $4) \
                 RETURNING id, title, owner",
            )
            .bind(&id)
            .bind(&new.title)
            .bind(&new.body)
            .bind(&new.owner)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(added)
        }

        async fn get_thread_by_id(&self, id: &str) -> RepoResult<ThreadRecord> {
            sqlx::query_as::<_, ThreadRecord>(
                r#"
                SELECT t.id, t.title, t.body, t.date, COALESCE(u.username, t.owner) AS username
                FROM threads t
                LEFT JOIN users u ON t.owner = u.id
                WHERE t.id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or(RepoError::NotFound)
        }

        async fn verify_available_thread(&self, id: &str) -> RepoResult<()> {
            let row: Option<(i32,)> = sqlx::query_as("SELECT 1 FROM threads WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
            row.map(|_| ()).ok_or(RepoError::NotFound)
        }
    }

    #[async_trait]
    impl CommentRepo for PgRepo {
        async fn add_comment(&self, new: NewComment) -> RepoResult<AddedComment> {
            let id = fresh_id("comment");
            let mut tx = self.pool.begin().await?;
            Self::upsert_user(&mut tx, &new.owner, &new.username).await?;
            let added = sqlx::query_as::<_, AddedComment>(
                "INSERT INTO comments (id, thread_id, owner, content) VALUES ($1, $2, $3, $4) \
                 RETURNING id, content, owner",
            )
            .bind(&id)
            .bind(&new.thread_id)
            .bind(&new.owner)
            .bind(&new.content)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(added)
        }

        async fn get_comments_by_thread_id(
            &self,
            thread_id: &str,
        ) -> RepoResult<Vec<CommentRecord>> {
            let rows = sqlx::query_as::<_, CommentRecord>(
                r#"
                SELECT c.id, c.owner, COALESCE(u.username, c.owner) AS username,
                       c.date, c.content, c.is_deleted
                FROM comments c
                LEFT JOIN users u ON c.owner = u.id
                WHERE c.thread_id = $1
                ORDER BY c.date ASC
                "#,
            )
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn verify_available_comment_in_thread(
            &self,
            comment_id: &str,
            thread_id: &str,
        ) -> RepoResult<()> {
            let row: Option<(i32,)> = sqlx::query_as(
                "SELECT 1 FROM comments WHERE id = $1 AND thread_id = $2 AND is_deleted = FALSE",
            )
            .bind(comment_id)
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;
            row.map(|_| ()).ok_or(RepoError::NotFound)
        }

        async fn verify_comment_owner(&self, comment_id: &str, owner: &str) -> RepoResult<()> {
            let row: Option<(String,)> = sqlx::query_as("SELECT owner FROM comments WHERE id = $1")
                .bind(comment_id)
                .fetch_optional(&self.pool)
                .await?;
            match row {
                None => Err(RepoError::NotFound),
                Some((o,)) if o != owner => Err(RepoError::Forbidden),
                Some(_) => Ok(()),
            }
        }

        async fn delete_comment_by_id(&self, comment_id: &str) -> RepoResult<()> {
            // Single conditional update; re-validates existence so the
            // verify-then-act gap cannot double-delete.
            let res =
                sqlx::query("UPDATE comments SET is_deleted = TRUE WHERE id = $1 AND is_deleted = FALSE")
                    .bind(comment_id)
                    .execute(&self.pool)
                    .await?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ReplyRepo for PgRepo {
        async fn add_reply(&self, new: NewReply) -> RepoResult<AddedReply> {
            let id = fresh_id("reply");
            let mut tx = self.pool.begin().await?;
            Self::upsert_user(&mut tx, &new.owner, &new.username).await?;
            let added = sqlx::query_as::<_, AddedReply>(
                "INSERT INTO replies (id, comment_id, owner, content) VALUES ($1, $2, $3, $4) \
                 RETURNING id, content, owner",
            )
            .bind(&id)
            .bind(&new.comment_id)
            .bind(&new.owner)
            .bind(&new.content)
            .fetch_one(&mut *tx)
            .await?;
            tx.commit().await?;
            Ok(added)
        }

        async fn get_replies_by_thread_id(&self, thread_id: &str) -> RepoResult<Vec<ReplyRecord>> {
            let rows = sqlx::query_as::<_, ReplyRecord>(
                r#"
                SELECT r.id, r.comment_id, r.owner, COALESCE(u.username, r.owner) AS username,
                       r.date, r.content, r.is_deleted
                FROM replies r
                LEFT JOIN users u ON r.owner = u.id
                INNER JOIN comments c ON r.comment_id = c.id
                WHERE c.thread_id = $1
                ORDER BY r.date ASC
                "#,
            )
            .bind(thread_id)
            .fetch_all(&self.pool)
            .await?;
            Ok(rows)
        }

        async fn verify_available_reply(
            &self,
            thread_id: &str,
            comment_id: &str,
            reply_id: &str,
        ) -> RepoResult<()> {
            let row: Option<(i32,)> = sqlx::query_as(
                r#"
                SELECT 1
                FROM replies r
                INNER JOIN comments c ON r.comment_id = c.id
                WHERE r.id = $1
                  AND r.comment_id = $2
                  AND c.thread_id = $3
                  AND r.is_deleted = FALSE
                "#,
            )
            .bind(reply_id)
            .bind(comment_id)
            .bind(thread_id)
            .fetch_optional(&self.pool)
            .await?;
            row.map(|_| ()).ok_or(RepoError::NotFound)
        }

        async fn verify_reply_owner(&self, reply_id: &str, owner: &str) -> RepoResult<()> {
            let row: Option<(String,)> = sqlx::query_as("SELECT owner FROM replies WHERE id = $1")
                .bind(reply_id)
                .fetch_optional(&self.pool)
                .await?;
            match row {
                None => Err(RepoError::NotFound),
                Some((o,)) if o != owner => Err(RepoError::Forbidden),
                Some(_) => Ok(()),
            }
        }

        async fn delete_reply_by_id(&self, reply_id: &str) -> RepoResult<()> {
            let res =
                sqlx::query("UPDATE replies SET is_deleted = TRUE WHERE id = $1 AND is_deleted = FALSE")
                    .bind(reply_id)
                    .execute(&self.pool)
                    .await?;
            if res.rows_affected() == 0 {
                return Err(RepoError::NotFound);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl LikeRepo for PgRepo {
        async fn store_like(&self, comment_id: &str, owner: &str) -> RepoResult<()> {
            // UNIQUE (comment_id, owner) backstops concurrent toggles.
            sqlx::query(
                "INSERT INTO likes (id, comment_id, owner) VALUES ($1, $2, $3) \
                 ON CONFLICT (comment_id, owner) DO NOTHING",
            )
            .bind(fresh_id("like"))
            .bind(comment_id)
            .bind(owner)
            .execute(&self.pool)
            .await?;
            Ok(())
        }

        async fn like_exists(&self, comment_id: &str, owner: &str) -> RepoResult<bool> {
            let row: Option<(i32,)> =
                sqlx::query_as("SELECT 1 FROM likes WHERE comment_id = $1 AND owner = $2")
                    .bind(comment_id)
                    .bind(owner)
                    .fetch_optional(&self.pool)
                    .await?;
            Ok(row.is_some())
        }

        async fn delete_like(&self, comment_id: &str, owner: &str) -> RepoResult<()> {
            sqlx::query("DELETE FROM likes WHERE comment_id = $1 AND owner = $2")
                .bind(comment_id)
                .bind(owner)
                .execute(&self.pool)
                .await?;
            Ok(())
        }

        async fn like_count(&self, comment_id: &str) -> RepoResult<i64> {
            let count: i64 =
                sqlx::query_scalar("SELECT COUNT(*) FROM likes WHERE comment_id = $1")
                    .bind(comment_id)
                    .fetch_one(&self.pool)
                    .await?;
            Ok(count)
        }
    }
}
