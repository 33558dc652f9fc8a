//! Recipe comments live in a document store outside the relational schema.
//! [`CommentStore`] is the interface this crate consumes; the counts it
//! returns tell "found and modified" apart from "not found".

use std::collections::BTreeMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::error::{ServiceError, ServiceResult};

pub type CommentId = u64;

pub const COMMENT_NOT_FOUND: &str = "Comment not found.";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Comment {
    pub id: CommentId,
    pub recipe_id: i32,
    pub user_id: i32,
    pub text: String,
    pub date: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewComment {
    pub recipe_id: i32,
    pub user_id: i32,
    pub text: String,
}

pub trait CommentStore: Send + Sync {
    fn insert(&self, comment: NewComment) -> ServiceResult<CommentId>;
    fn find_by(&self, recipe_id: i32) -> ServiceResult<Vec<Comment>>;
    fn delete_by_id(&self, id: CommentId) -> ServiceResult<u64>;
    /// Replaces the text and refreshes the timestamp.
    fn update_by_id(&self, id: CommentId, text: &str) -> ServiceResult<u64>;
}

#[derive(Debug, Default)]
struct Documents {
    next_id: CommentId,
    comments: BTreeMap<CommentId, Comment>,
}

#[derive(Debug, Default)]
pub struct InMemoryCommentStore {
    documents: Mutex<Documents>,
}

impl InMemoryCommentStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn with_documents<T>(&self, f: impl FnOnce(&mut Documents) -> T) -> ServiceResult<T> {
        let mut documents = self
            .documents
            .lock()
            .map_err(|_| {
                ServiceError::CommentStore("comment store lock poisoned".to_owned())
            })?;
        Ok(f(&mut documents))
    }
}

impl CommentStore for InMemoryCommentStore {
    fn insert(&self, comment: NewComment) -> ServiceResult<CommentId> {
        self.with_documents(|documents| {
            documents.next_id += 1;
            let id = documents.next_id;
            documents.comments.insert(
                id,
                Comment {
                    id,
                    recipe_id: comment.recipe_id,
                    user_id: comment.user_id,
                    text: comment.text,
                    date: Utc::now(),
                },
            );
            id
        })
    }

    fn find_by(&self, recipe_id: i32) -> ServiceResult<Vec<Comment>> {
        self.with_documents(|documents| {
            documents
                .comments
                .values()
                .filter(|comment| comment.recipe_id == recipe_id)
                .cloned()
                .collect()
        })
    }

    fn delete_by_id(&self, id: CommentId) -> ServiceResult<u64> {
        self.with_documents(|documents| {
            u64::from(documents.comments.remove(&id).is_some())
        })
    }

    fn update_by_id(&self, id: CommentId, text: &str) -> ServiceResult<u64> {
        self.with_documents(|documents| match documents.comments.get_mut(&id) {
            Some(comment) => {
                comment.text = text.to_owned();
                comment.date = Utc::now();
                1
            }
            None => 0,
        })
    }
}

pub struct CommentService {
    store: Box<dyn CommentStore>,
}

impl CommentService {
    pub fn new(store: Box<dyn CommentStore>) -> Self {
        Self { store }
    }

    pub fn add_comment(
        &self,
        recipe_id: i32,
        user_id: i32,
        text: &str,
    ) -> ServiceResult<CommentId> {
        let text = non_empty(text)?;
        let id = self.store.insert(NewComment {
            recipe_id,
            user_id,
            text: text.to_owned(),
        })?;

        debug!(comment_id = id, recipe_id, "Comment added");
        Ok(id)
    }

    pub fn comments_for(&self, recipe_id: i32) -> ServiceResult<Vec<Comment>> {
        self.store.find_by(recipe_id)
    }

    pub fn delete_comment(&self, id: CommentId) -> ServiceResult<()> {
        match self.store.delete_by_id(id)? {
            1 => Ok(()),
            _ => Err(ServiceError::not_found(COMMENT_NOT_FOUND)),
        }
    }

    pub fn update_comment(&self, id: CommentId, text: &str) -> ServiceResult<()> {
        let text = non_empty(text)?;

        match self.store.update_by_id(id, text)? {
            1 => Ok(()),
            _ => Err(ServiceError::not_found(COMMENT_NOT_FOUND)),
        }
    }
}

fn non_empty(text: &str) -> ServiceResult<&str> {
    let text = text.trim();
    if text.is_empty() {
        Err(ServiceError::validation(
            "comment",
            "Comment cannot be empty",
        ))
    } else {
        Ok(text)
    }
}
