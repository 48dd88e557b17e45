//! In-memory entity storage.
//!
//! Users and posts live in concurrent maps shared by every request. There is no
//! persistence and no transactional guarantee across maps.

pub mod models;

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

pub use models::{NewPost, NewUser, Post, User, ValidPost, ValidUser};

/// A thread-safe store for users and posts.
#[derive(Clone, Default)]
pub struct Store {
    users: Arc<DashMap<String, User>>,
    posts: Arc<DashMap<String, Post>>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_user(&self, user: ValidUser) -> User {
        let user = User {
            id: Uuid::new_v4().to_string(),
            username: user.username,
            email: user.email,
            age: user.age,
            created_at: Utc::now(),
        };
        self.users.insert(user.id.clone(), user.clone());
        user
    }

    pub fn get_user(&self, id: &str) -> Option<User> {
        self.users.get(id).map(|r| r.value().clone())
    }

    pub fn user_exists(&self, id: &str) -> bool {
        self.users.contains_key(id)
    }

    /// All users, oldest first.
    pub fn list_users(&self) -> Vec<User> {
        let mut users: Vec<User> = self.users.iter().map(|r| r.value().clone()).collect();
        users.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        users
    }

    /// Insert a post. The caller checks that the author exists.
    pub fn insert_post(&self, post: ValidPost) -> Post {
        let post = Post {
            id: Uuid::new_v4().to_string(),
            user_id: post.user_id,
            title: post.title,
            content: post.content,
            created_at: Utc::now(),
        };
        self.posts.insert(post.id.clone(), post.clone());
        post
    }

    /// Posts, oldest first, optionally restricted to one author.
    pub fn list_posts(&self, user_id: Option<&str>) -> Vec<Post> {
        let mut posts: Vec<Post> = self
            .posts
            .iter()
            .filter(|r| user_id.map_or(true, |id| r.value().user_id == id))
            .map(|r| r.value().clone())
            .collect();
        posts.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        posts
    }
}
