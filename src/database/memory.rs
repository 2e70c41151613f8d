use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use super::models::*;
use super::{
    duplicate_like, duplicate_username, invalid_pk, CommentStore, LikeStore, PostStore,
    UserStore,
};
use crate::app::error::AppError;
use crate::auth::token::{generate_key, TokenStore};

#[derive(Default)]
struct Tables {
    users: BTreeMap<i32, User>,
    posts: BTreeMap<i32, BlogPost>,
    likes: BTreeMap<i32, Like>,
    comments: BTreeMap<i32, Comment>,
    /// token key -> user id
    tokens: HashMap<String, i32>,
    /// user id -> token key
    user_tokens: HashMap<i32, String>,
    last_user_id: i32,
    last_post_id: i32,
    last_like_id: i32,
    last_comment_id: i32,
}

impl Tables {
    fn user(&self, id: i32) -> Result<&User, AppError> {
        self.users.get(&id).ok_or(AppError::NotFound)
    }

    fn with_author(&self, post: &BlogPost) -> Result<(BlogPost, User), AppError> {
        Ok((post.clone(), self.user(post.author_id)?.clone()))
    }

    fn with_user(&self, comment: &Comment) -> Result<(Comment, User), AppError> {
        Ok((comment.clone(), self.user(comment.user_id)?.clone()))
    }

    fn username_taken(&self, username: &str, except: Option<i32>) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && Some(u.id) != except)
    }

    fn remove_post(&mut self, post_id: i32) -> bool {
        if self.posts.remove(&post_id).is_none() {
            return false;
        }
        self.likes.retain(|_, like| like.blog_post_id != post_id);
        self.comments.retain(|_, comment| comment.blog_post_id != post_id);
        true
    }
}

/// Keeps every table behind a single mutex, so each operation (including the
/// like toggle) is atomic with respect to every other.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
}

impl MemoryStore {
    pub fn new() -> MemoryStore {
        MemoryStore::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, AppError> {
        self.tables
            .lock()
            .map_err(|e| AppError::Internal(format!("failed to acquire store lock: {}", e)))
    }
}

impl UserStore for MemoryStore {
    fn create(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut tables = self.lock()?;
        if tables.username_taken(&new_user.username, None) {
            return Err(duplicate_username());
        }

        tables.last_user_id += 1;
        let user = User {
            id: tables.last_user_id,
            username: new_user.username,
            password: new_user.password,
        };
        tables.users.insert(user.id, user.clone());

        Ok(user)
    }

    fn find_by_id(&self, id: i32) -> Result<User, AppError> {
        Ok(self.lock()?.user(id)?.clone())
    }

    fn find_by_username(&self, username: &str) -> Result<Option<User>, AppError> {
        let tables = self.lock()?;
        Ok(tables.users.values().find(|u| u.username == username).cloned())
    }

    fn list(&self) -> Result<Vec<User>, AppError> {
        Ok(self.lock()?.users.values().cloned().collect())
    }

    fn update(&self, id: i32, changes: UserChanges) -> Result<User, AppError> {
        let mut tables = self.lock()?;
        if let Some(username) = &changes.username {
            if tables.username_taken(username, Some(id)) {
                return Err(duplicate_username());
            }
        }

        let user = tables.users.get_mut(&id).ok_or(AppError::NotFound)?;
        changes.apply(user);

        Ok(user.clone())
    }

    fn delete(&self, id: i32) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        if tables.users.remove(&id).is_none() {
            return Err(AppError::NotFound);
        }

        let owned_posts: Vec<i32> = tables
            .posts
            .values()
            .filter(|post| post.author_id == id)
            .map(|post| post.id)
            .collect();
        for post_id in owned_posts {
            tables.remove_post(post_id);
        }
        tables.likes.retain(|_, like| like.user_id != id);
        tables.comments.retain(|_, comment| comment.user_id != id);

        Ok(())
    }
}

impl PostStore for MemoryStore {
    fn list(&self) -> Result<Vec<(BlogPost, User)>, AppError> {
        let tables = self.lock()?;
        tables
            .posts
            .values()
            .map(|post| tables.with_author(post))
            .collect()
    }

    fn get(&self, id: i32) -> Result<(BlogPost, User), AppError> {
        let tables = self.lock()?;
        let post = tables.posts.get(&id).ok_or(AppError::NotFound)?;
        tables.with_author(post)
    }

    fn create(&self, new_post: NewBlogPost) -> Result<(BlogPost, User), AppError> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&new_post.author_id) {
            return Err(invalid_pk("author", new_post.author_id));
        }

        tables.last_post_id += 1;
        let post = BlogPost {
            id: tables.last_post_id,
            author_id: new_post.author_id,
            title: new_post.title,
            content: new_post.content,
            created_at: new_post.created_at,
            updated_at: new_post.updated_at,
        };
        tables.posts.insert(post.id, post.clone());

        tables.with_author(&post)
    }

    fn update(&self, id: i32, changes: PostChanges) -> Result<(BlogPost, User), AppError> {
        let mut tables = self.lock()?;
        let post = tables.posts.get_mut(&id).ok_or(AppError::NotFound)?;
        changes.apply(post);
        let post = post.clone();

        tables.with_author(&post)
    }

    fn delete(&self, id: i32) -> Result<(), AppError> {
        let mut tables = self.lock()?;
        if !tables.remove_post(id) {
            return Err(AppError::NotFound);
        }
        Ok(())
    }
}

impl LikeStore for MemoryStore {
    fn list(&self) -> Result<Vec<Like>, AppError> {
        Ok(self.lock()?.likes.values().cloned().collect())
    }

    fn get(&self, id: i32) -> Result<Like, AppError> {
        self.lock()?.likes.get(&id).cloned().ok_or(AppError::NotFound)
    }

    fn create(&self, new_like: NewLike) -> Result<Like, AppError> {
        let mut tables = self.lock()?;
        if !tables.users.contains_key(&new_like.user_id) {
            return Err(invalid_pk("user", new_like.user_id));
        }
        if !tables.posts.contains_key(&new_like.blog_post_id) {
            return Err(invalid_pk("blog_post", new_like.blog_post_id));
        }
        if tables.likes.values().any(|like| {
            like.user_id == new_like.user_id && like.blog_post_id == new_like.blog_post_id
        }) {
            return Err(duplicate_like());
        }

        tables.last_like_id += 1;
        let like = Like {
            id: tables.last_like_id,
            user_id: new_like.user_id,
            blog_post_id: new_like.blog_post_id,
            liked_at: new_like.liked_at,
        };
        tables.likes.insert(like.id, like.clone());

        Ok(like)
    }

    fn delete(&self, id: i32) -> Result<(), AppError> {
        self.lock()?
            .likes
            .remove(&id)
            .map(|_| ())
            .ok_or(AppError::NotFound)
    }

    fn toggle(&self, user_id: i32, blog_post_id: i32) -> Result<LikeToggle, AppError> {
        let mut tables = self.lock()?;
        if !tables.posts.contains_key(&blog_post_id) {
            return Err(AppError::NotFound);
        }

        let existing = tables
            .likes
            .values()
            .find(|like| like.user_id == user_id && like.blog_post_id == blog_post_id)
            .map(|like| like.id);
        if let Some(like_id) = existing {
            tables.likes.remove(&like_id);
            return Ok(LikeToggle::Removed);
        }

        tables.last_like_id += 1;
        let like = Like {
            id: tables.last_like_id,
            user_id,
            blog_post_id,
            liked_at: Utc::now().naive_utc(),
        };
        tables.likes.insert(like.id, like);

        Ok(LikeToggle::Added)
    }
}

impl CommentStore for MemoryStore {
    fn list(&self) -> Result<Vec<(Comment, User)>, AppError> {
        let tables = self.lock()?;
        tables
            .comments
            .values()
            .map(|comment| tables.with_user(comment))
            .collect()
    }

    fn get(&self, id: i32) -> Result<(Comment, User), AppError> {
        let tables = self.lock()?;
        let comment = tables.comments.get(&id).ok_or(AppError::NotFound)?;
        tables.with_user(comment)
    }

    fn create(&self, new_comment: NewComment) -> Result<(Comment, User), AppError> {
        let mut tables = self.lock()?;
        if !tables.posts.contains_key(&new_comment.blog_post_id) {
            return Err(invalid_pk("blog_post", new_comment.blog_post_id));
        }
        if !tables.users.contains_key(&new_comment.user_id) {
            return Err(invalid_pk("user", new_comment.user_id));
        }

        tables.last_comment_id += 1;
        let comment = Comment {
            id: tables.last_comment_id,
            user_id: new_comment.user_id,
            blog_post_id: new_comment.blog_post_id,
            content: new_comment.content,
            created_at: new_comment.created_at,
        };
        tables.comments.insert(comment.id, comment.clone());

        tables.with_user(&comment)
    }

    fn update(&self, id: i32, changes: CommentChanges) -> Result<(Comment, User), AppError> {
        let mut tables = self.lock()?;
        let comment = tables.comments.get_mut(&id).ok_or(AppError::NotFound)?;
        changes.apply(comment);
        let comment = comment.clone();

        tables.with_user(&comment)
    }

    fn delete(&self, id: i32) -> Result<(), AppError> {
        self.lock()?
            .comments
            .remove(&id)
            .map(|_| ())
            .ok_or(AppError::NotFound)
    }
}

impl TokenStore for MemoryStore {
    fn get_or_create(&self, user_id: i32) -> Result<String, AppError> {
        let mut tables = self.lock()?;
        if let Some(key) = tables.user_tokens.get(&user_id) {
            return Ok(key.clone());
        }

        let key = generate_key();
        tables.tokens.insert(key.clone(), user_id);
        tables.user_tokens.insert(user_id, key.clone());

        Ok(key)
    }

    fn user_for(&self, key: &str) -> Result<Option<i32>, AppError> {
        Ok(self.lock()?.tokens.get(key).copied())
    }

    fn delete_for_user(&self, user_id: i32) -> Result<bool, AppError> {
        let mut tables = self.lock()?;
        match tables.user_tokens.remove(&user_id) {
            Some(key) => {
                tables.tokens.remove(&key);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDateTime;
    use pretty_assertions::assert_eq;
    use std::thread;

    fn now() -> NaiveDateTime {
        Utc::now().naive_utc()
    }

    fn new_user(store: &MemoryStore, name: &str) -> User {
        UserStore::create(
            store,
            NewUser {
                username: name.to_string(),
                password: "sha256$salt$digest".to_string(),
            },
        )
        .unwrap()
    }

    fn new_post(store: &MemoryStore, author: &User) -> BlogPost {
        PostStore::create(
            store,
            NewBlogPost {
                author_id: author.id,
                title: "Test title".to_string(),
                content: "Test body".to_string(),
                created_at: now(),
                updated_at: now(),
            },
        )
        .unwrap()
        .0
    }

    #[test]
    fn test_duplicate_username_rejected() {
        let store = MemoryStore::new();
        new_user(&store, "alice");

        let second = UserStore::create(
            &store,
            NewUser {
                username: "alice".to_string(),
                password: "x".to_string(),
            },
        );

        assert!(matches!(second, Err(AppError::Validation(_))));
        assert_eq!(UserStore::list(&store).unwrap().len(), 1);
    }

    #[test]
    fn test_toggle_alternates() {
        let store = MemoryStore::new();
        let alice = new_user(&store, "alice");
        let post = new_post(&store, &alice);

        assert_eq!(store.toggle(alice.id, post.id).unwrap(), LikeToggle::Added);
        assert_eq!(store.toggle(alice.id, post.id).unwrap(), LikeToggle::Removed);
        assert_eq!(store.toggle(alice.id, post.id).unwrap(), LikeToggle::Added);
        assert_eq!(LikeStore::list(&store).unwrap().len(), 1);
    }

    #[test]
    fn test_toggle_unknown_post() {
        let store = MemoryStore::new();
        let alice = new_user(&store, "alice");

        assert!(matches!(store.toggle(alice.id, 42), Err(AppError::NotFound)));
    }

    #[test]
    fn test_concurrent_toggles_keep_at_most_one_like() {
        let store = MemoryStore::new();
        let alice = new_user(&store, "alice");
        let post = new_post(&store, &alice);

        let toggles = 25;
        thread::scope(|scope| {
            for _ in 0..toggles {
                let store = store.clone();
                scope.spawn(move || {
                    store.toggle(alice.id, post.id).unwrap();
                    let count = LikeStore::list(&store)
                        .unwrap()
                        .iter()
                        .filter(|l| l.user_id == alice.id && l.blog_post_id == post.id)
                        .count();
                    assert!(count <= 1);
                });
            }
        });

        assert_eq!(LikeStore::list(&store).unwrap().len(), toggles % 2);
    }

    #[test]
    fn test_like_create_rejects_duplicate_pair() {
        let store = MemoryStore::new();
        let alice = new_user(&store, "alice");
        let post = new_post(&store, &alice);
        let like = NewLike {
            user_id: alice.id,
            blog_post_id: post.id,
            liked_at: now(),
        };

        LikeStore::create(&store, like.clone()).unwrap();

        assert!(matches!(
            LikeStore::create(&store, like),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_user_delete_cascades() {
        let store = MemoryStore::new();
        let alice = new_user(&store, "alice");
        let bob = new_user(&store, "bob");
        let alice_post = new_post(&store, &alice);
        let bob_post = new_post(&store, &bob);

        store.toggle(bob.id, alice_post.id).unwrap();
        store.toggle(alice.id, bob_post.id).unwrap();
        CommentStore::create(
            &store,
            NewComment {
                user_id: alice.id,
                blog_post_id: bob_post.id,
                content: "nice".to_string(),
                created_at: now(),
            },
        )
        .unwrap();
        CommentStore::create(
            &store,
            NewComment {
                user_id: bob.id,
                blog_post_id: alice_post.id,
                content: "thanks".to_string(),
                created_at: now(),
            },
        )
        .unwrap();

        UserStore::delete(&store, alice.id).unwrap();

        let posts = PostStore::list(&store).unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].0.id, bob_post.id);
        assert!(LikeStore::list(&store).unwrap().is_empty());
        assert!(CommentStore::list(&store).unwrap().is_empty());
    }

    #[test]
    fn test_token_reused_until_deleted() {
        let store = MemoryStore::new();
        let alice = new_user(&store, "alice");

        let first = store.get_or_create(alice.id).unwrap();
        let second = store.get_or_create(alice.id).unwrap();
        assert_eq!(first, second);
        assert_eq!(store.user_for(&first).unwrap(), Some(alice.id));

        assert!(store.delete_for_user(alice.id).unwrap());
        assert!(!store.delete_for_user(alice.id).unwrap());
        assert_eq!(store.user_for(&first).unwrap(), None);
    }
}
