//! Wire representations of the entities.
//!
//! Read views are what handlers return, payloads are what they accept. The two
//! directions are separate types: a password can be written but never read
//! back, and an author or user is always taken from the request's identity,
//! never from the body.

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{de::DeserializeOwned, Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::app::error::{AppError, FieldErrors, BLANK, NULL, REQUIRED};
use crate::auth::hash_password;
use crate::database::models::*;

pub const USERNAME_MAX_LENGTH: usize = 150;
pub const TITLE_MAX_LENGTH: usize = 255;

fn utc(time: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&time)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    pub id: i32,
    pub username: String,
}

impl From<&User> for UserView {
    fn from(user: &User) -> Self {
        UserView {
            id: user.id,
            username: user.username.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostView {
    pub id: i32,
    pub author: UserView,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<(BlogPost, User)> for PostView {
    fn from((post, author): (BlogPost, User)) -> Self {
        PostView {
            id: post.id,
            author: UserView::from(&author),
            title: post.title,
            content: post.content,
            created_at: utc(post.created_at),
            updated_at: utc(post.updated_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LikeView {
    pub id: i32,
    pub user: i32,
    pub blog_post: i32,
    pub liked_at: DateTime<Utc>,
}

impl From<Like> for LikeView {
    fn from(like: Like) -> Self {
        LikeView {
            id: like.id,
            user: like.user_id,
            blog_post: like.blog_post_id,
            liked_at: utc(like.liked_at),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentView {
    pub id: i32,
    pub user: UserView,
    pub blog_post: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl From<(Comment, User)> for CommentView {
    fn from((comment, user): (Comment, User)) -> Self {
        CommentView {
            id: comment.id,
            user: UserView::from(&user),
            blog_post: comment.blog_post_id,
            content: comment.content,
            created_at: utc(comment.created_at),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    pub token: String,
    pub user: UserView,
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub token: String,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: &'static str,
}

#[derive(Debug, Serialize)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Serialize)]
pub struct AccessToken {
    pub access: String,
}

/// Parses a request body. An empty body reads as `{}`.
pub fn parse_body<T: DeserializeOwned>(body: &str) -> Result<T, AppError> {
    let body = body.trim();
    if body.is_empty() {
        return Ok(serde_json::from_str("{}")?);
    }
    Ok(serde_json::from_str(body)?)
}

/// Tells an explicit `null` (`Some(None)`) apart from an absent key (`None`,
/// through `#[serde(default)]`).
fn nullable<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "NoneType",
        Value::Bool(_) => "bool",
        Value::Number(n) if n.is_f64() => "float",
        Value::Number(_) => "int",
        Value::String(_) => "str",
        Value::Array(_) => "list",
        Value::Object(_) => "dict",
    }
}

/// Collects per-field messages until every field has been looked at.
#[derive(Default)]
struct Checker {
    errors: FieldErrors,
}

impl Checker {
    fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Requires a present, non-null value; `required == false` lets an absent one through.
    fn present<T>(&mut self, field: &str, value: Option<Option<T>>, required: bool) -> Option<T> {
        match value {
            Some(Some(value)) => Some(value),
            Some(None) => {
                self.add(field, NULL);
                None
            }
            None => {
                if required {
                    self.add(field, REQUIRED);
                }
                None
            }
        }
    }

    /// Non-blank string, kept as sent.
    fn raw_text(&mut self, field: &str, value: Option<Option<String>>, required: bool) -> Option<String> {
        let value = self.present(field, value, required)?;
        if value.trim().is_empty() {
            self.add(field, BLANK);
            return None;
        }
        Some(value)
    }

    /// Non-blank string with surrounding whitespace removed.
    fn text(&mut self, field: &str, value: Option<Option<String>>, required: bool) -> Option<String> {
        self.raw_text(field, value, required)
            .map(|value| value.trim().to_string())
    }

    fn max_length(&mut self, field: &str, value: Option<&str>, max: usize) {
        if value.map_or(false, |v| v.chars().count() > max) {
            self.add(
                field,
                format!("Ensure this field has no more than {} characters.", max),
            );
        }
    }

    /// A primary key, sent either as a number or as a numeric string.
    fn pk(&mut self, field: &str, value: Option<Option<Value>>, required: bool) -> Option<i32> {
        let value = self.present(field, value, required)?;
        let id = match &value {
            Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
            Value::String(s) => s.trim().parse::<i32>().ok(),
            _ => None,
        };
        if id.is_none() {
            let message = match &value {
                Value::Number(n) => format!("Invalid pk \"{}\" - object does not exist.", n),
                other => format!(
                    "Incorrect type. Expected pk value, received {}.",
                    json_type(other)
                ),
            };
            self.add(field, message);
        }
        id
    }

    /// Usernames are not trimmed.
    fn username(&mut self, value: Option<Option<String>>, required: bool) -> Option<String> {
        let username = self.raw_text("username", value, required)?;
        self.max_length("username", Some(&username), USERNAME_MAX_LENGTH);
        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || "@.+-_".contains(c))
        {
            self.add(
                "username",
                "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.",
            );
        }
        Some(username)
    }

    fn finish(self) -> Result<(), AppError> {
        if self.errors.is_empty() {
            return Ok(());
        }
        Err(AppError::Validation(self.errors))
    }
}

/// `{username, password}` as sent to register and the login endpoints.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl Credentials {
    pub fn validate_registration(self) -> Result<(String, String), AppError> {
        let mut check = Checker::default();
        let username = check.username(self.username.map(Some), true);
        let password = check.text("password", self.password.map(Some), true);
        check.finish()?;

        match (username, password) {
            (Some(username), Some(password)) => Ok((username, password)),
            _ => Err(AppError::internal("validated credentials missing a field")),
        }
    }
}

/// Changes to a user. A supplied password is hashed before it reaches the store.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserPayload {
    #[serde(default, deserialize_with = "nullable")]
    pub username: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub password: Option<Option<String>>,
}

impl UserPayload {
    /// `partial` is PATCH semantics: only supplied fields are required to be valid.
    pub fn into_changes(self, partial: bool) -> Result<UserChanges, AppError> {
        let mut check = Checker::default();
        let username = check.username(self.username, !partial);
        let password = check.text("password", self.password, !partial);
        check.finish()?;

        Ok(UserChanges {
            username,
            password: password.as_deref().map(hash_password),
        })
    }
}

/// `{title, content}`. Any `author` field in the body is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostPayload {
    #[serde(default, deserialize_with = "nullable")]
    pub title: Option<Option<String>>,
    #[serde(default, deserialize_with = "nullable")]
    pub content: Option<Option<String>>,
}

impl PostPayload {
    pub fn into_new(self, author_id: i32) -> Result<NewBlogPost, AppError> {
        let mut check = Checker::default();
        let title = check.text("title", self.title, true);
        check.max_length("title", title.as_deref(), TITLE_MAX_LENGTH);
        let content = check.text("content", self.content, true);
        check.finish()?;

        let now = Utc::now().naive_utc();
        Ok(NewBlogPost {
            author_id,
            title: title.unwrap_or_default(),
            content: content.unwrap_or_default(),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn into_changes(self, partial: bool) -> Result<PostChanges, AppError> {
        let mut check = Checker::default();
        let title = check.text("title", self.title, !partial);
        check.max_length("title", title.as_deref(), TITLE_MAX_LENGTH);
        let content = check.text("content", self.content, !partial);
        check.finish()?;

        Ok(PostChanges {
            title,
            content,
            updated_at: Utc::now().naive_utc(),
        })
    }
}

/// `{blog_post, content}`. Any `user` field in the body is ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CommentPayload {
    #[serde(default, deserialize_with = "nullable")]
    pub blog_post: Option<Option<Value>>,
    #[serde(default, deserialize_with = "nullable")]
    pub content: Option<Option<String>>,
}

impl CommentPayload {
    pub fn into_new(self, user_id: i32) -> Result<NewComment, AppError> {
        let mut check = Checker::default();
        let blog_post = check.pk("blog_post", self.blog_post, true);
        let content = check.text("content", self.content, true);
        check.finish()?;

        Ok(NewComment {
            user_id,
            blog_post_id: blog_post.unwrap_or_default(),
            content: content.unwrap_or_default(),
            created_at: Utc::now().naive_utc(),
        })
    }

    /// Only the content of a comment can change.
    pub fn into_changes(self, partial: bool) -> Result<CommentChanges, AppError> {
        let mut check = Checker::default();
        let content = check.text("content", self.content, !partial);
        check.finish()?;

        Ok(CommentChanges { content })
    }
}

/// `{blog_post, user}`, `user` defaulting to the requester.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LikePayload {
    #[serde(default, deserialize_with = "nullable")]
    pub user: Option<Option<Value>>,
    #[serde(default, deserialize_with = "nullable")]
    pub blog_post: Option<Option<Value>>,
}

impl LikePayload {
    pub fn into_new(self, requester_id: i32) -> Result<NewLike, AppError> {
        let mut check = Checker::default();
        let user = check.pk("user", self.user, false);
        let blog_post = check.pk("blog_post", self.blog_post, true);
        check.finish()?;

        Ok(NewLike {
            user_id: user.unwrap_or(requester_id),
            blog_post_id: blog_post.unwrap_or_default(),
            liked_at: Utc::now().naive_utc(),
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RefreshPayload {
    pub refresh: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct VerifyPayload {
    pub token: Option<String>,
}
