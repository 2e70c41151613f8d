use actix_web::{web::Data, HttpRequest, HttpResponse};

use crate::{
    app::{error::AppError, AppState},
    auth::CurrentUser,
    routes::path_id,
    serializers::*,
};

/// Pipe for listing every blog post with its author
/// - url: `{domain}/posts/`
pub async fn list_posts(_user: CurrentUser, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let posts: Vec<PostView> = app_state
        .posts
        .list()?
        .into_iter()
        .map(PostView::from)
        .collect();

    Ok(HttpResponse::Ok().json(posts))
}

/// Pipe for creating a blog post
/// - url: `{domain}/posts/`
///
/// # HTTP request requirements
/// ## body
/// - json formatted string containing `title` and `content` keys
///
/// The author is always the caller, an `author` key in the body is ignored.
///
/// # Response
/// ## Created
/// - the new post with the author nested
/// ## Error
/// - Bad request, with the offending fields as keys
/// - Unauthorized
pub async fn create_post(
    user: CurrentUser,
    req_body: String,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let new_post = parse_body::<PostPayload>(&req_body)?.into_new(user.0.id)?;
    let post = app_state.posts.create(new_post)?;

    log::debug!("user {} created post {}", user.0.id, post.0.id);
    Ok(HttpResponse::Created().json(PostView::from(post)))
}

pub async fn get_post(
    req: HttpRequest,
    _user: CurrentUser,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let post = app_state.posts.get(path_id(&req, "id")?)?;

    Ok(HttpResponse::Ok().json(PostView::from(post)))
}

fn update(
    req: &HttpRequest,
    req_body: &str,
    app_state: &AppState,
    partial: bool,
) -> Result<HttpResponse, AppError> {
    let post_id = path_id(req, "id")?;
    let changes = parse_body::<PostPayload>(req_body)?.into_changes(partial)?;
    let post = app_state.posts.update(post_id, changes)?;

    Ok(HttpResponse::Ok().json(PostView::from(post)))
}

/// Pipe for replacing the title and content of a post
/// - url: `{domain}/posts/{id}/`
pub async fn update_post(
    req: HttpRequest,
    _user: CurrentUser,
    req_body: String,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    update(&req, &req_body, &app_state, false)
}

/// Same as [`update_post`] but every field is optional.
pub async fn partial_update_post(
    req: HttpRequest,
    _user: CurrentUser,
    req_body: String,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    update(&req, &req_body, &app_state, true)
}

/// Pipe for deleting a post along with its likes and comments
/// - url: `{domain}/posts/{id}/`
pub async fn delete_post(
    req: HttpRequest,
    user: CurrentUser,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let post_id = path_id(&req, "id")?;
    app_state.posts.delete(post_id)?;

    log::info!("post {} deleted by user {}", post_id, user.0.id);
    Ok(HttpResponse::NoContent().finish())
}
