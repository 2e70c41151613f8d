use actix_web::{web::Data, HttpRequest, HttpResponse};

use crate::{
    app::{error::AppError, AppState},
    auth::CurrentUser,
    routes::path_id,
    serializers::*,
};

pub async fn list_comments(_user: CurrentUser, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let comments: Vec<CommentView> = app_state
        .comments
        .list()?
        .into_iter()
        .map(CommentView::from)
        .collect();

    Ok(HttpResponse::Ok().json(comments))
}

/// Pipe for commenting on a post
/// - url: `{domain}/comments/`
///
/// # HTTP request requirements
/// ## body
/// - json formatted string containing `blog_post` (a post id) and `content`
///
/// # Response
/// ## Created
/// - the comment, with the caller nested as `user`
/// ## Error
/// - Bad request, missing fields or an unknown post
/// - Unauthorized
pub async fn create_comment(
    user: CurrentUser,
    req_body: String,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let new_comment = parse_body::<CommentPayload>(&req_body)?.into_new(user.0.id)?;
    let comment = app_state.comments.create(new_comment)?;

    Ok(HttpResponse::Created().json(CommentView::from(comment)))
}

pub async fn get_comment(
    req: HttpRequest,
    _user: CurrentUser,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let comment = app_state.comments.get(path_id(&req, "id")?)?;

    Ok(HttpResponse::Ok().json(CommentView::from(comment)))
}

fn update(
    req: &HttpRequest,
    req_body: &str,
    app_state: &AppState,
    partial: bool,
) -> Result<HttpResponse, AppError> {
    let comment_id = path_id(req, "id")?;
    let changes = parse_body::<CommentPayload>(req_body)?.into_changes(partial)?;
    let comment = app_state.comments.update(comment_id, changes)?;

    Ok(HttpResponse::Ok().json(CommentView::from(comment)))
}

pub async fn update_comment(
    req: HttpRequest,
    _user: CurrentUser,
    req_body: String,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    update(&req, &req_body, &app_state, false)
}

pub async fn partial_update_comment(
    req: HttpRequest,
    _user: CurrentUser,
    req_body: String,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    update(&req, &req_body, &app_state, true)
}

pub async fn delete_comment(
    req: HttpRequest,
    user: CurrentUser,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let comment_id = path_id(&req, "id")?;
    app_state.comments.delete(comment_id)?;

    log::info!("comment {} deleted by user {}", comment_id, user.0.id);
    Ok(HttpResponse::NoContent().finish())
}
