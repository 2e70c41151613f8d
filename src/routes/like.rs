use actix_web::{web::Data, HttpRequest, HttpResponse};

use crate::{
    app::{error::AppError, AppState},
    auth::CurrentUser,
    routes::path_id,
    serializers::*,
};

/// Pipe for liking or unliking a post as the caller
/// - url: `{domain}/likes/{post id}/toggle/`
///
/// # Response
/// ## Ok
/// ```
/// { "message": "Like added" }
/// ```
/// or `"Like removed"` when the caller had already liked the post
/// ## Error
/// - Unauthorized
/// - Not found, no such post
pub async fn toggle_like(
    req: HttpRequest,
    user: CurrentUser,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let post_id = path_id(&req, "id")?;
    let outcome = app_state.likes.toggle(user.0.id, post_id)?;

    log::debug!("user {} toggled like on post {}: {:?}", user.0.id, post_id, outcome);
    Ok(HttpResponse::Ok().json(MessageResponse {
        message: outcome.message(),
    }))
}

pub async fn list_likes(_user: CurrentUser, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let likes: Vec<LikeView> = app_state
        .likes
        .list()?
        .into_iter()
        .map(LikeView::from)
        .collect();

    Ok(HttpResponse::Ok().json(likes))
}

/// Pipe for creating a like directly
/// - url: `{domain}/likes/`
///
/// `user` defaults to the caller. Liking the same post twice is a bad request.
pub async fn create_like(
    user: CurrentUser,
    req_body: String,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let new_like = parse_body::<LikePayload>(&req_body)?.into_new(user.0.id)?;
    let like = app_state.likes.create(new_like)?;

    Ok(HttpResponse::Created().json(LikeView::from(like)))
}

pub async fn get_like(
    req: HttpRequest,
    _user: CurrentUser,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let like = app_state.likes.get(path_id(&req, "id")?)?;

    Ok(HttpResponse::Ok().json(LikeView::from(like)))
}

pub async fn delete_like(
    req: HttpRequest,
    _user: CurrentUser,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    app_state.likes.delete(path_id(&req, "id")?)?;

    Ok(HttpResponse::NoContent().finish())
}
