use actix_web::{web::Data, HttpRequest, HttpResponse};

use crate::{
    app::{error::AppError, AppState},
    auth::{self, CurrentUser},
    routes::path_id,
    serializers::*,
};

/// Pipe for registering a new user
/// - url: `{domain}/users/register/`
///
/// # HTTP request requirements
/// ## body
/// - json formatted string containing `username` and `password` keys
///
/// # Response
/// ## Created
/// - the login token and the public view of the new user
/// ```
/// { "token": "mF3k...", "user": { "id": 1, "username": "alice" } }
/// ```
/// ## Error
/// - Bad request, with the offending fields as keys
pub async fn register(req_body: String, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let credentials = parse_body::<Credentials>(&req_body)?;
    let (user, token) = auth::register(&app_state, credentials)?;

    Ok(HttpResponse::Created().json(RegisterResponse {
        token,
        user: UserView::from(&user),
    }))
}

/// Pipe for logging in as user
/// - url: `{domain}/users/login/`
///
/// # HTTP request requirements
/// ## body
/// - json formatted string containing `username` and `password` keys
///
/// # Response
/// ## Ok
/// - `{ "token": ... }`, the same token on every login until logout
/// ## Error
/// - Bad request, wrong password
/// - Not found, unknown username
pub async fn login(req_body: String, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let credentials = parse_body::<Credentials>(&req_body)?;
    let token = auth::login(&app_state, credentials)?;

    Ok(HttpResponse::Ok().json(TokenResponse { token }))
}

/// Pipe for deleting the caller's login token
/// - url: `{domain}/users/logout/`
///
/// # Response
/// ## Ok
/// ## Error
/// - Unauthorized
/// - Not found, the caller holds no token (authenticated by JWT)
pub async fn logout(user: CurrentUser, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    auth::logout(&app_state, &user.0)?;

    Ok(HttpResponse::Ok().json(MessageResponse {
        message: "Logged out successfully",
    }))
}

pub async fn list_users(_user: CurrentUser, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let users: Vec<UserView> = app_state.users.list()?.iter().map(UserView::from).collect();

    Ok(HttpResponse::Ok().json(users))
}

pub async fn get_user(
    req: HttpRequest,
    _user: CurrentUser,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user = app_state.users.find_by_id(path_id(&req, "id")?)?;

    Ok(HttpResponse::Ok().json(UserView::from(&user)))
}

fn update(
    req: &HttpRequest,
    req_body: &str,
    app_state: &AppState,
    partial: bool,
) -> Result<HttpResponse, AppError> {
    let user_id = path_id(req, "id")?;
    let changes = parse_body::<UserPayload>(req_body)?.into_changes(partial)?;
    let user = app_state.users.update(user_id, changes)?;

    Ok(HttpResponse::Ok().json(UserView::from(&user)))
}

/// Pipe for replacing a user's username and password
/// - url: `{domain}/users/{id}/`
///
/// Any authenticated caller may edit any user.
pub async fn update_user(
    req: HttpRequest,
    _user: CurrentUser,
    req_body: String,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    update(&req, &req_body, &app_state, false)
}

pub async fn partial_update_user(
    req: HttpRequest,
    _user: CurrentUser,
    req_body: String,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    update(&req, &req_body, &app_state, true)
}

/// Pipe for deleting a user, also deletes everything the user owns and their token
/// - url: `{domain}/users/{id}/`
///
/// # Response
/// ## No content
/// ## Error
/// - Unauthorized
/// - Not found
pub async fn delete_user(
    req: HttpRequest,
    user: CurrentUser,
    app_state: Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let user_id = path_id(&req, "id")?;

    app_state.users.delete(user_id)?;
    app_state.tokens.delete_for_user(user_id)?;

    log::info!("user {} deleted by user {}", user_id, user.0.id);
    Ok(HttpResponse::NoContent().finish())
}
