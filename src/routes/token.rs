use actix_web::{web::Data, HttpResponse};
use serde_json::json;

use crate::{
    app::{error::AppError, AppState},
    auth::{self, jwt::TokenType},
    serializers::*,
};

const NO_ACTIVE_ACCOUNT: &str = "No active account found with the given credentials";

/// Pipe for obtaining an access/refresh JWT pair
/// - url: `{domain}/token/`
///
/// # HTTP request requirements
/// ## body
/// - json formatted string containing `username` and `password` keys
///
/// # Response
/// ## Ok
/// ```
/// { "access": "eyJ...", "refresh": "eyJ..." }
/// ```
/// ## Error
/// - Unauthorized, on any credential mismatch
pub async fn obtain_pair(req_body: String, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let credentials = parse_body::<Credentials>(&req_body)?;
    let user = auth::verify_credentials(&app_state, credentials).map_err(|err| match err {
        AppError::NotFound | AppError::InvalidCredentials => AppError::Unauthorized(NO_ACTIVE_ACCOUNT),
        other => other,
    })?;

    Ok(HttpResponse::Ok().json(TokenPair {
        access: app_state.jwt.issue(user.id, TokenType::Access)?,
        refresh: app_state.jwt.issue(user.id, TokenType::Refresh)?,
    }))
}

/// Pipe for trading a refresh token for a new access token
/// - url: `{domain}/token/refresh/`
pub async fn refresh(req_body: String, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let token = parse_body::<RefreshPayload>(&req_body)?
        .refresh
        .ok_or_else(|| AppError::field("refresh", crate::app::error::REQUIRED))?;
    let claims = app_state.jwt.decode_as(&token, TokenType::Refresh)?;

    Ok(HttpResponse::Ok().json(AccessToken {
        access: app_state.jwt.issue(claims.user_id, TokenType::Access)?,
    }))
}

/// Answers `{}` when the token is a valid JWT of either type.
pub async fn verify(req_body: String, app_state: Data<AppState>) -> Result<HttpResponse, AppError> {
    let token = parse_body::<VerifyPayload>(&req_body)?
        .token
        .ok_or_else(|| AppError::field("token", crate::app::error::REQUIRED))?;
    app_state.jwt.decode(&token)?;

    Ok(HttpResponse::Ok().json(json!({})))
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    use crate::app::AppState;
    use crate::routes::test_utils::{bearer, init_app, registered};

    #[actix_rt::test]
    async fn test_obtain_refresh_verify() {
        let state = AppState::for_tests();
        let app = init_app!(state);
        registered(&state, "alice");

        let req = test::TestRequest::post()
            .uri("/token/")
            .set_json(json!({ "username": "alice", "password": "secret" }))
            .to_request();
        let pair: Value = test::call_and_read_body_json(&app, req).await;
        let access = pair["access"].as_str().unwrap().to_string();
        let refresh = pair["refresh"].as_str().unwrap().to_string();

        let req = test::TestRequest::post()
            .uri("/token/refresh/")
            .set_json(json!({ "refresh": refresh }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert!(body["access"].is_string());

        for token in [&access, &refresh] {
            let req = test::TestRequest::post()
                .uri("/token/verify/")
                .set_json(json!({ "token": token }))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::OK);
            let body: Value = test::read_body_json(resp).await;
            assert_eq!(body, json!({}));
        }

        let req = test::TestRequest::get()
            .uri("/posts/")
            .insert_header(bearer(&access))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::OK);
    }

    #[actix_rt::test]
    async fn test_obtain_pair_bad_credentials() {
        let state = AppState::for_tests();
        let app = init_app!(state);
        registered(&state, "alice");

        for body in [
            json!({ "username": "alice", "password": "wrong" }),
            json!({ "username": "nobody", "password": "secret" }),
        ] {
            let req = test::TestRequest::post()
                .uri("/token/")
                .set_json(body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

            let body: Value = test::read_body_json(resp).await;
            assert_eq!(
                body,
                json!({ "detail": "No active account found with the given credentials" })
            );
        }
    }

    #[actix_rt::test]
    async fn test_access_token_cannot_refresh() {
        let state = AppState::for_tests();
        let app = init_app!(state);
        let (user_id, _) = registered(&state, "alice");
        let access = state
            .jwt
            .issue(user_id, crate::auth::jwt::TokenType::Access)
            .unwrap();

        let req = test::TestRequest::post()
            .uri("/token/refresh/")
            .set_json(json!({ "refresh": access }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["code"], "token_not_valid");
    }

    #[actix_rt::test]
    async fn test_verify_garbage() {
        let state = AppState::for_tests();
        let app = init_app!(state);

        let req = test::TestRequest::post()
            .uri("/token/verify/")
            .set_json(json!({ "token": "not.a.jwt" }))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::UNAUTHORIZED
        );

        let req = test::TestRequest::post()
            .uri("/token/verify/")
            .set_json(json!({}))
            .to_request();
        assert_eq!(
            test::call_service(&app, req).await.status(),
            StatusCode::BAD_REQUEST
        );
    }
}
