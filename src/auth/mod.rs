//! Credentials, login tokens and resolving a request to the user behind it.

pub mod jwt;
pub mod token;

use actix_web::{dev::Payload, http::header::Header, web::Data, FromRequest, HttpRequest};
use actix_web_httpauth::headers::authorization::{Authorization, Bearer};
use futures::future::{ready, Ready};
use rand::distributions::{Alphanumeric, DistString};
use sha256::digest;

use crate::app::{error::AppError, AppState};
use crate::database::duplicate_username;
use crate::database::models::{NewUser, User};
use crate::serializers::Credentials;
use jwt::TokenType;

pub const NO_CREDENTIALS: &str = "Authentication credentials were not provided.";
pub const INVALID_TOKEN: &str = "Invalid token.";

const HASH_SCHEME: &str = "sha256";
const SALT_LENGTH: usize = 16;

/// Salts and digests a password, producing `sha256$<salt>$<hex digest>`.
pub fn hash_password(password: &str) -> String {
    let salt = Alphanumeric.sample_string(&mut rand::thread_rng(), SALT_LENGTH);
    let hashed = digest(format!("{}{}", salt, password));

    format!("{}${}${}", HASH_SCHEME, salt, hashed)
}

/// Checks a plaintext password against a value produced by [`hash_password`].
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.splitn(3, '$');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(HASH_SCHEME), Some(salt), Some(expected)) => {
            digest(format!("{}{}", salt, password)) == expected
        }
        _ => false,
    }
}

/// Creates the user and hands out their first token.
pub fn register(state: &AppState, credentials: Credentials) -> Result<(User, String), AppError> {
    let (username, password) = credentials.validate_registration()?;

    if state.users.find_by_username(&username)?.is_some() {
        return Err(duplicate_username());
    }
    let user = state.users.create(NewUser {
        username,
        password: hash_password(&password),
    })?;
    let token = state.tokens.get_or_create(user.id)?;

    log::info!("registered user {} ({})", user.username, user.id);
    Ok((user, token))
}

/// Looks a user up by name and checks the password.
///
/// Unknown (or missing) usernames are [`AppError::NotFound`], a wrong (or
/// missing) password is [`AppError::InvalidCredentials`].
pub fn verify_credentials(state: &AppState, credentials: Credentials) -> Result<User, AppError> {
    let username = credentials.username.ok_or(AppError::NotFound)?;
    let user = state
        .users
        .find_by_username(&username)?
        .ok_or(AppError::NotFound)?;

    let password = credentials.password.unwrap_or_default();
    if !verify_password(&password, &user.password) {
        log::warn!("failed login for user {}", user.id);
        return Err(AppError::InvalidCredentials);
    }

    Ok(user)
}

/// Returns the user's existing token, or a new one if they have none.
pub fn login(state: &AppState, credentials: Credentials) -> Result<String, AppError> {
    let user = verify_credentials(state, credentials)?;
    let token = state.tokens.get_or_create(user.id)?;

    log::info!("user {} logged in", user.id);
    Ok(token)
}

/// Deletes the user's token. Fails with [`AppError::NotFound`] if there is none.
pub fn logout(state: &AppState, user: &User) -> Result<(), AppError> {
    if !state.tokens.delete_for_user(user.id)? {
        return Err(AppError::NotFound);
    }

    log::info!("user {} logged out", user.id);
    Ok(())
}

/// Resolves a bearer credential to a user.
///
/// Opaque login tokens are tried first, then access JWTs. Refresh JWTs are
/// never accepted as credentials.
pub fn authenticate(state: &AppState, token: &str) -> Result<User, AppError> {
    let user_id = match state.tokens.user_for(token)? {
        Some(user_id) => user_id,
        None => {
            state
                .jwt
                .decode_as(token, TokenType::Access)
                .map_err(|_| AppError::Unauthorized(INVALID_TOKEN))?
                .user_id
        }
    };

    state.users.find_by_id(user_id).map_err(|err| match err {
        AppError::NotFound => AppError::Unauthorized(INVALID_TOKEN),
        other => other,
    })
}

/// The authenticated user making the request.
///
/// Taking this as a handler argument makes the endpoint require an
/// `Authorization: Bearer <token>` header.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl CurrentUser {
    fn from_http(req: &HttpRequest) -> Result<CurrentUser, AppError> {
        let state = req
            .app_data::<Data<AppState>>()
            .ok_or_else(|| AppError::internal("application state not configured"))?;

        let header = Authorization::<Bearer>::parse(req)
            .map_err(|_| AppError::Unauthorized(NO_CREDENTIALS))?;
        let bearer = header.into_scheme();

        authenticate(state, bearer.token()).map(CurrentUser)
    }
}

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(CurrentUser::from_http(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn credentials(username: &str, password: &str) -> Credentials {
        Credentials {
            username: Some(username.to_string()),
            password: Some(password.to_string()),
        }
    }

    #[test]
    fn test_password_hash_is_salted() {
        let first = hash_password("secret");
        let second = hash_password("secret");

        assert_ne!(first, second);
        assert!(first.starts_with("sha256$"));
        assert!(!first.contains("secret"));
        assert!(verify_password("secret", &first));
        assert!(verify_password("secret", &second));
        assert!(!verify_password("wrong", &first));
    }

    #[test]
    fn test_verify_rejects_unknown_format() {
        assert!(!verify_password("secret", "secret"));
        assert!(!verify_password("secret", "md5$salt$abc"));
    }

    #[test]
    fn test_register_then_login_reuses_token() {
        let state = AppState::for_tests();
        let (user, token) = register(&state, credentials("alice", "secret")).unwrap();

        assert_eq!(user.username, "alice");
        assert_eq!(login(&state, credentials("alice", "secret")).unwrap(), token);
        assert_eq!(authenticate(&state, &token).unwrap().id, user.id);
    }

    #[test]
    fn test_register_duplicate_username() {
        let state = AppState::for_tests();
        register(&state, credentials("alice", "secret")).unwrap();

        let err = register(&state, credentials("alice", "other")).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(state.users.list().unwrap().len(), 1);
    }

    #[test]
    fn test_login_failures() {
        let state = AppState::for_tests();
        register(&state, credentials("alice", "secret")).unwrap();

        assert!(matches!(
            login(&state, credentials("alice", "wrong")),
            Err(AppError::InvalidCredentials)
        ));
        assert!(matches!(
            login(&state, credentials("bob", "secret")),
            Err(AppError::NotFound)
        ));
    }

    #[test]
    fn test_logout_revokes_token() {
        let state = AppState::for_tests();
        let (user, token) = register(&state, credentials("alice", "secret")).unwrap();

        logout(&state, &user).unwrap();

        assert!(matches!(
            authenticate(&state, &token),
            Err(AppError::Unauthorized(INVALID_TOKEN))
        ));
        assert!(matches!(logout(&state, &user), Err(AppError::NotFound)));
    }

    #[test]
    fn test_authenticate_with_jwt() {
        let state = AppState::for_tests();
        let (user, _) = register(&state, credentials("alice", "secret")).unwrap();

        let access = state.jwt.issue(user.id, TokenType::Access).unwrap();
        let refresh = state.jwt.issue(user.id, TokenType::Refresh).unwrap();

        assert_eq!(authenticate(&state, &access).unwrap().id, user.id);
        assert!(matches!(
            authenticate(&state, &refresh),
            Err(AppError::Unauthorized(_))
        ));
    }
}
