pub mod blog;
pub mod comment;
pub mod like;
pub mod token;
pub mod user;

use actix_web::{web, HttpRequest};

use crate::app::error::AppError;

/// The route table. Fixed paths are registered before the `{id}` patterns
/// sharing their prefix.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        //User routes
        .service(web::resource("/users/register/").route(web::post().to(user::register)))
        .service(web::resource("/users/login/").route(web::post().to(user::login)))
        .service(web::resource("/users/logout/").route(web::post().to(user::logout)))
        .service(web::resource("/users/").route(web::get().to(user::list_users)))
        .service(
            web::resource("/users/{id}/")
                .route(web::get().to(user::get_user))
                .route(web::put().to(user::update_user))
                .route(web::patch().to(user::partial_update_user))
                .route(web::delete().to(user::delete_user)),
        )
        //Blog post routes
        .service(
            web::resource("/posts/")
                .route(web::get().to(blog::list_posts))
                .route(web::post().to(blog::create_post)),
        )
        .service(
            web::resource("/posts/{id}/")
                .route(web::get().to(blog::get_post))
                .route(web::put().to(blog::update_post))
                .route(web::patch().to(blog::partial_update_post))
                .route(web::delete().to(blog::delete_post)),
        )
        //Like routes
        .service(web::resource("/likes/{id}/toggle/").route(web::post().to(like::toggle_like)))
        .service(
            web::resource("/likes/")
                .route(web::get().to(like::list_likes))
                .route(web::post().to(like::create_like)),
        )
        .service(
            web::resource("/likes/{id}/")
                .route(web::get().to(like::get_like))
                .route(web::delete().to(like::delete_like)),
        )
        //Comment routes
        .service(
            web::resource("/comments/")
                .route(web::get().to(comment::list_comments))
                .route(web::post().to(comment::create_comment)),
        )
        .service(
            web::resource("/comments/{id}/")
                .route(web::get().to(comment::get_comment))
                .route(web::put().to(comment::update_comment))
                .route(web::patch().to(comment::partial_update_comment))
                .route(web::delete().to(comment::delete_comment)),
        )
        //Token routes
        .service(web::resource("/token/").route(web::post().to(token::obtain_pair)))
        .service(web::resource("/token/refresh/").route(web::post().to(token::refresh)))
        .service(web::resource("/token/verify/").route(web::post().to(token::verify)));
}

/// Reads an integer id from the path. Anything that is not one names no entity.
pub(crate) fn path_id(req: &HttpRequest, name: &str) -> Result<i32, AppError> {
    req.match_info()
        .query(name)
        .parse::<i32>()
        .map_err(|_| AppError::NotFound)
}

#[cfg(test)]
pub(crate) mod test_utils {
    use crate::app::AppState;

    /// Builds the full application around `$state` for `actix_web::test` calls.
    macro_rules! init_app {
        ($state:expr) => {
            actix_web::test::init_service(
                actix_web::App::new()
                    .app_data(actix_web::web::Data::new($state.clone()))
                    .configure(crate::routes::configure),
            )
            .await
        };
    }
    pub(crate) use init_app;

    pub fn bearer(token: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {}", token))
    }

    /// Registers a user straight through the auth module and returns their token.
    pub fn registered(state: &AppState, username: &str) -> (i32, String) {
        let (user, token) = crate::auth::register(
            state,
            crate::serializers::Credentials {
                username: Some(username.to_string()),
                password: Some("secret".to_string()),
            },
        )
        .unwrap();
        (user.id, token)
    }
}
