use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, HttpResponse,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};
use serde_json::json;

pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => h.to_str().map_err(|_| {
            actix_web::error::ErrorUnauthorized(
                json!({"error": "Invalid Authorization header encoding"}),
            )
        })?,
        None => {
            let resp =
                HttpResponse::Unauthorized().json(json!({"error": "Missing Authorization header"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => {
            let resp = HttpResponse::Unauthorized()
                .json(json!({"error": "Authorization header must start with Bearer"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(e) => {
            let resp = HttpResponse::Unauthorized()
                .json(json!({"error": "Invalid or expired token", "details": e}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    // refresh tokens only work against /auth/refresh and /auth/logout
    if claims.token_type != TokenType::Access {
        let resp = HttpResponse::Unauthorized().json(json!({"error": "Access token required"}));
        return Ok(req.into_response(resp.map_into_boxed_body()));
    }

    let role = match Role::from_id(claims.role) {
        Some(role) => role,
        None => {
            let resp = HttpResponse::Unauthorized().json(json!({"error": "Invalid role"}));
            return Ok(req.into_response(resp.map_into_boxed_body()));
        }
    };

    let auth_user = AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
    };

    req.extensions_mut().insert(auth_user);

    next.call(req).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{generate_access_token, generate_refresh_token};
    use actix_web::{App, HttpResponse, http::StatusCode, middleware::from_fn, test, web};

    fn config() -> Config {
        Config {
            database_url: String::new(),
            jwt_secret: "test-secret".into(),
            server_addr: "127.0.0.1:0".into(),
            access_token_ttl: 60,
            refresh_token_ttl: 60,
            rate_login_per_min: 60,
            rate_refresh_per_min: 60,
            rate_protected_per_min: 60,
            api_prefix: "/api".into(),
            admin_username: None,
            admin_password: None,
            rest_weekday: chrono::Weekday::Sun,
            auto_absence_enabled: false,
            photo_api_base: String::new(),
            photo_bucket: String::new(),
            photo_cache_capacity: 10,
            report_signatory_name: String::new(),
            report_signatory_title: String::new(),
            report_city: String::new(),
        }
    }

    async fn whoami(user: AuthUser) -> HttpResponse {
        HttpResponse::Ok().body(user.username)
    }

    async fn admin_only(user: AuthUser) -> Result<HttpResponse, crate::error::AppError> {
        user.require_admin()?;
        Ok(HttpResponse::Ok().finish())
    }

    macro_rules! app {
        () => {
            test::init_service(
                App::new().app_data(Data::new(config())).service(
                    web::scope("/api")
                        .wrap(from_fn(auth_middleware))
                        .route("/me", web::get().to(whoami))
                        .route("/admin", web::post().to(admin_only)),
                ),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn rejects_missing_and_malformed_tokens() {
        let app = app!();

        let req = test::TestRequest::get().uri("/api/me").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", "Token abc"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn accepts_access_tokens_only() {
        let app = app!();
        let access = generate_access_token(1, "admin".into(), 1, "test-secret", 60).unwrap();
        let (refresh, _) = generate_refresh_token(1, "admin".into(), 1, "test-secret", 60).unwrap();

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {}", access)))
            .to_request();
        let body = test::call_and_read_body(&app, req).await;
        assert_eq!(body, web::Bytes::from_static(b"admin"));

        let req = test::TestRequest::get()
            .uri("/api/me")
            .insert_header(("Authorization", format!("Bearer {}", refresh)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn viewers_cannot_mutate() {
        let app = app!();
        let viewer = generate_access_token(2, "viewer".into(), 2, "test-secret", 60).unwrap();

        let req = test::TestRequest::post()
            .uri("/api/admin")
            .insert_header(("Authorization", format!("Bearer {}", viewer)))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }
}
