use crate::{
    api::{attendance, device, employee, holiday, import, report, working_hours},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> anyhow::Result<Governor<PeerIpKeyExtractor, NoOpMiddleware>> {
    let requests_per_min = requests_per_min.max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond((60_000 / requests_per_min as u64).max(1))
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .ok_or_else(|| anyhow::anyhow!("invalid rate limit: {} per minute", requests_per_min))?;
    Ok(Governor::new(&cfg))
}

/// Rate limiters for the route groups, built once at startup.
#[derive(Clone)]
pub struct Limiters {
    login: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    refresh: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
    protected: Arc<Governor<PeerIpKeyExtractor, NoOpMiddleware>>,
}

impl Limiters {
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            login: Arc::new(build_limiter(config.rate_login_per_min)?),
            refresh: Arc::new(build_limiter(config.rate_refresh_per_min)?),
            protected: Arc::new(build_limiter(config.rate_protected_per_min)?),
        })
    }
}

pub fn configure(cfg: &mut web::ServiceConfig, config: &Config, limiters: &Limiters) {
    // Public routes
    cfg.service(
        web::scope("/auth")
            .service(
                web::resource("/login")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(limiters.refresh.clone())
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(limiters.login.clone())
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(&config.api_prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(limiters.protected.clone()) // rate limiting
            .route("/session", web::get().to(handlers::session))
            .route("/dashboard", web::get().to(attendance::dashboard))
            .service(
                web::scope("/employees")
                    .service(
                        web::resource("")
                            .route(web::get().to(employee::list_employees))
                            .route(web::post().to(employee::create_employee)),
                    )
                    // before /{uid}
                    .route("/positions", web::get().to(employee::list_positions))
                    .service(
                        web::resource("/{uid}")
                            .route(web::get().to(employee::get_employee))
                            .route(web::put().to(employee::update_employee))
                            .route(web::delete().to(employee::delete_employee)),
                    ),
            )
            .service(
                web::scope("/attendance")
                    .route("", web::get().to(attendance::list_attendance))
                    .route("/audit", web::get().to(attendance::audit_day))
                    .route("/auto-absence", web::post().to(attendance::run_auto_absence))
                    .route(
                        "/{date}/{uid}/absence-details",
                        web::put().to(attendance::update_absence_details),
                    )
                    .route(
                        "/{date}/{uid}/photo/{direction}",
                        web::get().to(attendance::photo_url),
                    ),
            )
            .service(
                web::scope("/holidays")
                    .service(
                        web::resource("")
                            .route(web::get().to(holiday::list_holidays))
                            .route(web::post().to(holiday::create_holiday)),
                    )
                    .route("/{id}", web::delete().to(holiday::delete_holiday)),
            )
            .service(
                web::scope("/working-hours")
                    .route("", web::get().to(working_hours::get_working_hours))
                    .route("/check-in", web::put().to(working_hours::save_check_in))
                    .route("/check-out", web::put().to(working_hours::save_check_out))
                    .route("/autocek", web::put().to(working_hours::save_autocek)),
            )
            .service(
                web::scope("/unregistered-uids")
                    .service(
                        web::resource("")
                            .route(web::get().to(device::list_unregistered))
                            .route(web::post().to(device::register_tap)),
                    )
                    .route("/{uid}", web::delete().to(device::discard_unregistered)),
            )
            .route("/reports/attendance", web::get().to(report::attendance_report))
            .route("/import", web::post().to(import::import_legacy)),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token + rotated refresh_token

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn limiters_accept_zero_and_large_rates() {
        assert!(build_limiter(0).is_ok());
        assert!(build_limiter(60).is_ok());
        assert!(build_limiter(100_000).is_ok());
    }
}
