use crate::{auth::auth::AuthUser, error::AppError};
use actix_web::{HttpResponse, web};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::info;
use utoipa::ToSchema;

/// A card tapped on the reader that no employee owns yet.
#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct UnregisteredUid {
    #[schema(example = "A1B2C3D4")]
    pub uid: String,
    #[schema(value_type = String, format = "date-time")]
    pub seen_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct TapReq {
    #[schema(example = "A1B2C3D4")]
    pub uid: String,
}

/// UIDs waiting for registration
#[utoipa::path(
    get,
    path = "/api/unregistered-uids",
    responses((status = 200, description = "Pending UIDs, newest first", body = [UnregisteredUid])),
    security(("bearer_auth" = [])),
    tag = "Device"
)]
pub async fn list_unregistered(pool: web::Data<MySqlPool>) -> Result<HttpResponse, AppError> {
    let uids = sqlx::query_as::<_, UnregisteredUid>(
        "SELECT uid, seen_at FROM unregistered_uids ORDER BY seen_at DESC, uid",
    )
    .fetch_all(pool.get_ref())
    .await?;

    Ok(HttpResponse::Ok().json(uids))
}

/// Record a tapped UID
///
/// Cards that already belong to an employee are ignored; repeated taps only
/// refresh `seen_at`.
#[utoipa::path(
    post,
    path = "/api/unregistered-uids",
    request_body = TapReq,
    responses(
        (status = 200, description = "Tap recorded", body = Object, example = json!({
            "uid": "A1B2C3D4", "queued": true
        })),
        (status = 400, description = "Empty UID"),
        (status = 403, description = "Admin only")
    ),
    security(("bearer_auth" = [])),
    tag = "Device"
)]
pub async fn register_tap(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    body: web::Json<TapReq>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let uid = body.uid.trim();
    if uid.is_empty() {
        return Err(AppError::validation("UID is required"));
    }

    let registered = sqlx::query_scalar::<_, i64>(
        "SELECT EXISTS(SELECT 1 FROM employees WHERE uid = ?)",
    )
    .bind(uid)
    .fetch_one(pool.get_ref())
    .await?
        > 0;

    if !registered {
        sqlx::query(
            r#"
            INSERT INTO unregistered_uids (uid, seen_at) VALUES (?, ?)
            ON DUPLICATE KEY UPDATE seen_at = VALUES(seen_at)
            "#,
        )
        .bind(uid)
        .bind(Utc::now())
        .execute(pool.get_ref())
        .await?;
        info!(uid, "Unregistered card queued");
    }

    Ok(HttpResponse::Ok().json(json!({ "uid": uid, "queued": !registered })))
}

/// Discard a pending UID
#[utoipa::path(
    delete,
    path = "/api/unregistered-uids/{uid}",
    params(("uid", Path, description = "Card UID")),
    responses(
        (status = 200, description = "Removed", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "UID not pending")
    ),
    security(("bearer_auth" = [])),
    tag = "Device"
)]
pub async fn discard_unregistered(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let uid = path.into_inner();

    let result = sqlx::query("DELETE FROM unregistered_uids WHERE uid = ?")
        .bind(&uid)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("UID is not pending registration"));
    }

    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}
