use crate::{
    auth::auth::AuthUser,
    error::AppError,
    model::employee::{
        Employee, EmployeeRow, EmployeeStatus, Gender, NICKNAME_MAX_CHARS, Position,
    },
    utils::{
        db_utils::{SqlValue, build_update_sql, execute_update, is_duplicate_key},
        normalize::{derive_nickname, normalize_employee},
    },
};
use actix_web::{HttpResponse, web};
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::{MySqlConnection, MySqlPool};
use std::str::FromStr;
use strum::IntoEnumIterator;
use tracing::{debug, info};
use utoipa::ToSchema;

const EMPLOYEE_COLUMNS: &str = "uid, name, nickname, gender, position, status, birthplace, \
     birthdate, nik, created_at, updated_at";

#[derive(Debug, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateEmployee {
    /// An unregistered card UID
    #[schema(example = "A1B2C3D4")]
    pub uid: String,
    #[schema(example = "Budi Santoso")]
    pub name: String,
    /// Defaults to the first word of the name
    #[schema(example = "Budi")]
    pub nickname: Option<String>,
    #[schema(example = "Male")]
    pub gender: String,
    #[schema(example = "Staff")]
    pub position: Option<String>,
    #[schema(example = "Active")]
    pub status: Option<String>,
    #[schema(example = "Bandung")]
    pub birthplace: Option<String>,
    #[schema(example = "1990-05-17", format = "date", value_type = Option<String>)]
    pub birthdate: Option<NaiveDate>,
    #[schema(example = "3273011705900001")]
    pub nik: Option<String>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateEmployee {
    /// New card UID; moves the profile and its attendance history
    pub uid: Option<String>,
    pub name: Option<String>,
    pub nickname: Option<String>,
    pub gender: Option<String>,
    pub position: Option<String>,
    pub status: Option<String>,
    pub birthplace: Option<String>,
    #[schema(example = "1990-05-17", format = "date", value_type = Option<String>)]
    pub birthdate: Option<NaiveDate>,
    pub nik: Option<String>,
}

fn trimmed(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn parse_enum<T: FromStr + ToString>(field: &str, raw: &str) -> Result<String, AppError> {
    T::from_str(raw.trim())
        .map(|v| v.to_string())
        .map_err(|_| AppError::validation(format!("Invalid {}: {}", field, raw)))
}

fn check_nickname(nickname: &str) -> Result<(), AppError> {
    if nickname.chars().count() > NICKNAME_MAX_CHARS {
        return Err(AppError::validation(format!(
            "Nickname must be at most {} characters",
            NICKNAME_MAX_CHARS
        )));
    }
    Ok(())
}

/// Validates a creation request into the profile that will be stored.
fn new_employee(payload: &CreateEmployee) -> Result<Employee, AppError> {
    let uid = trimmed(Some(&payload.uid)).ok_or_else(|| AppError::validation("UID is required"))?;
    let name =
        trimmed(Some(&payload.name)).ok_or_else(|| AppError::validation("Name is required"))?;
    if payload.gender.trim().is_empty() {
        return Err(AppError::validation("Gender is required"));
    }
    let gender = parse_enum::<Gender>("gender", &payload.gender)?;

    let nickname = match trimmed(payload.nickname.as_deref()) {
        Some(nickname) => {
            check_nickname(&nickname)?;
            nickname
        }
        None => derive_nickname(&name),
    };
    let position = trimmed(payload.position.as_deref())
        .map(|p| parse_enum::<Position>("position", &p))
        .transpose()?;
    let status = trimmed(payload.status.as_deref())
        .map(|s| parse_enum::<EmployeeStatus>("status", &s))
        .transpose()?
        .unwrap_or_else(|| EmployeeStatus::default().to_string());

    let now = Utc::now();
    Ok(Employee {
        uid,
        name,
        nickname,
        gender: Some(gender),
        position,
        status,
        birthplace: trimmed(payload.birthplace.as_deref()),
        birthdate: payload.birthdate,
        nik: trimmed(payload.nik.as_deref()),
        created_at: Some(now),
        updated_at: Some(now),
    })
}

/// Columns touched by an edit, validated. `updated_at` is always included.
fn update_fields(body: &UpdateEmployee) -> Result<Vec<(&'static str, SqlValue)>, AppError> {
    let mut fields = Vec::new();

    if let Some(uid) = &body.uid {
        let uid = trimmed(Some(uid)).ok_or_else(|| AppError::validation("UID cannot be empty"))?;
        fields.push(("uid", SqlValue::String(uid)));
    }
    if let Some(name) = &body.name {
        let name =
            trimmed(Some(name)).ok_or_else(|| AppError::validation("Name cannot be empty"))?;
        fields.push(("name", SqlValue::String(name)));
    }
    if let Some(nickname) = &body.nickname {
        let nickname = trimmed(Some(nickname));
        if let Some(n) = &nickname {
            check_nickname(n)?;
        }
        fields.push(("nickname", nickname.into()));
    }
    if let Some(gender) = &body.gender {
        fields.push(("gender", SqlValue::String(parse_enum::<Gender>("gender", gender)?)));
    }
    if let Some(position) = &body.position {
        let position = trimmed(Some(position))
            .map(|p| parse_enum::<Position>("position", &p))
            .transpose()?;
        fields.push(("position", position.into()));
    }
    if let Some(status) = &body.status {
        fields.push((
            "status",
            SqlValue::String(parse_enum::<EmployeeStatus>("status", status)?),
        ));
    }
    if let Some(birthplace) = &body.birthplace {
        fields.push(("birthplace", trimmed(Some(birthplace)).into()));
    }
    if let Some(birthdate) = body.birthdate {
        fields.push(("birthdate", SqlValue::Date(birthdate)));
    }
    if let Some(nik) = &body.nik {
        fields.push(("nik", trimmed(Some(nik)).into()));
    }

    if fields.is_empty() {
        return Err(AppError::validation("No fields provided for update"));
    }

    fields.push(("updated_at", SqlValue::DateTime(Utc::now())));
    Ok(fields)
}

async fn fetch_employee(
    conn: &mut MySqlConnection,
    uid: &str,
    lock: bool,
) -> Result<Option<EmployeeRow>, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM employees WHERE uid = ?{}",
        EMPLOYEE_COLUMNS,
        if lock { " FOR UPDATE" } else { "" }
    );
    sqlx::query_as::<_, EmployeeRow>(&sql)
        .bind(uid)
        .fetch_optional(conn)
        .await
}

/// Copies the current profile name and position into every attendance row of
/// `uid`, so historical reports show the edited values.
pub async fn reconcile_attendance_snapshot(
    conn: &mut MySqlConnection,
    uid: &str,
    name: &str,
    position: Option<&str>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query("UPDATE attendance SET name = ?, position = ? WHERE uid = ?")
        .bind(name)
        .bind(position)
        .bind(uid)
        .execute(conn)
        .await?;
    Ok(result.rows_affected())
}

/// Register an employee on an unregistered card
#[utoipa::path(
    post,
    path = "/api/employees",
    request_body = CreateEmployee,
    responses(
        (status = 201, description = "Employee created", body = Employee),
        (status = 400, description = "Invalid payload or UID not awaiting registration"),
        (status = 403, description = "Admin only"),
        (status = 409, description = "UID already registered")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn create_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateEmployee>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let employee = new_employee(&payload)?;

    let mut tx = pool.begin().await?;

    let pending = sqlx::query_scalar::<_, String>(
        "SELECT uid FROM unregistered_uids WHERE uid = ? FOR UPDATE",
    )
    .bind(&employee.uid)
    .fetch_optional(&mut *tx)
    .await?;
    if pending.is_none() {
        return Err(AppError::validation(format!(
            "UID {} is not awaiting registration",
            employee.uid
        )));
    }

    if fetch_employee(&mut tx, &employee.uid, true).await?.is_some() {
        return Err(AppError::Conflict(format!(
            "UID {} is already registered",
            employee.uid
        )));
    }

    let insert = sqlx::query(
        r#"
        INSERT INTO employees
        (uid, name, nickname, gender, position, status, birthplace, birthdate, nik, created_at, updated_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&employee.uid)
    .bind(&employee.name)
    .bind(&employee.nickname)
    .bind(&employee.gender)
    .bind(&employee.position)
    .bind(&employee.status)
    .bind(&employee.birthplace)
    .bind(employee.birthdate)
    .bind(&employee.nik)
    .bind(employee.created_at)
    .bind(employee.updated_at)
    .execute(&mut *tx)
    .await;

    if let Err(e) = insert {
        if is_duplicate_key(&e) {
            return Err(AppError::Conflict(format!(
                "UID {} is already registered",
                employee.uid
            )));
        }
        return Err(e.into());
    }

    sqlx::query("DELETE FROM unregistered_uids WHERE uid = ?")
        .bind(&employee.uid)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    info!(uid = %employee.uid, user = %auth.username, "Employee registered");
    Ok(HttpResponse::Created().json(employee))
}

/// List employees
#[utoipa::path(
    get,
    path = "/api/employees",
    responses(
        (status = 200, description = "All employees, oldest first", body = [Employee])
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_employees(pool: web::Data<MySqlPool>) -> Result<HttpResponse, AppError> {
    let sql = format!(
        "SELECT {} FROM employees ORDER BY created_at, uid",
        EMPLOYEE_COLUMNS
    );
    debug!(sql = %sql, "Fetching employees");

    let employees: Vec<Employee> = sqlx::query_as::<_, EmployeeRow>(&sql)
        .fetch_all(pool.get_ref())
        .await?
        .into_iter()
        .map(normalize_employee)
        .collect();

    Ok(HttpResponse::Ok().json(employees))
}

/// Get employee by UID
#[utoipa::path(
    get,
    path = "/api/employees/{uid}",
    params(("uid", Path, description = "Employee card UID")),
    responses(
        (status = 200, description = "Employee found", body = Employee),
        (status = 404, description = "Employee not found", body = Object, example = json!({
            "message": "Employee not found"
        }))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn get_employee(
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let uid = path.into_inner();
    let mut conn = pool.acquire().await?;

    let row = fetch_employee(&mut conn, &uid, false)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;

    Ok(HttpResponse::Ok().json(normalize_employee(row)))
}

/// Edit employee
#[utoipa::path(
    put,
    path = "/api/employees/{uid}",
    params(("uid", Path, description = "Employee card UID")),
    request_body = UpdateEmployee,
    responses(
        (status = 200, description = "Employee updated", body = Employee),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found"),
        (status = 409, description = "New UID already in use")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn update_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
    body: web::Json<UpdateEmployee>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let uid = path.into_inner();
    let fields = update_fields(&body)?;

    let new_uid = fields.iter().find_map(|(column, value)| match (column, value) {
        (&"uid", SqlValue::String(v)) if *v != uid => Some(v.clone()),
        _ => None,
    });
    let snapshot_changed = body.name.is_some() || body.position.is_some();

    let mut tx = pool.begin().await?;

    if fetch_employee(&mut tx, &uid, true).await?.is_none() {
        return Err(AppError::not_found("Employee not found"));
    }

    if let Some(new_uid) = &new_uid {
        if fetch_employee(&mut tx, new_uid, true).await?.is_some() {
            return Err(AppError::Conflict(format!("UID {} is already in use", new_uid)));
        }
    }

    let update = build_update_sql("employees", fields, "uid", SqlValue::String(uid.clone()))?;
    execute_update(&mut tx, update).await?;

    let current_uid = new_uid.clone().unwrap_or_else(|| uid.clone());

    if let Some(new_uid) = &new_uid {
        let moved = sqlx::query("UPDATE attendance SET uid = ? WHERE uid = ?")
            .bind(new_uid)
            .bind(&uid)
            .execute(&mut *tx)
            .await;
        match moved {
            Ok(result) => {
                info!(from = %uid, to = %new_uid, records = result.rows_affected(), "Attendance history moved");
            }
            Err(e) if is_duplicate_key(&e) => {
                return Err(AppError::Conflict(format!(
                    "UID {} already has attendance on the same days",
                    new_uid
                )));
            }
            Err(e) => return Err(e.into()),
        }

        sqlx::query("DELETE FROM unregistered_uids WHERE uid = ?")
            .bind(new_uid)
            .execute(&mut *tx)
            .await?;
    }

    let row = fetch_employee(&mut tx, &current_uid, false)
        .await?
        .ok_or_else(|| AppError::not_found("Employee not found"))?;

    if snapshot_changed {
        let patched = reconcile_attendance_snapshot(
            &mut tx,
            &row.uid,
            &row.name,
            row.position.as_deref(),
        )
        .await?;
        debug!(uid = %row.uid, records = patched, "Attendance snapshot reconciled");
    }

    tx.commit().await?;

    info!(uid = %current_uid, user = %auth.username, "Employee updated");
    Ok(HttpResponse::Ok().json(normalize_employee(row)))
}

/// Delete employee
#[utoipa::path(
    delete,
    path = "/api/employees/{uid}",
    params(("uid", Path, description = "Employee card UID")),
    responses(
        (status = 200, description = "Successfully deleted", body = Object, example = json!({
            "message": "Successfully deleted"
        })),
        (status = 403, description = "Admin only"),
        (status = 404, description = "Employee not found")
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn delete_employee(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    auth.require_admin()?;
    let uid = path.into_inner();

    let result = sqlx::query("DELETE FROM employees WHERE uid = ?")
        .bind(&uid)
        .execute(pool.get_ref())
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::not_found("Employee not found"));
    }

    info!(uid = %uid, user = %auth.username, "Employee deleted");
    Ok(HttpResponse::Ok().json(json!({ "message": "Successfully deleted" })))
}

/// Positions an employee can hold
#[utoipa::path(
    get,
    path = "/api/employees/positions",
    responses(
        (status = 200, description = "Position labels", body = [String], example = json!(
            ["Staff", "Supervisor", "Manager", "Director", "Intern"]
        ))
    ),
    tag = "Employee",
    security(("bearer_auth" = []))
)]
pub async fn list_positions() -> HttpResponse {
    let positions: Vec<String> = Position::iter().map(|p| p.to_string()).collect();
    HttpResponse::Ok().json(positions)
}
