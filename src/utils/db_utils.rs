use crate::attendance::aggregator::AttendanceStore;
use crate::error::AppError;
use crate::model::attendance::AttendanceRow;
use crate::model::holiday::Holiday;
use crate::model::working_hours::{WorkingHours, WorkingHoursRow};
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::StreamExt;
use sqlx::{Executor, MySql, MySqlConnection, MySqlPool};

/// Attendance columns in the order `AttendanceRow` expects them.
pub const ATTENDANCE_COLUMNS: &str = "date, uid, name, position, check_in_time, status, \
     check_out_time, status_checkout, image_url, image_checkout, absence_details";

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    Null,
}

impl From<Option<String>> for SqlValue {
    fn from(value: Option<String>) -> Self {
        value.map(SqlValue::String).unwrap_or(SqlValue::Null)
    }
}

/// ===============================
/// SQL update container
/// ===============================
#[derive(Debug)]
pub struct SqlUpdate {
    pub sql: String,
    pub values: Vec<SqlValue>,
}

/// ===============================
/// Build dynamic UPDATE SQL
/// ===============================
///
/// Column names come from the caller's own field list, never from request
/// payload keys.
pub fn build_update_sql(
    table: &str,
    fields: Vec<(&'static str, SqlValue)>,
    id_column: &str,
    id_value: SqlValue,
) -> Result<SqlUpdate, AppError> {
    if fields.is_empty() {
        return Err(AppError::validation("No fields provided for update"));
    }

    let set_clause = fields
        .iter()
        .map(|(column, _)| format!("{} = ?", column))
        .collect::<Vec<_>>()
        .join(", ");

    let sql = format!(
        "UPDATE {} SET {} WHERE {} = ?",
        table, set_clause, id_column
    );

    let mut values: Vec<SqlValue> = fields.into_iter().map(|(_, v)| v).collect();
    values.push(id_value);

    Ok(SqlUpdate { sql, values })
}

/// ===============================
/// Execute the update
/// ===============================
pub async fn execute_update(
    conn: &mut MySqlConnection,
    update: SqlUpdate,
) -> Result<u64, sqlx::Error> {
    let mut query = sqlx::query(&update.sql);

    for value in update.values {
        query = match value {
            SqlValue::String(v) => query.bind(v),
            SqlValue::Date(v) => query.bind(v),
            SqlValue::DateTime(v) => query.bind(v),
            SqlValue::Null => query.bind(None::<String>),
        };
    }

    let result = query.execute(conn).await?;
    Ok(result.rows_affected())
}

/// Streams the attendance rows between two date keys (inclusive) into a
/// store, keeping insertion order within each day.
pub async fn load_attendance(
    pool: &MySqlPool,
    from: &str,
    to: &str,
) -> Result<AttendanceStore, sqlx::Error> {
    let sql = format!(
        "SELECT {} FROM attendance WHERE date BETWEEN ? AND ? ORDER BY date, id",
        ATTENDANCE_COLUMNS
    );
    let mut stream = sqlx::query_as::<_, AttendanceRow>(&sql)
        .bind(from)
        .bind(to)
        .fetch(pool);

    let mut store = AttendanceStore::new();
    while let Some(row) = stream.next().await {
        let row = row?;
        store.insert(row.date, row.record);
    }

    Ok(store)
}

pub async fn load_holidays(pool: &MySqlPool) -> Result<Vec<Holiday>, sqlx::Error> {
    sqlx::query_as::<_, Holiday>("SELECT id, name, date FROM holidays ORDER BY date, name")
        .fetch_all(pool)
        .await
}

/// The singleton working-hours row, or the defaults when it was never saved.
pub async fn load_working_hours<'e, E>(executor: E) -> Result<WorkingHours, sqlx::Error>
where
    E: Executor<'e, Database = MySql>,
{
    let row = sqlx::query_as::<_, WorkingHoursRow>(
        r#"
        SELECT check_in_start, check_in_end, check_out_start, check_out_end, autocek
        FROM working_hours
        WHERE id = 1
        "#,
    )
    .fetch_optional(executor)
    .await?;

    Ok(row.map(WorkingHours::from).unwrap_or_default())
}

/// True when the error is a MySQL duplicate-key violation.
pub fn is_duplicate_key(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23000"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_update_with_id_last() {
        let update = build_update_sql(
            "employees",
            vec![
                ("name", SqlValue::String("Budi".into())),
                ("nik", SqlValue::Null),
            ],
            "uid",
            SqlValue::String("A1".into()),
        )
        .unwrap();

        assert_eq!(update.sql, "UPDATE employees SET name = ?, nik = ? WHERE uid = ?");
        assert_eq!(update.values.len(), 3);
        assert_eq!(update.values[2], SqlValue::String("A1".into()));
    }

    #[test]
    fn empty_update_is_rejected() {
        let err = build_update_sql("employees", Vec::new(), "uid", SqlValue::Null).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn optional_strings_bind_as_null() {
        assert_eq!(SqlValue::from(None::<String>), SqlValue::Null);
        assert_eq!(
            SqlValue::from(Some("x".to_string())),
            SqlValue::String("x".into())
        );
    }
}
