use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct Holiday {
    #[schema(example = "5f0c2a7e-3c55-4a47-9d0e-0d8a3c6f2b11")]
    pub id: String,

    #[schema(example = "Hari Raya Nyepi")]
    pub name: String,

    #[schema(example = "2025-03-29", value_type = String, format = "date")]
    pub date: NaiveDate,
}
