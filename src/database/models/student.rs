use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    pub id: Uuid,
    pub tenant: String,
    pub full_name: String,
    pub admission_number: Option<String>,
    pub class_id: Option<Uuid>,
    pub is_active: bool,
}
