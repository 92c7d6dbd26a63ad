use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct ClassStream {
    pub id: Uuid,
    pub tenant: String,
    pub stream_name: String,
    pub stream_code: String,
}

impl ClassStream {
    pub fn new(tenant: impl Into<String>, stream_name: impl Into<String>, stream_code: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            tenant: tenant.into(),
            stream_name: stream_name.into(),
            stream_code: stream_code.into(),
        }
    }
}
