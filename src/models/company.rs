use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Company {
    #[serde(default)]
    pub id: String,
    pub name: String,
    pub sector: String, // "mining" | "energy" | "manufacturing" | "financial" | "technology" | "other"
    #[serde(default)]
    pub created_at: i64,
}
