use serde::{Deserialize, Serialize};

use crate::models::Course;

pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

/// Query string of `GET /courses` in json-server conventions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListParams {
    #[serde(rename = "_page")]
    pub page: u32,
    #[serde(rename = "_limit")]
    pub limit: u32,
    #[serde(rename = "_sort")]
    pub sort: String,
    #[serde(rename = "_order")]
    pub order: SortOrder,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_like: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teacher: Option<String>,
}

impl ListParams {
    /// Page request sorted by id ascending; empty filters are omitted.
    pub fn page(page: u32, limit: u32, search: &str, teacher: &str) -> Self {
        Self {
            page,
            limit,
            sort: "id".to_string(),
            order: SortOrder::Asc,
            name_like: non_empty(search),
            teacher: non_empty(teacher),
        }
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// One page of courses plus the server-side total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoursePage {
    pub items: Vec<Course>,
    pub total: u64,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_params_omit_empty_filters() {
        let params = ListParams::page(2, 5, "", "");
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"_page": 2, "_limit": 5, "_sort": "id", "_order": "asc"})
        );
    }

    #[test]
    fn list_params_carry_filters() {
        let params = ListParams::page(1, 5, "algo", "Jane");
        let value = serde_json::to_value(&params).unwrap();
        assert_eq!(value["name_like"], "algo");
        assert_eq!(value["teacher"], "Jane");
    }
}
