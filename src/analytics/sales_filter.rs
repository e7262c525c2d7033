use crate::auth::{AuthError, AuthResult, UserSession};
use crate::dataset::{CleanRecord, SalesTable};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 売上フィルター
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SalesFilter {
    /// カテゴリフィルター（Noneは全カテゴリ）
    pub category: Option<String>,
}

impl SalesFilter {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn category(category: impl Into<String>) -> Self {
        Self {
            category: Some(category.into()),
        }
    }

    pub fn matches(&self, record: &CleanRecord) -> bool {
        match &self.category {
            Some(category) => record.category == *category,
            None => true,
        }
    }

    /// Rows passing the filter, in table order
    pub fn apply<'a>(&self, table: &'a SalesTable) -> Vec<&'a CleanRecord> {
        table.iter().filter(|record| self.matches(record)).collect()
    }
}

/// Sorted distinct categories, for the category selector
pub fn available_categories(table: &SalesTable) -> Vec<String> {
    table
        .iter()
        .map(|record| record.category.clone())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Detailed rows are only handed out to sessions allowed to see them
pub fn detail_rows<'a>(
    session: &UserSession,
    records: &[&'a CleanRecord],
) -> AuthResult<Vec<&'a CleanRecord>> {
    if !session.can_see_details() {
        return Err(AuthError::PermissionDenied(format!(
            "'{}' may not view detailed data",
            session.username
        )));
    }
    Ok(records.to_vec())
}
