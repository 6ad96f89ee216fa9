use serde::{Deserialize, Serialize};

use crate::error::AppError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;

/// Raw `page`/`limit` query parameters. Kept as strings because `limit`
/// accepts the literal `all` alongside numbers.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageRequest {
    Paged { page: i64, limit: i64 },
    /// `limit=all`: the whole result set, no pagination metadata.
    All,
}

impl PageRequest {
    pub fn from_query(query: &PageQuery) -> Result<Self, AppError> {
        let page = parse_positive(query.page.as_deref(), "page", DEFAULT_PAGE)?;

        match query.limit.as_deref() {
            Some(s) if s.eq_ignore_ascii_case("all") => Ok(PageRequest::All),
            other => {
                let limit = parse_positive(other, "limit", DEFAULT_LIMIT)?;

                // The pair must produce a representable offset.
                if (page - 1).checked_mul(limit).is_none() {
                    return Err(AppError::BadRequest("page is out of range".into()));
                }

                Ok(PageRequest::Paged { page, limit })
            }
        }
    }

    /// SQL LIMIT bind; `None` binds NULL, which Postgres treats as no limit.
    pub fn limit(&self) -> Option<i64> {
        match self {
            PageRequest::Paged { limit, .. } => Some(*limit),
            PageRequest::All => None,
        }
    }

    pub fn offset(&self) -> i64 {
        match self {
            PageRequest::Paged { page, limit } => (*page - 1).saturating_mul(*limit),
            PageRequest::All => 0,
        }
    }

    pub fn meta(&self, total_items: i64) -> Option<PageMeta> {
        match self {
            PageRequest::Paged { page, limit } => Some(PageMeta::new(*page, *limit, total_items)),
            PageRequest::All => None,
        }
    }
}

fn parse_positive(value: Option<&str>, name: &str, default: i64) -> Result<i64, AppError> {
    match value {
        None => Ok(default),
        Some(s) => s
            .parse::<i64>()
            .ok()
            .filter(|v| *v >= 1)
            .ok_or_else(|| AppError::BadRequest(format!("{} must be a positive integer", name))),
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl PageMeta {
    pub fn new(page: i64, limit: i64, total_items: i64) -> Self {
        let total_pages = if total_items == 0 {
            0
        } else {
            (total_items + limit - 1) / limit
        };

        Self {
            current_page: page,
            total_pages,
            total_items,
            has_next_page: page < total_pages,
            has_previous_page: page > 1 && total_pages > 0,
        }
    }
}
