//! HTTP surface: response envelopes, pagination plumbing, and the
//! per-resource route handlers.

pub mod account;
pub mod country;
pub mod pagination;
pub mod travel;
pub mod user;

use serde::Serialize;

use self::pagination::PageMeta;

/// Success envelope: `{ data, pagination? }`. The `pagination` object is
/// omitted entirely for unpaged responses.
#[derive(Debug, Serialize)]
pub struct Envelope<T: Serialize> {
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PageMeta>,
}

impl<T: Serialize> Envelope<T> {
    pub fn new(data: T) -> Self {
        Self {
            data,
            pagination: None,
        }
    }

    pub fn paged(data: T, pagination: Option<PageMeta>) -> Self {
        Self { data, pagination }
    }
}
