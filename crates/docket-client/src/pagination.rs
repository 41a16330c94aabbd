//! Full-collection pagination.
//!
//! Collection endpoints are read page by page (1, 2, ...) until the server
//! says there is nothing left. The `X-Pagination` response header carries a
//! JSON object such as
//!
//! ```json
//! {"total": 431, "next_page": 3, "previous_page": 1, "total_pages": 3}
//! ```
//!
//! and a `null` `next_page` ends the loop. Without a usable header the loop
//! ends on the first page shorter than a full page.

use std::future::Future;
use std::time::Duration;

use docket_core::error::AppError;
use docket_core::traits::Collection;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::fetch::status_error;

/// Name of the pagination response header.
pub const PAGINATION_HEADER: &str = "x-pagination";

/// Decoded `X-Pagination` header.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PaginationHeader {
    pub total: Option<u64>,
    pub next_page: Option<u32>,
    pub previous_page: Option<u32>,
    pub total_pages: Option<u32>,
}

/// Parses the header value; `None` when it is missing or not valid JSON.
///
/// # Examples
///
/// ```
/// use docket_client::pagination::parse_pagination;
///
/// let header = parse_pagination(Some(r#"{"total": 3, "next_page": null}"#)).unwrap();
/// assert_eq!(header.next_page, None);
/// assert!(parse_pagination(Some("garbage")).is_none());
/// ```
pub fn parse_pagination(value: Option<&str>) -> Option<PaginationHeader> {
    value.and_then(|raw| serde_json::from_str(raw).ok())
}

/// One fetched page.
#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    /// HTTP status of the (last) response for this page.
    pub status: u16,
    /// Requested URL, for error reporting.
    pub url: String,
    /// Records in server order; empty for non-success statuses.
    pub records: Vec<T>,
    pub pagination: Option<PaginationHeader>,
}

impl<T> Page<T> {
    fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Something that can fetch numbered pages of one collection.
pub trait PageSource<T>: Send + Sync {
    /// Fetches page `page` (1-based).
    fn fetch_page(&self, page: u32) -> impl Future<Output = Result<Page<T>, AppError>> + Send;
}

/// Reads every page of a collection.
///
/// Sleeps `page_delay` before every request after the first. A page with a
/// non-success status ends the loop; the records read so far are returned
/// together with the error in [`Collection::aborted`]. Transport errors are
/// returned as `Err` and discard the partial result.
pub async fn load_all_pages<T, S>(
    source: &S,
    page_size: usize,
    page_delay: Duration,
) -> Result<Collection<T>, AppError>
where
    S: PageSource<T>,
{
    let mut records = Vec::new();
    let mut page_number: u32 = 1;

    loop {
        if page_number > 1 {
            sleep(page_delay).await;
        }

        let page = source.fetch_page(page_number).await?;
        if !page.is_success() {
            warn!(
                status = page.status,
                url = %page.url,
                page = page_number,
                fetched = records.len(),
                "Page request failed, stopping pagination"
            );
            return Ok(Collection {
                records,
                aborted: Some(status_error(page.status, page.url)),
            });
        }

        let count = page.records.len();
        records.extend(page.records);
        debug!(page = page_number, count, total = records.len(), "Fetched page");

        if count == 0 {
            break;
        }

        let has_more = match page.pagination {
            Some(header) => header.next_page.is_some(),
            None => count >= page_size,
        };
        if !has_more {
            break;
        }
        page_number += 1;
    }

    Ok(Collection::complete(records))
}
