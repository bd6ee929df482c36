//! Paginated fetcher
//!
//! Walks a listing page by page until the server stops sending a next-page
//! token. Records are returned in page order, then in-page order. The first
//! failing page discards everything gathered so far.

use crate::collector::bounded;
use gitmeter_client::ApiResult;
use gitmeter_common::{Page, PageOptions};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Concatenate every page returned by `fetch`
///
/// Each page request is bounded by `timeout`.
pub async fn fetch_all<T, F, Fut>(per_page: u32, timeout: Duration, mut fetch: F) -> ApiResult<Vec<T>>
where
    F: FnMut(PageOptions) -> Fut,
    Fut: Future<Output = ApiResult<Page<T>>>,
{
    let mut opts = PageOptions::first(per_page);
    let mut records = Vec::new();

    loop {
        let page = bounded(timeout, fetch(opts)).await?;
        records.extend(page.items);

        match page.next_page {
            None => break,
            Some(next) if next > opts.page => opts.page = next,
            Some(next) => {
                warn!(page = opts.page, next, "Next page does not advance, stopping");
                break;
            }
        }
    }

    debug!(count = records.len(), pages = opts.page, "Fetched all pages");
    Ok(records)
}
