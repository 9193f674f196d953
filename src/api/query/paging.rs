//! Paginated collection fetching
//!
//! Page 1 is requested with `$count=true`. When the response carries a
//! `@odata.nextLink`, the server's page size is read from its `$skip` and the
//! remaining pages are fetched with a bounded fan-out, merged in page order.
//! The fetchers are generic over the transport so the client supplies the
//! HTTP call.

use super::result::QueryResponse;
use crate::api::constants::odata;
use crate::api::error::ApiResult;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, info, warn};
use std::future::Future;
use url::Url;

/// Paging cursor of one enumeration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageState {
    /// 1-based
    pub page_number: usize,
    pub page_size: usize,
    pub total_count: Option<u64>,
    pub next_link: Option<String>,
}

impl PageState {
    pub fn new(page_number: usize, page_size: usize) -> Self {
        Self {
            page_number: page_number.max(1),
            page_size: page_size.max(1),
            total_count: None,
            next_link: None,
        }
    }

    /// Records skipped before this page
    pub fn skip(&self) -> usize {
        (self.page_number - 1).saturating_mul(self.page_size)
    }

    /// Learn the total count and next link from a fetched page
    pub fn observe<T>(&mut self, page: &QueryResponse<T>) {
        if page.count.is_some() {
            self.total_count = page.count;
        }
        self.next_link = page.next_link.clone();
    }

    /// No `nextLink` means enumeration is complete
    pub fn is_complete(&self) -> bool {
        self.next_link.is_none()
    }

    /// True when this page starts at or after the last record
    pub fn is_beyond_last(&self) -> bool {
        self.total_count
            .is_some_and(|count| self.skip() as u64 >= count)
    }
}

/// Merged outcome of a paged fetch
#[derive(Debug, Clone, PartialEq)]
pub struct PagedResult<T> {
    pub items: Vec<T>,
    /// Last page number requested
    pub final_page: usize,
    pub all_pages_queried: bool,
}

impl<T> PagedResult<T> {
    fn empty(final_page: usize) -> Self {
        Self {
            items: Vec::new(),
            final_page,
            all_pages_queried: true,
        }
    }
}

/// Append query options to a URL that may already carry a query string
pub fn with_query(url: &str, params: &[(&str, String)]) -> String {
    let mut result = url.to_string();
    for (key, value) in params {
        let separator = if result.contains('?') { '&' } else { '?' };
        result.push(separator);
        result.push_str(key);
        result.push('=');
        result.push_str(&urlencoding::encode(value));
    }
    result
}

/// Value of a query parameter in an absolute or relative link
pub fn query_param(link: &str, name: &str) -> Option<String> {
    let parsed = Url::parse(link)
        .or_else(|_| Url::parse("http://localhost/").and_then(|base| base.join(link)))
        .ok()?;
    parsed
        .query_pairs()
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// Page size the server chose, read from the `$skip` of its `nextLink`
pub fn recommended_page_size(next_link: &str) -> Option<usize> {
    query_param(next_link, odata::SKIP)?
        .parse::<usize>()
        .ok()
        .filter(|size| *size > 0)
}

/// Number of the last page holding records
pub fn last_page(total_count: u64, page_size: usize) -> usize {
    (total_count as usize).div_ceil(page_size.max(1)).max(1)
}

/// Fetch every page of `url`
///
/// `page_size` is only used when the server's `nextLink` does not reveal its
/// own page size. Pages after the first are fetched `fan_out` at a time.
pub async fn fetch_all<T, F, Fut>(
    url: &str,
    page_size: Option<usize>,
    fan_out: usize,
    fetch: F,
) -> ApiResult<PagedResult<T>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = ApiResult<QueryResponse<T>>>,
{
    let first_url = with_query(url, &[(odata::COUNT, "true".to_string())]);
    let first = fetch(first_url).await?;

    let mut items = first.value;
    let Some(next_link) = first.next_link else {
        debug!("Collection complete after page 1 ({} items)", items.len());
        return Ok(PagedResult {
            items,
            final_page: 1,
            all_pages_queried: true,
        });
    };

    let Some(total_count) = first.count else {
        warn!("Server omitted @odata.count; following nextLink sequentially");
        return follow_next_links(items, next_link, &fetch).await;
    };

    let server_page_size = recommended_page_size(&next_link)
        .or(page_size)
        .unwrap_or(items.len())
        .max(1);
    let last = last_page(total_count, server_page_size);
    info!(
        "Fetching {} pages of {} ({} items, page size {})",
        last, url, total_count, server_page_size
    );

    let pages: Vec<Vec<T>> = stream::iter(2..=last)
        .map(|page| {
            let skip = (page - 1) * server_page_size;
            fetch(with_query(url, &[(odata::SKIP, skip.to_string())]))
        })
        .buffered(fan_out.max(1))
        .map_ok(|page| page.value)
        .try_collect()
        .await?;

    items.extend(pages.into_iter().flatten());
    let all_pages_queried = items.len() as u64 == total_count;
    if !all_pages_queried {
        warn!(
            "Merged {} items but the server reported {}",
            items.len(),
            total_count
        );
    }

    Ok(PagedResult {
        items,
        final_page: last,
        all_pages_queried,
    })
}

async fn follow_next_links<T, F, Fut>(
    mut items: Vec<T>,
    mut next_link: String,
    fetch: &F,
) -> ApiResult<PagedResult<T>>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = ApiResult<QueryResponse<T>>>,
{
    let mut final_page = 1;
    loop {
        let page = fetch(next_link.clone()).await?;
        final_page += 1;
        items.extend(page.value);

        match page.next_link {
            Some(link) if link != next_link => next_link = link,
            _ => break,
        }
    }

    Ok(PagedResult {
        items,
        final_page,
        all_pages_queried: true,
    })
}

/// Fetch a single page
///
/// A page past the last record is reported as empty and complete, even
/// though the server answers such requests with page 1.
pub async fn fetch_page<T, F, Fut>(
    url: &str,
    page_number: usize,
    page_size: usize,
    fetch: F,
) -> ApiResult<PagedResult<T>>
where
    F: FnOnce(String) -> Fut,
    Fut: Future<Output = ApiResult<QueryResponse<T>>>,
{
    let mut state = PageState::new(page_number, page_size);
    let page_url = with_query(
        url,
        &[
            (odata::COUNT, "true".to_string()),
            (odata::TOP, state.page_size.to_string()),
            (odata::SKIP, state.skip().to_string()),
        ],
    );

    let page = fetch(page_url).await?;
    state.observe(&page);

    if state.is_beyond_last() {
        debug!(
            "Page {} is past the last record ({:?} total)",
            state.page_number, state.total_count
        );
        return Ok(PagedResult::empty(state.page_number));
    }

    let reached_end = state.is_complete()
        || state
            .total_count
            .is_some_and(|count| (state.skip() + page.value.len()) as u64 >= count);

    Ok(PagedResult {
        items: page.value,
        final_page: state.page_number,
        all_pages_queried: reached_end,
    })
}

/// Run `process` over `items` in pages of `page_size`, `fan_out` pages at a time
///
/// Results are concatenated in input order.
pub async fn process_with_pages<I, O, F, Fut>(
    items: Vec<I>,
    page_size: usize,
    fan_out: usize,
    process: F,
) -> ApiResult<Vec<O>>
where
    F: Fn(Vec<I>) -> Fut,
    Fut: Future<Output = ApiResult<Vec<O>>>,
{
    let page_size = page_size.max(1);
    let mut pages = Vec::with_capacity(items.len().div_ceil(page_size));
    let mut remaining = items.into_iter();
    loop {
        let page: Vec<I> = remaining.by_ref().take(page_size).collect();
        if page.is_empty() {
            break;
        }
        pages.push(page);
    }

    let results: Vec<Vec<O>> = stream::iter(pages)
        .map(process)
        .buffered(fan_out.max(1))
        .try_collect()
        .await?;

    Ok(results.into_iter().flatten().collect())
}
