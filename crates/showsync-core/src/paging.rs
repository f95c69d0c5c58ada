use crate::context::SyncContext;
use crate::error::SyncError;
use showsync_models::Provider;
use showsync_remote::cloud::Page;
use showsync_remote::RemoteError;
use std::future::Future;
use tracing::{debug, warn};

/// Where a cursor-paginated download stands after a page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageState {
    HasMore(String),
    Done,
}

impl PageState {
    pub fn from_cursor(cursor: Option<String>) -> Self {
        match cursor {
            Some(cursor) if !cursor.is_empty() => PageState::HasMore(cursor),
            _ => PageState::Done,
        }
    }
}

/// Download every page of a listing, handing each page to `handle` before
/// requesting the next one.
///
/// Returns the number of items seen. Any failure ends the loop; pages
/// handled before it stay applied.
pub async fn for_each_page<T, F, Fut, H>(
    ctx: &SyncContext,
    provider: Provider,
    what: &str,
    mut fetch: F,
    mut handle: H,
) -> Result<usize, SyncError>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>, RemoteError>>,
    H: FnMut(Vec<T>) -> Result<(), SyncError>,
{
    let mut cursor: Option<String> = None;
    let mut total = 0;
    let mut pages = 0;
    loop {
        ctx.check_continue()?;
        let page = fetch(cursor.clone()).await.map_err(|e| {
            warn!(provider = %provider, what, error = %e, "Page download failed");
            SyncError::from_remote(provider, e)
        })?;
        pages += 1;
        total += page.items.len();
        let next = PageState::from_cursor(page.cursor);
        handle(page.items)?;
        match next {
            PageState::HasMore(next_cursor) => {
                if cursor.as_deref() == Some(next_cursor.as_str()) {
                    warn!(provider = %provider, what, "Remote returned the same cursor twice, stopping");
                    break;
                }
                cursor = Some(next_cursor);
            }
            PageState::Done => break,
        }
    }
    debug!(provider = %provider, what, pages, items = total, "Downloaded all pages");
    Ok(total)
}
