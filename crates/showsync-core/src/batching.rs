use crate::context::SyncContext;
use crate::error::SyncError;
use showsync_models::Provider;
use showsync_remote::RemoteError;
use std::future::Future;
use tracing::{debug, warn};

/// Send `items` in batches of at most `batch_size`, one request per batch.
///
/// A failing batch aborts the remaining ones; batches already accepted by
/// the remote stay accepted. Returns the number of requests sent.
pub async fn upload_in_batches<T, F, Fut>(
    ctx: &SyncContext,
    provider: Provider,
    what: &str,
    items: &[T],
    batch_size: usize,
    mut send: F,
) -> Result<usize, SyncError>
where
    T: Clone,
    F: FnMut(Vec<T>) -> Fut,
    Fut: Future<Output = Result<(), RemoteError>>,
{
    let batch_size = batch_size.max(1);
    let total_batches = items.len().div_ceil(batch_size);
    let mut sent = 0;
    for batch in items.chunks(batch_size) {
        ctx.check_continue()?;
        if let Err(e) = send(batch.to_vec()).await {
            warn!(
                provider = %provider,
                what,
                batch = sent + 1,
                total_batches,
                error = %e,
                "Upload batch failed, skipping remaining batches"
            );
            return Err(SyncError::from_remote(provider, e));
        }
        sent += 1;
    }
    if sent > 0 {
        debug!(provider = %provider, what, items = items.len(), batches = sent, "Uploaded");
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::test_context;

    #[tokio::test]
    async fn test_batch_count_is_ceiling() {
        let ctx = test_context();
        let items: Vec<u32> = (0..1201).collect();
        let mut sizes = Vec::new();
        let sent = upload_in_batches(&ctx, Provider::Cloud, "numbers", &items, 500, |batch| {
            sizes.push(batch.len());
            async { Ok(()) }
        })
        .await
        .unwrap();

        assert_eq!(sent, 3);
        assert_eq!(sizes, vec![500, 500, 201]);
    }

    #[tokio::test]
    async fn test_no_items_no_calls() {
        let ctx = test_context();
        let mut calls = 0;
        let sent = upload_in_batches(&ctx, Provider::Cloud, "numbers", &[] as &[u32], 10, |_| {
            calls += 1;
            async { Ok(()) }
        })
        .await
        .unwrap();
        assert_eq!(sent, 0);
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn test_failure_aborts_later_batches() {
        let ctx = test_context();
        let items: Vec<u32> = (0..25).collect();
        let mut accepted = Vec::new();
        let mut call = 0;
        let result = upload_in_batches(&ctx, Provider::Cloud, "numbers", &items, 10, |batch| {
            call += 1;
            let fail = call == 2;
            if !fail {
                accepted.extend(batch);
            }
            async move {
                if fail {
                    Err(RemoteError::Http { status: 500, message: "boom".into() })
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert!(matches!(result, Err(SyncError::Remote(_))));
        assert_eq!(call, 2);
        assert_eq!(accepted, (0..10).collect::<Vec<_>>());
    }
}
