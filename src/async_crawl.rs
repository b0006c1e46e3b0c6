// async_crawl.rs
use crate::{
    error::CrawlError,
    observer::{CandidateHead, Observer},
    repository::Connector,
    HeadHunt,
};
use async_stream::stream;
use futures::Stream;
use std::sync::Arc;
use tokio::{sync::mpsc, task, time};

type Item = Result<CandidateHead, CrawlError>;

/// Observer that forwards heads into a bounded channel
///
/// Runs on a blocking worker, so sends block while the channel is full.
struct ChannelObserver {
    tx: mpsc::Sender<Item>,
    open: bool,
}

impl ChannelObserver {
    fn new(tx: mpsc::Sender<Item>) -> Self {
        Self { tx, open: true }
    }

    fn fail(&mut self, e: CrawlError) {
        if self.open && self.tx.blocking_send(Err(e)).is_err() {
            self.open = false;
        }
    }
}

impl Observer for ChannelObserver {
    fn observe(&mut self, head: CandidateHead) {
        if self.open && self.tx.blocking_send(Ok(head)).is_err() {
            self.open = false;
        }
    }

    fn is_observing(&self) -> bool {
        self.open && !self.tx.is_closed()
    }
}

/// Creates a stream of heads found by `hunt`
///
/// The crawl itself is blocking and runs on `spawn_blocking`, feeding a
/// channel of `channel_capacity` items. A crawl error is the last item.
///
/// # Returns
///
/// A stream that yields `Result<CandidateHead, CrawlError>` values
pub fn crawl_stream<C>(hunt: Arc<HeadHunt<C>>) -> impl Stream<Item = Item>
where
    C: Connector + Send + Sync + 'static,
{
    let capacity = hunt.options().channel_capacity.max(1);
    let timeout = hunt.options().timeout;

    stream! {
        let (tx, mut rx) = mpsc::channel(capacity);
        let mut observer = ChannelObserver::new(tx);

        let join_handle = task::spawn_blocking(move || {
            if let Err(e) = hunt.fetch(&mut observer) {
                observer.fail(e);
            }
        });

        let mut timed_out = false;
        loop {
            let next = match timeout {
                Some(limit) => match time::timeout(limit, rx.recv()).await {
                    Ok(next) => next,
                    Err(_) => {
                        timed_out = true;
                        break;
                    }
                },
                None => rx.recv().await,
            };
            match next {
                Some(item) => yield item,
                None => break,
            }
        }

        if timed_out {
            // closing the receiver stops the worker at its next check
            drop(rx);
            yield Err(CrawlError::Timeout);
        } else if let Err(e) = join_handle.await {
            yield Err(CrawlError::Other(format!("Task failed: {}", e)));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::criteria::{from_fn, Probe};
    use crate::options::CrawlOptionsBuilder;
    use crate::repository::MemoryRepository;
    use futures::{pin_mut, StreamExt};
    use std::time::Duration;

    fn repo() -> MemoryRepository {
        let repo = MemoryRepository::new("stream");
        repo.commit(|txn| {
            txn.mkdir("trunk")?;
            txn.mkdir("branches/a")?;
            txn.mkdir("branches/b")
        })
        .unwrap();
        repo
    }

    #[tokio::test]
    async fn test_stream_yields_heads() {
        let repo = repo();
        let options = CrawlOptionsBuilder::new().remote_base("memory:///").build();
        let hunt = Arc::new(HeadHunt::new(repo.clone(), options));

        let s = crawl_stream(hunt);
        pin_mut!(s);
        let mut names = Vec::new();
        while let Some(item) = s.next().await {
            names.push(item.unwrap().name);
        }
        assert_eq!(names, vec!["branches/a", "branches/b", "trunk"]);
        assert_eq!(repo.open_sessions(), 0);
    }

    #[tokio::test]
    async fn test_stream_error_is_last() {
        let repo = repo();
        repo.fail_path("branches");
        let options = CrawlOptionsBuilder::new().remote_base("memory:///").build();
        let hunt = Arc::new(HeadHunt::new(repo, options));

        let items: Vec<_> = crawl_stream(hunt).collect().await;
        assert!(matches!(
            items.last(),
            Some(Err(CrawlError::RemoteAccess(_)))
        ));
    }

    #[tokio::test]
    async fn test_stream_timeout() {
        let options = CrawlOptionsBuilder::new()
            .remote_base("memory:///")
            .timeout(Duration::from_millis(20))
            .build();
        let slow = from_fn(|_: &Probe<'_>| {
            std::thread::sleep(Duration::from_millis(200));
            Ok(true)
        });
        let hunt = Arc::new(HeadHunt::new(repo(), options).with_criteria(slow));

        let items: Vec<_> = crawl_stream(hunt).collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Err(CrawlError::Timeout)));
    }
}
