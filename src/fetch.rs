//! Paged retrieval loop over the messages endpoint.
//!
//! The loop is strictly sequential: one request at a time, each returned
//! item handed to the caller as it arrives. The only retry case is a 429
//! answer, which is slept out and re-issued; any other failure ends the
//! run and is reported together with the counts reached so far.

use std::time::Duration;

use crate::error::{GraphError, Result};
use crate::filter::Query;
use crate::model::message::{Message, MessagePage};

/// Where pages come from. `GraphClient` is the real implementation; tests
/// substitute scripted sources.
pub trait PageSource {
    /// Fetch the first page of a folder listing with the full query.
    fn first_page(&self, folder: &str, query: &Query) -> Result<MessagePage>;

    /// Follow a continuation link verbatim. The link already encodes the
    /// filter, ordering, and selection; no query parameters are resent.
    fn next_page(&self, next_link: &str) -> Result<MessagePage>;
}

/// Tally of one fetch run. `error` is set when the loop was cut short by a
/// non-recoverable failure; the counts still reflect the work done before.
#[derive(Debug, Default)]
pub struct FetchOutcome {
    /// Items successfully handed off and accepted by the sink.
    pub processed: usize,
    /// Items that could not be decoded or that the sink rejected.
    pub failed: usize,
    /// Terminal error, if the run did not end normally.
    pub error: Option<GraphError>,
}

/// Drives the page loop for one folder. A new [`Fetcher::run`] call
/// re-issues the query from the start; runs are not resumable.
pub struct Fetcher<'a, S> {
    source: &'a S,
    folder: String,
    max_items: Option<usize>,
    page_delay: Duration,
    sleep: Box<dyn Fn(Duration) + 'a>,
}

impl<'a, S: PageSource> Fetcher<'a, S> {
    pub fn new(source: &'a S, folder: impl Into<String>) -> Self {
        Self {
            source,
            folder: folder.into(),
            max_items: None,
            page_delay: Duration::from_millis(500),
            sleep: Box::new(std::thread::sleep),
        }
    }

    /// Stop after this many successfully processed items.
    #[must_use]
    pub fn max_items(mut self, max: Option<usize>) -> Self {
        self.max_items = max;
        self
    }

    /// Fixed delay between page fetches, to stay under the service's
    /// rate limit.
    #[must_use]
    pub fn page_delay(mut self, delay: Duration) -> Self {
        self.page_delay = delay;
        self
    }

    /// Replace the sleep hook. Tests use this to record backoff behavior
    /// instead of actually sleeping.
    #[must_use]
    pub fn with_sleep(mut self, sleep: impl Fn(Duration) + 'a) -> Self {
        self.sleep = Box::new(sleep);
        self
    }

    /// Page through the folder, decoding each item and handing it to
    /// `on_item`. The sink returns `true` when the item was persisted;
    /// `false` counts it as failed and the loop continues.
    pub fn run(&self, query: &Query, on_item: &mut dyn FnMut(Message) -> bool) -> FetchOutcome {
        let mut outcome = FetchOutcome::default();
        let mut next_link: Option<String> = None;

        loop {
            let page = match self.fetch_page(next_link.as_deref(), query) {
                Ok(page) => page,
                Err(e) => {
                    outcome.error = Some(e);
                    return outcome;
                }
            };

            for raw in page.value {
                if self.cap_reached(outcome.processed) {
                    break;
                }
                match serde_json::from_value::<Message>(raw) {
                    Ok(message) => {
                        if on_item(message) {
                            outcome.processed += 1;
                        } else {
                            outcome.failed += 1;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping undecodable message");
                        outcome.failed += 1;
                    }
                }
            }

            match page.next_link {
                Some(link) if !self.cap_reached(outcome.processed) => {
                    (self.sleep)(self.page_delay);
                    next_link = Some(link);
                }
                _ => break,
            }
        }

        outcome
    }

    /// Fetch one page, sleeping out 429 answers and retrying the same
    /// request. Every other error is returned as-is.
    fn fetch_page(&self, next_link: Option<&str>, query: &Query) -> Result<MessagePage> {
        loop {
            let result = match next_link {
                None => self.source.first_page(&self.folder, query),
                Some(link) => self.source.next_page(link),
            };
            match result {
                Err(GraphError::RateLimited { retry_after }) => {
                    tracing::warn!(
                        seconds = retry_after.as_secs(),
                        "Rate limited, backing off before retrying the page"
                    );
                    (self.sleep)(retry_after);
                }
                other => return other,
            }
        }
    }

    fn cap_reached(&self, processed: usize) -> bool {
        self.max_items.is_some_and(|max| processed >= max)
    }
}
