//! Lazy traversal of cursor-paginated listings.

use crate::client::Client;
use crate::error::Result;
use crate::job::Page;
use futures::stream::{self, Stream};
use serde::de::DeserializeOwned;
use std::future::Future;

enum Cursor<F> {
    First(F),
    Next(String),
    Done,
}

/// Yield the results of `first` and then of every page reachable through the
/// `next` links, one `Vec` per page.
///
/// Nothing is fetched until the stream is polled, and each further page only
/// when the previous one has been consumed. An error ends the stream after it
/// is yielded.
pub(crate) fn paginate<'a, T, F, Fut>(
    client: Client,
    first: F,
) -> impl Stream<Item = Result<Vec<T>>> + 'a
where
    T: DeserializeOwned + 'a,
    F: FnOnce() -> Fut + 'a,
    Fut: Future<Output = Result<Page<T>>> + 'a,
{
    stream::try_unfold(Cursor::First(first), move |cursor| {
        let client = client.clone();
        async move {
            let page = match cursor {
                Cursor::First(first) => first().await?,
                Cursor::Next(url) => client.get_json::<Page<T>>(&url).await?,
                Cursor::Done => return Ok(None),
            };
            let next = match page.next.filter(|n| !n.is_empty()) {
                Some(url) => Cursor::Next(url),
                None => Cursor::Done,
            };
            Ok(Some((page.results, next)))
        }
    })
}
