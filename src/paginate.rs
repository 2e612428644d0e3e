//! Lazy enumeration over token-paginated listings.
use anyhow::Result;
use futures::stream::{self, Stream, TryStreamExt};
use std::future::Future;

use crate::model::Page;

enum Cursor {
    Start,
    Next(String),
    Done,
}

/// Pull items page by page from `list`, starting with no token and following
/// each page's continuation token until one is absent or empty.
///
/// Items come out in page order then in-page order. A page that fails ends
/// the stream with that error; nothing after it is requested.
pub fn paginate<T, F, Fut>(list: F) -> impl Stream<Item = Result<T>>
where
    F: FnMut(Option<String>) -> Fut,
    Fut: Future<Output = Result<Page<T>>>,
{
    stream::try_unfold((list, Cursor::Start), |(mut list, cursor)| async move {
        let token = match cursor {
            Cursor::Start => None,
            Cursor::Next(token) => Some(token),
            Cursor::Done => return Ok::<_, anyhow::Error>(None),
        };
        let page = list(token).await?;
        let next = match page.next_page_token.filter(|t| !t.is_empty()) {
            Some(token) => Cursor::Next(token),
            None => Cursor::Done,
        };
        let items = stream::iter(page.items.into_iter().map(Ok::<T, anyhow::Error>));
        Ok(Some((items, (list, next))))
    })
    .try_flatten()
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use futures::StreamExt;
    use std::sync::{Arc, Mutex};

    fn scripted(
        pages: Vec<Result<Page<u32>>>,
    ) -> (
        impl FnMut(Option<String>) -> futures::future::Ready<Result<Page<u32>>>,
        Arc<Mutex<Vec<Option<String>>>>,
    ) {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let seen = calls.clone();
        let mut pages = pages.into_iter();
        let list = move |token: Option<String>| {
            seen.lock().unwrap().push(token);
            futures::future::ready(pages.next().unwrap_or_else(|| Err(anyhow!("over-read"))))
        };
        (list, calls)
    }

    #[tokio::test]
    async fn concatenates_pages_in_order() {
        let (list, calls) = scripted(vec![
            Ok(Page::new(vec![1, 2], Some("t1".into()))),
            Ok(Page::new(vec![], Some("t2".into()))),
            Ok(Page::new(vec![3], None)),
        ]);
        let items: Vec<u32> = paginate(list).try_collect().await.unwrap();
        assert_eq!(items, vec![1, 2, 3]);
        assert_eq!(
            *calls.lock().unwrap(),
            vec![None, Some("t1".to_string()), Some("t2".to_string())]
        );
    }

    #[tokio::test]
    async fn empty_token_ends_enumeration() {
        let (list, calls) = scripted(vec![
            Ok(Page::new(vec![7], Some(String::new()))),
            Ok(Page::new(vec![8], None)),
        ]);
        let items: Vec<u32> = paginate(list).try_collect().await.unwrap();
        assert_eq!(items, vec![7]);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn keeps_duplicates() {
        let (list, _) = scripted(vec![
            Ok(Page::new(vec![5, 5], Some("a".into()))),
            Ok(Page::last(vec![5])),
        ]);
        let items: Vec<u32> = paginate(list).try_collect().await.unwrap();
        assert_eq!(items, vec![5, 5, 5]);
    }

    #[tokio::test]
    async fn failed_page_propagates_after_earlier_items() {
        let (list, calls) = scripted(vec![
            Ok(Page::new(vec![1], Some("t1".into()))),
            Err(anyhow!("listing unavailable")),
            Ok(Page::last(vec![2])),
        ]);
        let results: Vec<Result<u32>> = paginate(list).collect().await;
        assert_eq!(results.len(), 2);
        assert_eq!(*results[0].as_ref().unwrap(), 1);
        assert!(results[1]
            .as_ref()
            .unwrap_err()
            .to_string()
            .contains("listing unavailable"));
        assert_eq!(calls.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn is_lazy_until_polled() {
        let (list, calls) = scripted(vec![
            Ok(Page::new(vec![1, 2], Some("t1".into()))),
            Ok(Page::last(vec![3])),
        ]);
        let stream = paginate(list);
        futures::pin_mut!(stream);
        assert!(calls.lock().unwrap().is_empty());
        assert_eq!(stream.next().await.unwrap().unwrap(), 1);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn many_pages_terminate() {
        let mut n = 0u32;
        let list = move |_token: Option<String>| {
            n += 1;
            let next = if n < 500 { Some(format!("p{}", n)) } else { None };
            futures::future::ready(Ok(Page::new(vec![n], next)))
        };
        let items: Vec<u32> = paginate(list).try_collect().await.unwrap();
        assert_eq!(items.len(), 500);
        assert_eq!(items.last(), Some(&500));
    }
}
