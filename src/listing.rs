use futures::compat::*;

use rusoto_core::credential::StaticProvider;
use rusoto_core::HttpClient;
use rusoto_s3::{ListObjectsV2Output, ListObjectsV2Request, S3Client, S3};
use tracing::debug;

use super::config::Config;
use super::Error;

pub fn client(config: &Config) -> Result<S3Client, Error> {
    let credentials = StaticProvider::new_minimal(
        config.access_key_id.clone(),
        config.secret_access_key.clone(),
    );
    let dispatcher = HttpClient::new()?;
    Ok(S3Client::new_with(dispatcher, credentials, config.region()))
}

pub struct ListingExecutor {
    s3_client: S3Client,
}

impl ListingExecutor {
    pub fn new(s3_client: S3Client) -> Self {
        Self { s3_client }
    }

    /// Returns every key in the bucket in the order the store lists them.
    pub async fn execute(&self, bucket: &str) -> Result<Vec<String>, Error> {
        let mut keys = Vec::new();
        let mut continuation_token: Option<String> = None;
        loop {
            let request = ListObjectsV2Request {
                bucket: bucket.to_string(),
                continuation_token: continuation_token.clone(),
                ..Default::default()
            };
            let output = self.s3_client.list_objects_v2(request).compat().await?;
            let next = collect_page(output, &mut keys)?;
            debug!(bucket, keys = keys.len(), more = next.is_some(), "listed page");
            match next {
                Some(token) if continuation_token.as_ref() == Some(&token) => {
                    let message = format!("listing returned continuation token {} twice", token);
                    return Err(message.into());
                }
                Some(token) => continuation_token = Some(token),
                None => break,
            }
        }
        Ok(keys)
    }
}

/// Appends the page's keys and returns the token for the next page, if any.
fn collect_page(
    ListObjectsV2Output {
        contents,
        is_truncated,
        next_continuation_token,
        ..
    }: ListObjectsV2Output,
    keys: &mut Vec<String>,
) -> Result<Option<String>, Error> {
    keys.extend(contents.unwrap_or_default().into_iter().filter_map(|o| o.key));
    if !is_truncated.unwrap_or(false) {
        return Ok(None);
    }
    match next_continuation_token {
        Some(token) => Ok(Some(token)),
        None => Err("truncated listing without continuation token".into()),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use rusoto_core::signature::SignedRequest;
    use rusoto_core::Region;
    use rusoto_core::request::DispatchSignedRequest;
    use rusoto_mock::{MockCredentialsProvider, MockRequestDispatcher};
    use rusoto_s3::Object;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Local stand-in for `rusoto_mock::MultipleMockRequestDispatcher`, which only exists in
    /// `rusoto_mock` 0.44+ (the async rusoto line). Serves one dispatcher per request, in order.
    pub(crate) struct MultipleMockRequestDispatcher {
        dispatchers: Mutex<VecDeque<MockRequestDispatcher>>,
    }

    impl MultipleMockRequestDispatcher {
        pub(crate) fn new(dispatchers: Vec<MockRequestDispatcher>) -> Self {
            MultipleMockRequestDispatcher {
                dispatchers: Mutex::new(dispatchers.into()),
            }
        }
    }

    impl DispatchSignedRequest for MultipleMockRequestDispatcher {
        type Future = <MockRequestDispatcher as DispatchSignedRequest>::Future;

        fn dispatch(&self, request: SignedRequest, timeout: Option<Duration>) -> Self::Future {
            self.dispatchers
                .lock()
                .unwrap()
                .pop_front()
                .unwrap()
                .dispatch(request, timeout)
        }
    }

    fn object(key: Option<&str>) -> Object {
        Object {
            key: key.map(str::to_string),
            ..Default::default()
        }
    }

    /// A `ListObjectsV2` response body holding `keys`, continued by `next` when set.
    fn page_body(keys: &[&str], next: Option<&str>) -> String {
        let mut body = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\
             <ListBucketResult xmlns=\"http://s3.amazonaws.com/doc/2006-03-01/\">\
             <Name>photos</Name>",
        );
        match next {
            Some(token) => {
                body.push_str("<IsTruncated>true</IsTruncated>");
                body.push_str(&format!(
                    "<NextContinuationToken>{}</NextContinuationToken>",
                    token
                ));
            }
            None => body.push_str("<IsTruncated>false</IsTruncated>"),
        }
        for key in keys {
            body.push_str(&format!("<Contents><Key>{}</Key></Contents>", key));
        }
        body.push_str("</ListBucketResult>");
        body
    }

    fn continuation_token(request: &SignedRequest) -> Option<String> {
        request.params.get("continuation-token").cloned().flatten()
    }

    pub(crate) fn page(
        keys: &[&str],
        next: Option<&str>,
        expected_token: Option<&'static str>,
    ) -> MockRequestDispatcher {
        MockRequestDispatcher::with_status(200)
            .with_body(&page_body(keys, next))
            .with_request_checker(move |request: &SignedRequest| {
                assert_eq!(continuation_token(request).as_deref(), expected_token);
            })
    }

    pub(crate) fn paged_client(pages: Vec<MockRequestDispatcher>) -> S3Client {
        S3Client::new_with(
            MultipleMockRequestDispatcher::new(pages),
            MockCredentialsProvider,
            Region::UsEast1,
        )
    }

    #[test]
    fn collects_keys_in_order_and_skips_keyless_objects() {
        let mut keys = vec!["images/20240101abc/0.jpg".to_string()];
        let output = ListObjectsV2Output {
            contents: Some(vec![
                object(Some("images/20240101abc/1.jpg")),
                object(None),
                object(Some("images/20240101abc/2.png")),
            ]),
            is_truncated: Some(false),
            ..Default::default()
        };
        assert_eq!(collect_page(output, &mut keys).unwrap(), None);
        assert_eq!(
            keys,
            vec![
                "images/20240101abc/0.jpg",
                "images/20240101abc/1.jpg",
                "images/20240101abc/2.png",
            ]
        );
    }

    #[test]
    fn truncated_page_yields_token() {
        let mut keys = Vec::new();
        let output = ListObjectsV2Output {
            contents: None,
            is_truncated: Some(true),
            next_continuation_token: Some("next".to_string()),
            ..Default::default()
        };
        assert_eq!(collect_page(output, &mut keys).unwrap(), Some("next".to_string()));
        assert!(keys.is_empty());
    }

    #[test]
    fn token_ignored_when_not_truncated() {
        let mut keys = Vec::new();
        let output = ListObjectsV2Output {
            next_continuation_token: Some("stale".to_string()),
            ..Default::default()
        };
        assert_eq!(collect_page(output, &mut keys).unwrap(), None);
    }

    #[test]
    fn truncated_page_without_token_is_an_error() {
        let mut keys = Vec::new();
        let output = ListObjectsV2Output {
            is_truncated: Some(true),
            ..Default::default()
        };
        assert!(collect_page(output, &mut keys).is_err());
    }

    #[tokio::test]
    async fn follows_every_page_in_order() {
        let client = paged_client(vec![
            page(
                &["images/20240101abc/2.png", "README.md"],
                Some("page-2"),
                None,
            ),
            page(
                &["images/20240101abc/1.jpg", "images/20240202def/a.jpg"],
                Some("page-3"),
                Some("page-2"),
            ),
            page(&["images/20240101abc/0.jpg"], None, Some("page-3")),
        ]);

        let keys = ListingExecutor::new(client).execute("photos").await.unwrap();
        assert_eq!(
            keys,
            vec![
                "images/20240101abc/2.png",
                "README.md",
                "images/20240101abc/1.jpg",
                "images/20240202def/a.jpg",
                "images/20240101abc/0.jpg",
            ]
        );
    }

    #[tokio::test]
    async fn repeated_token_is_an_error() {
        let client = paged_client(vec![
            page(&["a"], Some("again"), None),
            page(&["b"], Some("again"), Some("again")),
        ]);
        let result = ListingExecutor::new(client).execute("photos").await;
        assert!(matches!(result, Err(Error::String(_))));
    }

    #[tokio::test]
    async fn service_failure_is_an_error() {
        let client = paged_client(vec![MockRequestDispatcher::with_status(500)]);
        let result = ListingExecutor::new(client).execute("photos").await;
        assert!(matches!(result, Err(Error::Rusoto(_))));
    }
}
