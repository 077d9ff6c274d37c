use bytes::{Bytes, BytesMut};
use encoding_rs::{Encoding, UTF_8};
use mime::Mime;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use url::Url;

use crate::config::MirrorOptions;
use crate::error::FetchFailure;

/// Builds the client shared by the root fetch and every asset fetch of one
/// operation, so connections and cookies carry over between them.
pub fn build_http_client(options: &MirrorOptions) -> Result<Client, reqwest::Error> {
    ClientBuilder::new()
        .use_rustls_tls()
        .user_agent(options.user_agent.clone())
        .cookie_store(true)
        .timeout(options.timeout)
        .build()
}

/// A fetched HTML page: the raw body and its decoded text.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub body: Bytes,
    pub text: String,
    /// The encoding `text` was decoded from, used to write derived pages
    /// back in the same encoding.
    pub encoding: &'static Encoding,
}

/// Fetches a page like [`fetch`] and decodes it with the charset of its
/// `Content-Type`, falling back to UTF-8. A byte order mark takes precedence.
pub async fn fetch_page(
    client: &Client,
    url: &str,
    timeout: Duration,
    max_size: u64,
) -> Result<FetchedPage, FetchFailure> {
    let (content_type, body) = get(client, url, timeout, max_size).await?;
    let encoding = charset_encoding(content_type.as_deref());
    let (text, encoding, _) = encoding.decode(&body);
    Ok(FetchedPage { text: text.into_owned(), body, encoding })
}

/// The encoding named by the `charset` parameter of a `Content-Type` value.
pub fn charset_encoding(content_type: Option<&str>) -> &'static Encoding {
    content_type
        .and_then(|value| value.parse::<Mime>().ok())
        .and_then(|parsed| parsed.get_param(mime::CHARSET).and_then(|charset| Encoding::for_label(charset.as_str().as_bytes())))
        .unwrap_or(UTF_8)
}

/// Performs one bounded GET and returns the body.
///
/// Non-`http(s)` URLs fail with [`FetchFailure::InvalidUrl`] before any
/// request is made. A declared `Content-Length` above `max_size` fails
/// without reading the body; an undeclared body is read chunk by chunk and
/// abandoned as soon as it crosses the limit.
pub async fn fetch(client: &Client, url: &str, timeout: Duration, max_size: u64) -> Result<Bytes, FetchFailure> {
    get(client, url, timeout, max_size).await.map(|(_, body)| body)
}

async fn get(
    client: &Client,
    url: &str,
    timeout: Duration,
    max_size: u64,
) -> Result<(Option<String>, Bytes), FetchFailure> {
    let parsed = match Url::parse(url) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => parsed,
        _ => return Err(FetchFailure::InvalidUrl { url: url.to_string() }),
    };

    let mut response = client
        .get(parsed)
        .timeout(timeout)
        .send()
        .await
        .map_err(|e| FetchFailure::from_reqwest(url, &e))?;

    let status = response.status();
    log::debug!("HTTP {} for {}", status, url);
    if !status.is_success() {
        return Err(FetchFailure::HttpError { url: url.to_string(), status });
    }

    if let Some(declared) = response.content_length() {
        if declared > max_size {
            return Err(FetchFailure::TooLarge { url: url.to_string(), size: declared, limit: max_size });
        }
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);

    let capacity = response.content_length().unwrap_or(0) as usize;
    let mut body = BytesMut::with_capacity(capacity);
    while let Some(chunk) = response.chunk().await.map_err(|e| FetchFailure::from_reqwest(url, &e))? {
        let size = (body.len() + chunk.len()) as u64;
        if size > max_size {
            return Err(FetchFailure::TooLarge { url: url.to_string(), size, limit: max_size });
        }
        body.extend_from_slice(&chunk);
    }

    Ok((content_type, body.freeze()))
}
