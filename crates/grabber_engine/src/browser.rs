use std::sync::Arc;
use std::time::Duration;

use grabber_logging::grabber_trace;

use crate::decode::decode_page;
use crate::fetch::Fetcher;
use crate::FetchError;

/// Opens pages. Each opened page is one independent page lifetime.
#[async_trait::async_trait]
pub trait Browser: Send + Sync {
    async fn open(&self, url: &str) -> Result<Box<dyn Page>, FetchError>;
}

/// One loaded page: a DOM snapshot that may change after load.
#[async_trait::async_trait]
pub trait Page: Send {
    fn url(&self) -> &str;

    /// The current document as HTML.
    fn html(&self) -> &str;

    /// Resolves once the document structure has changed; [`Page::html`]
    /// then returns the new snapshot. Callers bound this with a timeout.
    async fn changed(&mut self) -> Result<(), FetchError>;

    async fn close(&mut self) {}
}

/// Loads pages over HTTP. Structural changes are observed by refetching the
/// page every `refresh` until its HTML differs from the last snapshot.
pub struct HttpBrowser {
    fetcher: Arc<dyn Fetcher>,
    refresh: Duration,
}

impl HttpBrowser {
    pub fn new(fetcher: Arc<dyn Fetcher>, refresh: Duration) -> Self {
        Self { fetcher, refresh }
    }
}

#[async_trait::async_trait]
impl Browser for HttpBrowser {
    async fn open(&self, url: &str) -> Result<Box<dyn Page>, FetchError> {
        let html = load_html(self.fetcher.as_ref(), url).await?;
        Ok(Box::new(HttpPage {
            url: url.to_string(),
            html,
            fetcher: self.fetcher.clone(),
            refresh: self.refresh,
        }))
    }
}

struct HttpPage {
    url: String,
    html: String,
    fetcher: Arc<dyn Fetcher>,
    refresh: Duration,
}

#[async_trait::async_trait]
impl Page for HttpPage {
    fn url(&self) -> &str {
        &self.url
    }

    fn html(&self) -> &str {
        &self.html
    }

    async fn changed(&mut self) -> Result<(), FetchError> {
        loop {
            tokio::time::sleep(self.refresh).await;
            let html = load_html(self.fetcher.as_ref(), &self.url).await?;
            if html != self.html {
                grabber_trace!("{} changed ({} bytes)", self.url, html.len());
                self.html = html;
                return Ok(());
            }
        }
    }
}

async fn load_html(fetcher: &dyn Fetcher, url: &str) -> Result<String, FetchError> {
    let output = fetcher.fetch(url).await?;
    Ok(decode_page(&output.bytes, output.metadata.content_type.as_deref()).html)
}
