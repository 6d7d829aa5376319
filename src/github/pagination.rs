//! Link-header pagination.

use super::gateway::Gateway;
use super::transport::ApiRequest;
use crate::errors::GatewayError;
use serde::de::DeserializeOwned;

/// Extract the `rel="next"` URL from a GitHub `Link` header.
pub fn parse_next_link(link: &str) -> Option<String> {
    link.split(',').find_map(|part| {
        let mut segments = part.split(';');
        let url = segments.next()?.trim();
        let is_next = segments.any(|s| s.trim() == "rel=\"next\"");
        if is_next {
            url.strip_prefix('<')
                .and_then(|u| u.strip_suffix('>'))
                .map(str::to_string)
        } else {
            None
        }
    })
}

/// A lazy, finite, restartable sequence of result pages.
///
/// Nothing is fetched until [`Pages::next_page`] is called. Each page is a
/// JSON array; the sequence ends when the response carries no `next` link or
/// when the page cap is reached.
pub struct Pages<'g> {
    gateway: &'g Gateway,
    first: ApiRequest,
    next: Option<ApiRequest>,
    fetched: usize,
    max_pages: usize,
}

impl<'g> Pages<'g> {
    pub(crate) fn new(gateway: &'g Gateway, first: ApiRequest, max_pages: usize) -> Self {
        Self {
            gateway,
            next: Some(first.clone()),
            first,
            fetched: 0,
            max_pages,
        }
    }

    /// Fetch the next page, or `None` once the sequence is finished.
    pub async fn next_page(&mut self) -> Result<Option<Vec<serde_json::Value>>, GatewayError> {
        let Some(request) = self.next.take() else {
            return Ok(None);
        };
        if self.fetched >= self.max_pages {
            return Err(GatewayError::TooManyPages {
                endpoint: self.gateway.endpoint_of(&self.first.url),
                max_pages: self.max_pages,
            });
        }

        let response = self.gateway.execute(&request).await?;
        self.fetched += 1;

        let endpoint = self.gateway.endpoint_of(&request.url);
        let items: Vec<serde_json::Value> =
            serde_json::from_str(&response.body).map_err(|e| GatewayError::Decode {
                endpoint,
                message: e.to_string(),
            })?;

        // The next URL already carries every query parameter.
        self.next = response
            .meta
            .link
            .as_deref()
            .and_then(parse_next_link)
            .map(ApiRequest::get);

        Ok(Some(items))
    }

    /// Start again from the first page.
    pub fn restart(&mut self) {
        self.next = Some(self.first.clone());
        self.fetched = 0;
    }

    /// Drain all remaining pages into typed records.
    pub async fn collect_all<T: DeserializeOwned>(mut self) -> Result<Vec<T>, GatewayError> {
        let endpoint = self.gateway.endpoint_of(&self.first.url);
        let mut all = Vec::new();
        while let Some(page) = self.next_page().await? {
            for item in page {
                let record = serde_json::from_value(item).map_err(|e| GatewayError::Decode {
                    endpoint: endpoint.clone(),
                    message: e.to_string(),
                })?;
                all.push(record);
            }
        }
        Ok(all)
    }
}
