// Copyright (c) 2024-2026 Nervosys LLC
// SPDX-License-Identifier: AGPL-3.0-only
//! Graph collection paging via `@odata.nextLink`

use super::transport::HttpTransport;
use super::ApiClient;
use crate::error::AuditError;
use serde::de::DeserializeOwned;
use serde::Deserialize;

/// Microsoft Graph API response wrapper
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: DeserializeOwned"))]
struct GraphPage<T> {
    #[serde(default)]
    value: Vec<T>,
    #[serde(rename = "@odata.nextLink")]
    next_link: Option<String>,
}

/// Items gathered from a paged collection.
///
/// A failure part-way through does not discard what was already read: the
/// pages fetched so far are kept in `items` and the failure is in `interrupted`.
#[derive(Debug)]
pub struct Paged<T> {
    pub items: Vec<T>,
    /// Requests issued, including the one that failed
    pub requests: usize,
    pub interrupted: Option<AuditError>,
}

impl<T> Paged<T> {
    pub fn is_complete(&self) -> bool {
        self.interrupted.is_none()
    }
}

/// Fetch every page of a Graph collection.
///
/// The first request uses `endpoint` and `query`; each following request goes
/// to the server's continuation link verbatim, without the first request's query.
pub fn fetch_all<T, H>(
    client: &mut ApiClient<H>,
    endpoint: &str,
    query: &[(&str, &str)],
) -> Paged<T>
where
    T: DeserializeOwned,
    H: HttpTransport,
{
    let mut paged = Paged {
        items: Vec::new(),
        requests: 0,
        interrupted: None,
    };
    let mut next_link: Option<String> = None;

    loop {
        paged.requests += 1;
        let result = match next_link.as_deref() {
            Some(link) => client.graph_get(link, &[]),
            None => client.graph_get(endpoint, query),
        };

        let page = result.and_then(|response| response.json::<GraphPage<T>>());
        match page {
            Ok(page) => {
                paged.items.extend(page.value);
                match page.next_link {
                    Some(link) if !link.is_empty() => next_link = Some(link),
                    _ => break,
                }
            }
            Err(e) => {
                if next_link.is_some() {
                    log::error!("Error fetching next page of {}: {}", endpoint, e);
                } else {
                    log::error!("Graph API request failed for {}: {}", endpoint, e);
                }
                paged.interrupted = Some(e);
                break;
            }
        }
    }

    paged
}
