//! Channel catalog retrieval
//!
//! The catalog is a single GraphQL `getChannels` query. [`CatalogFetcher`]
//! issues it over HTTP; anything else that can produce an ordered list of
//! [`RawChannelRecord`]s can stand in through [`CatalogSource`].

use crate::config::{CatalogConfig, RetryConfig};
use crate::error::{Error, NetworkError, ProtocolError, Result};
use crate::retry::with_retry;
use crate::types::RawChannelRecord;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// GraphQL operation name sent with every catalog request
pub const OPERATION_NAME: &str = "getChannels";

/// The catalog query, ordered by ascending priority
pub const CHANNELS_QUERY: &str = "query getChannels($NumOfItems: Int) @cacheControl(maxAge: 600) {
  queryChannel(
    first: $NumOfItems
    filter: {product: {alloftext: \"tw\"}, enable: true}
    order: {asc: priority}
  ) {
    ChannelID
    priority
    name
    descriptor
    description
    name_english
    image_name
    has_archive
    type {
      descriptor
      name
    }
  }
}
";

/// Where the channel list lives in the response body
const LIST_PATH: &str = "data.queryChannel";

/// Source of the ordered channel list for one run
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch every channel record, in service order
    async fn fetch(&self) -> Result<Vec<RawChannelRecord>>;
}

/// A fixed list of records, served as-is
#[async_trait]
impl CatalogSource for Vec<RawChannelRecord> {
    async fn fetch(&self) -> Result<Vec<RawChannelRecord>> {
        Ok(self.clone())
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GraphQlRequest<'a> {
    operation_name: &'a str,
    variables: Variables,
    query: &'a str,
}

#[derive(Debug, Default, Serialize)]
struct Variables {
    #[serde(rename = "NumOfItems", skip_serializing_if = "Option::is_none")]
    num_of_items: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<ChannelsData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct ChannelsData {
    #[serde(rename = "queryChannel", default)]
    query_channel: Option<Vec<RawChannelRecord>>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// HTTP client for the channel catalog
#[derive(Clone, Debug)]
pub struct CatalogFetcher {
    http_client: reqwest::Client,
    config: CatalogConfig,
    retry: RetryConfig,
}

impl CatalogFetcher {
    /// Create a fetcher for the configured endpoint
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be created
    pub fn new(config: CatalogConfig, retry: RetryConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("tvdesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::http_client("catalog", e))?;

        Ok(Self {
            http_client,
            config,
            retry,
        })
    }

    /// JSON body of the catalog request
    fn request_body(&self) -> GraphQlRequest<'static> {
        GraphQlRequest {
            operation_name: OPERATION_NAME,
            variables: Variables {
                num_of_items: self.config.item_count,
            },
            query: CHANNELS_QUERY,
        }
    }

    /// One POST, no retry
    async fn fetch_once(&self) -> Result<Vec<RawChannelRecord>> {
        let endpoint = &self.config.endpoint;
        debug!(endpoint = %endpoint, "Querying channel catalog");

        let response = self
            .http_client
            .post(endpoint)
            .header(reqwest::header::ACCEPT, "application/json, text/plain, */*")
            .header(reqwest::header::REFERER, &self.config.referer)
            .json(&self.request_body())
            .send()
            .await
            .map_err(|e| Error::transport(endpoint, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(NetworkError::Status {
                url: endpoint.clone(),
                status: status.as_u16(),
            }
            .into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| Error::transport(endpoint, e))?;

        parse_response(&body)
    }
}

#[async_trait]
impl CatalogSource for CatalogFetcher {
    async fn fetch(&self) -> Result<Vec<RawChannelRecord>> {
        let records = with_retry(&self.retry, || self.fetch_once()).await?;
        info!(
            endpoint = %self.config.endpoint,
            records = records.len(),
            "Fetched channel catalog"
        );
        Ok(records)
    }
}

/// Extract the channel list from a catalog response body
///
/// GraphQL errors are only fatal when no list came back with them.
pub fn parse_response(body: &[u8]) -> Result<Vec<RawChannelRecord>> {
    let response: GraphQlResponse = serde_json::from_slice(body).map_err(ProtocolError::from)?;

    match response.data.and_then(|d| d.query_channel) {
        Some(records) => {
            if !response.errors.is_empty() {
                tracing::warn!(
                    errors = response.errors.len(),
                    "Catalog returned partial data with errors"
                );
            }
            Ok(records)
        }
        None if !response.errors.is_empty() => Err(ProtocolError::GraphQl {
            messages: response.errors.into_iter().map(|e| e.message).collect(),
        }
        .into()),
        None => Err(ProtocolError::MissingField {
            path: LIST_PATH.to_string(),
        }
        .into()),
    }
}
