use crate::domain::{Order, Orderbook, Project, PublicKey, Settings};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const DEFAULT_ENDPOINT: &str = "https://virginia.solana.dex.blxrbdn.com";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TraderError {
    #[error("invalid endpoint: {0}")]
    Endpoint(String),

    #[error("not configured: {0}")]
    NotConfigured(&'static str),

    #[error("request failed with status {0}")]
    Status(u16),

    #[error("request failed: {0}")]
    Transport(String),

    #[error("failed to decode response: {0}")]
    Decode(String),
}

impl From<ureq::Error> for TraderError {
    fn from(error: ureq::Error) -> Self {
        match error {
            ureq::Error::StatusCode(code) => Self::Status(code),
            other => Self::Transport(other.to_string()),
        }
    }
}

/// Remote calls the query stages issue. Implementations block; callers run them off the UI thread.
pub trait TraderApi: Send + Sync {
    fn open_orders(
        &self,
        market: &str,
        owner: PublicKey,
        open_orders_address: PublicKey,
        project: Project,
    ) -> Result<Vec<Order>, TraderError>;

    fn orderbook(
        &self,
        market: &str,
        limit: Option<u32>,
        project: Project,
    ) -> Result<Orderbook, TraderError>;
}

pub trait Connector: Send + Sync {
    fn connect(&self, settings: &Settings) -> Result<Arc<dyn TraderApi>, TraderError>;
}

/// Shared handle to a connected client.
#[derive(Clone)]
pub struct ClientHandle(pub Arc<dyn TraderApi>);

impl fmt::Debug for ClientHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ClientHandle")
    }
}

#[derive(Clone, Debug)]
pub struct HttpConnector {
    endpoint: Url,
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(endpoint: &str) -> Result<Self, TraderError> {
        let endpoint =
            Url::parse(endpoint).map_err(|error| TraderError::Endpoint(error.to_string()))?;
        if endpoint.cannot_be_a_base() {
            return Err(TraderError::Endpoint(endpoint.to_string()));
        }
        Ok(Self {
            endpoint,
            timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl Connector for HttpConnector {
    fn connect(&self, settings: &Settings) -> Result<Arc<dyn TraderApi>, TraderError> {
        if settings.auth_header.is_empty() {
            return Err(TraderError::NotConfigured("auth header is empty"));
        }
        let client = HttpTraderClient {
            agent: make_agent(self.timeout),
            endpoint: self.endpoint.clone(),
            auth_header: settings.auth_header.clone(),
        };
        let _: serde_json::Value = client.get_json(api_url(
            &client.endpoint,
            &["api", "v1", "system", "server-time"],
        )?)?;
        Ok(Arc::new(client))
    }
}

#[derive(Debug, Default, Deserialize)]
struct OpenOrdersResponse {
    #[serde(default)]
    orders: Vec<Order>,
}

struct HttpTraderClient {
    agent: ureq::Agent,
    endpoint: Url,
    auth_header: String,
}

impl HttpTraderClient {
    fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, TraderError> {
        debug!(%url, "trader api request");
        let mut response = self
            .agent
            .get(url.as_str())
            .header("Authorization", &self.auth_header)
            .header(
                "User-Agent",
                &format!("{}/{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
            )
            .call()?;
        response
            .body_mut()
            .read_json::<T>()
            .map_err(|error| TraderError::Decode(error.to_string()))
    }
}

impl TraderApi for HttpTraderClient {
    fn open_orders(
        &self,
        market: &str,
        owner: PublicKey,
        open_orders_address: PublicKey,
        project: Project,
    ) -> Result<Vec<Order>, TraderError> {
        let mut url = api_url(&self.endpoint, &["api", "v1", "trade", "openorders", market])?;
        url.query_pairs_mut()
            .append_pair("address", &owner.to_base58())
            .append_pair("openOrdersAddress", &open_orders_address.to_base58())
            .append_pair("project", project.as_str());
        let response: OpenOrdersResponse = self.get_json(url)?;
        Ok(response.orders)
    }

    fn orderbook(
        &self,
        market: &str,
        limit: Option<u32>,
        project: Project,
    ) -> Result<Orderbook, TraderError> {
        let mut url = api_url(&self.endpoint, &["api", "v1", "market", "orderbooks", market])?;
        {
            let mut pairs = url.query_pairs_mut();
            if let Some(limit) = limit {
                pairs.append_pair("limit", &limit.to_string());
            }
            pairs.append_pair("project", project.as_str());
        }
        self.get_json(url)
    }
}

fn api_url(endpoint: &Url, segments: &[&str]) -> Result<Url, TraderError> {
    let mut url = endpoint.clone();
    url.set_query(None);
    url.set_fragment(None);
    url.path_segments_mut()
        .map_err(|()| TraderError::Endpoint(endpoint.to_string()))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn make_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .build();
    config.into()
}
