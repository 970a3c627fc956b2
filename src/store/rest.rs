use std::io;
use std::marker::PhantomData;

use async_trait::async_trait;
use futures::StreamExt;
use futures::TryStreamExt;
use reqwest::header::HeaderMap;
use reqwest::header::HeaderValue;
use reqwest::header::AUTHORIZATION;
use serde::Deserialize;
use tokio::io::AsyncBufReadExt;
use tokio_stream::wrappers::LinesStream;
use tokio_util::io::StreamReader;
use tracing::debug;

use super::EventStream;
use super::ListWatch;
use super::WatchEvent;
use crate::constants::API_GROUP_PREFIX;
use crate::constants::SUBSTRATE_GROUP_PREFIX;
use crate::DispatchError;
use crate::ExecutionSubstrate;
use crate::ExecutionUnit;
use crate::ResourceList;
use crate::StoreConfig;
use crate::StoreError;
use crate::WatchedResource;

/// REST client for one resource kind: JSON list plus a JSON-lines watch
/// stream.
pub struct RestListWatch<R> {
    client: reqwest::Client,
    base_url: String,
    _marker: PhantomData<fn() -> R>,
}

impl<R: WatchedResource> RestListWatch<R> {
    pub fn new(config: &StoreConfig) -> std::result::Result<Self, StoreError> {
        Ok(Self {
            client: build_client(config)?,
            base_url: group_url(config, API_GROUP_PREFIX)?,
            _marker: PhantomData,
        })
    }
}

#[async_trait]
impl<R: WatchedResource> ListWatch<R> for RestListWatch<R> {
    async fn list(&self) -> std::result::Result<Vec<R>, StoreError> {
        let url = format!("{}/{}", self.base_url, R::KIND);
        let response = check_status(self.client.get(&url).send().await?).await?;
        let list: ResourceList<R> = response.json().await?;
        debug!(kind = %R::KIND, items = list.items.len(), "listed objects");
        Ok(list.items)
    }

    async fn watch(&self) -> std::result::Result<EventStream<R>, StoreError> {
        let url = format!("{}/{}?watch=true", self.base_url, R::KIND);
        let response = check_status(self.client.get(&url).send().await?).await?;
        debug!(kind = %R::KIND, "watch stream established");

        let bytes = response
            .bytes_stream()
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e));
        let lines = LinesStream::new(StreamReader::new(bytes).lines());
        let events = lines.filter_map(|line| async move {
            match line {
                Ok(line) if line.trim().is_empty() => None,
                Ok(line) => Some(parse_watch_line::<R>(&line)),
                Err(e) => Some(Err(StoreError::WatchStream(e.to_string()))),
            }
        });
        Ok(events.boxed())
    }
}

async fn check_status(
    response: reqwest::Response,
) -> std::result::Result<reqwest::Response, StoreError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Status { status, body })
}

/// Wire shape of one watch stream line.
#[derive(Deserialize)]
struct WatchLine<R> {
    #[serde(rename = "type")]
    event_type: String,
    object: R,
}

pub(crate) fn parse_watch_line<R: WatchedResource>(
    line: &str,
) -> std::result::Result<WatchEvent<R>, StoreError> {
    let parsed: WatchLine<R> =
        serde_json::from_str(line).map_err(|e| StoreError::MalformedEvent(e.to_string()))?;
    match parsed.event_type.as_str() {
        "ADDED" => Ok(WatchEvent::Added(parsed.object)),
        "MODIFIED" => Ok(WatchEvent::Modified(parsed.object)),
        "DELETED" => Ok(WatchEvent::Deleted(parsed.object)),
        other => Err(StoreError::MalformedEvent(format!(
            "unknown event type: {}",
            other
        ))),
    }
}

/// REST client for the execution substrate. Submission is fire-and-forget:
/// acceptance by the substrate is the success signal, completion is only
/// observable through the watch path.
pub struct RestSubstrate {
    client: reqwest::Client,
    base_url: String,
}

impl RestSubstrate {
    pub fn new(config: &StoreConfig) -> std::result::Result<Self, StoreError> {
        Ok(Self {
            client: build_client(config)?,
            base_url: group_url(config, SUBSTRATE_GROUP_PREFIX)?,
        })
    }
}

#[async_trait]
impl ExecutionSubstrate for RestSubstrate {
    async fn submit(&self, unit: ExecutionUnit) -> std::result::Result<(), DispatchError> {
        let url = format!("{}/namespaces/{}/executions", self.base_url, unit.namespace);
        let response = self
            .client
            .post(&url)
            .json(&unit)
            .send()
            .await
            .map_err(|e| DispatchError::Substrate(StoreError::Http(e)))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(DispatchError::Rejected {
                name: unit.name,
                reason: format!("{}: {}", status, body),
            });
        }
        debug!(unit = %unit.name, "execution unit accepted");
        Ok(())
    }
}

fn build_client(config: &StoreConfig) -> std::result::Result<reqwest::Client, StoreError> {
    let mut headers = HeaderMap::new();
    if let Some(token) = &config.token {
        let value = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| StoreError::InvalidCredentials)?;
        headers.insert(AUTHORIZATION, value);
    }
    Ok(reqwest::Client::builder()
        .default_headers(headers)
        .connect_timeout(config.connect_timeout())
        .build()?)
}

fn group_url(config: &StoreConfig, prefix: &str) -> std::result::Result<String, StoreError> {
    let url = reqwest::Url::parse(&config.endpoint)
        .map_err(|e| StoreError::InvalidEndpoint(e.to_string()))?;
    Ok(format!("{}/{}", url.as_str().trim_end_matches('/'), prefix))
}
