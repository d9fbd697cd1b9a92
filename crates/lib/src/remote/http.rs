//! HTTP implementation of `RemoteService` (reqwest).
//!
//! Status is checked before the body is read; non-2xx responses capture the
//! body text for the error. Empty and non-JSON bodies are distinct errors so
//! callers can log them apart.

use super::wire::{self, AckResponse, HistoryResponse, SendTurnRequest, SendTurnResponse};
use super::{HistoryPage, RemoteError, RemoteService};
use crate::context::World;
use crate::settings::UserSettings;
use async_trait::async_trait;
use serde::de::DeserializeOwned;

#[derive(Clone)]
pub struct HttpRemote {
    base_url: String,
    token: Option<String>,
    client: reqwest::Client,
}

impl HttpRemote {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
            client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn read_json<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, RemoteError> {
        let status = res.status();
        let body = res.text().await?;
        if !status.is_success() {
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }
        if body.trim().is_empty() {
            return Err(RemoteError::EmptyBody);
        }
        serde_json::from_str(&body).map_err(|e| RemoteError::Malformed(e.to_string()))
    }

    fn check_ack(ack: AckResponse) -> Result<(), RemoteError> {
        if ack.ok {
            Ok(())
        } else {
            Err(RemoteError::Api(
                ack.error.unwrap_or_else(|| "unknown error".to_string()),
            ))
        }
    }

    fn history_path(world_id: Option<&str>) -> String {
        match world_id {
            Some(id) => format!("/api/worlds/{id}/history"),
            None => "/api/history".to_string(),
        }
    }
}

#[async_trait]
impl RemoteService for HttpRemote {
    async fn send_turn(&self, request: SendTurnRequest) -> Result<Option<String>, RemoteError> {
        let res = self
            .request(self.client.post(self.url("/api/chat")))
            .json(&request)
            .send()
            .await?;
        let data: SendTurnResponse = Self::read_json(res).await?;
        if !data.ok {
            return Err(RemoteError::Api(
                data.error.unwrap_or_else(|| "unknown error".to_string()),
            ));
        }
        Ok(data.reply)
    }

    async fn fetch_initial_history(
        &self,
        world_id: Option<&str>,
    ) -> Result<HistoryPage, RemoteError> {
        let res = self
            .request(self.client.get(self.url(&Self::history_path(world_id))))
            .send()
            .await?;
        let data: HistoryResponse = Self::read_json(res).await?;
        Ok(HistoryPage {
            turns: wire::normalize_page(data.items),
            continuation_token: data.continuation_token,
        })
    }

    async fn fetch_older_history(
        &self,
        world_id: &str,
        continuation_token: &str,
    ) -> Result<HistoryPage, RemoteError> {
        let res = self
            .request(self.client.get(self.url(&Self::history_path(Some(world_id)))))
            .query(&[("token", continuation_token)])
            .send()
            .await?;
        let data: HistoryResponse = Self::read_json(res).await?;
        Ok(HistoryPage {
            turns: wire::normalize_page(data.items),
            continuation_token: data.continuation_token,
        })
    }

    async fn delete_turn(
        &self,
        world_id: Option<&str>,
        remote_id: &str,
    ) -> Result<(), RemoteError> {
        let path = format!("{}/{remote_id}", Self::history_path(world_id));
        let res = self.request(self.client.delete(self.url(&path))).send().await?;
        Self::check_ack(Self::read_json(res).await?)
    }

    async fn fetch_settings(&self) -> Result<UserSettings, RemoteError> {
        let res = self
            .request(self.client.get(self.url("/api/settings")))
            .send()
            .await?;
        Self::read_json(res).await
    }

    async fn save_settings(&self, settings: &UserSettings) -> Result<(), RemoteError> {
        let res = self
            .request(self.client.put(self.url("/api/settings")))
            .json(settings)
            .send()
            .await?;
        Self::check_ack(Self::read_json(res).await?)
    }

    async fn list_worlds(&self) -> Result<Vec<World>, RemoteError> {
        let res = self
            .request(self.client.get(self.url("/api/worlds")))
            .send()
            .await?;
        Self::read_json(res).await
    }

    async fn save_world(&self, world: &World) -> Result<(), RemoteError> {
        let path = format!("/api/worlds/{}", world.id);
        let res = self
            .request(self.client.put(self.url(&path)))
            .json(world)
            .send()
            .await?;
        Self::check_ack(Self::read_json(res).await?)
    }

    async fn delete_world(&self, world_id: &str) -> Result<(), RemoteError> {
        let path = format!("/api/worlds/{world_id}");
        let res = self.request(self.client.delete(self.url(&path))).send().await?;
        Self::check_ack(Self::read_json(res).await?)
    }
}
