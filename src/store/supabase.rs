//! Supabase REST API client using service_role key

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Serialize};
use uuid::Uuid;

use crate::game::ProgressRecord;

use super::profiles::{apply_progress, NewProfile, ProgressStore, StoredProfile};
use super::StoreError;

/// Profiles table
const PLAYERS_TABLE: &str = "players";

/// Supabase client for server-side database operations
/// Uses service_role key which bypasses RLS - handle with care!
#[derive(Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    service_role_key: String,
}

impl SupabaseClient {
    pub fn new(base_url: &str, service_role_key: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            service_role_key: service_role_key.to_string(),
        }
    }

    /// Get the REST API URL for a table
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.rest_url(table))
            .header("apikey", &self.service_role_key)
            .header("Authorization", format!("Bearer {}", self.service_role_key))
            .header("Content-Type", "application/json")
    }

    /// Make an authenticated GET request expecting a single row
    pub async fn get_one<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Option<T>, StoreError> {
        let response = self
            .request(reqwest::Method::GET, table)
            .query(filters)
            .header("Accept", "application/vnd.pgrst.object+json")
            .send()
            .await
            .map_err(StoreError::Request)?;

        if response.status() == StatusCode::NOT_ACCEPTABLE {
            // No rows found
            return Ok(None);
        }

        let response = check_status(response).await?;
        response.json().await.map(Some).map_err(StoreError::Parse)
    }

    /// Make an authenticated POST request (insert)
    pub async fn insert<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        data: &T,
    ) -> Result<R, StoreError> {
        let response = self
            .request(reqwest::Method::POST, table)
            .header("Prefer", "return=representation")
            .json(data)
            .send()
            .await
            .map_err(StoreError::Request)?;

        let response = check_status(response).await?;

        // PostgREST returns an array, get first element
        let results: Vec<R> = response.json().await.map_err(StoreError::Parse)?;
        results.into_iter().next().ok_or(StoreError::NoRowReturned)
    }

    /// Make an authenticated PATCH request (update), returning the updated row
    pub async fn update<T: Serialize, R: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
        data: &T,
    ) -> Result<R, StoreError> {
        let response = self
            .request(reqwest::Method::PATCH, table)
            .query(filters)
            .header("Prefer", "return=representation")
            .json(data)
            .send()
            .await
            .map_err(StoreError::Request)?;

        let response = check_status(response).await?;

        let results: Vec<R> = response.json().await.map_err(StoreError::Parse)?;
        results.into_iter().next().ok_or(StoreError::NoRowReturned)
    }
}

async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    if response.status().is_success() {
        return Ok(response);
    }
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::Api { status: status.as_u16(), body })
}

/// Profile store backed by the Supabase `players` table
#[derive(Clone)]
pub struct SupabaseProgressStore {
    client: SupabaseClient,
}

impl SupabaseProgressStore {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }

    async fn by_nickname(&self, nickname: &str) -> Result<Option<StoredProfile>, StoreError> {
        self.client
            .get_one(PLAYERS_TABLE, &[("nickname", format!("eq.{}", nickname))])
            .await
    }
}

#[async_trait]
impl ProgressStore for SupabaseProgressStore {
    async fn load_or_create(&self, nickname: &str) -> Result<StoredProfile, StoreError> {
        if let Some(profile) = self.by_nickname(nickname).await? {
            return Ok(profile);
        }

        match self.client.insert(PLAYERS_TABLE, &NewProfile { nickname }).await {
            Ok(profile) => Ok(profile),
            // Lost a race with another connection using the same nickname
            Err(StoreError::Api { status: 409, .. }) => self
                .by_nickname(nickname)
                .await?
                .ok_or(StoreError::NotFound),
            Err(e) => Err(e),
        }
    }

    async fn save_progress(&self, profile_id: Uuid, record: &ProgressRecord) -> Result<StoredProfile, StoreError> {
        let filter = [("id", format!("eq.{}", profile_id))];
        let stored: StoredProfile = self
            .client
            .get_one(PLAYERS_TABLE, &filter)
            .await?
            .ok_or(StoreError::NotFound)?;

        let update = apply_progress(&stored, record);
        self.client.update(PLAYERS_TABLE, &filter, &update).await
    }
}
