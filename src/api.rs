use crate::config::{Config, RATE_FETCH_TIMEOUT_SECS};
use crate::error::{AgentError, Result};
use crate::session::Session;
use crate::structs::*;

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

//////////////////////////////////////////////////////////
// Backend API client
//////////////////////////////////////////////////////////

/// Single shared HTTP client for the Menager backend.
///
/// Base URL is fixed at construction; when a [`Session`] is present every
/// request carries its bearer token. No retry and no 401 interception, each
/// caller deals with rejections itself.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: Option<Session>,
}

impl ApiClient {
    pub fn new(config: &Config, session: Option<Session>) -> Self {
        ApiClient {
            http: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn auth_header(&self) -> Option<String> {
        self.session.as_ref().map(Session::bearer)
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut builder = self.http.request(method, url);
        if let Some(bearer) = self.auth_header() {
            builder = builder.header(AUTHORIZATION, bearer);
        }
        builder
    }

    async fn execute<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let resp = builder.send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v["detail"].as_str().map(str::to_owned))
                .unwrap_or(body);
            return Err(AgentError::Status { status, detail });
        }
        Ok(resp.json::<T>().await?)
    }

    //////////////////////////////////////////////////////
    // Auth
    //////////////////////////////////////////////////////

    /// `POST /auth/token`, form-encoded per the backend's OAuth2 form flow.
    pub async fn login(&self, email: &str, password: &str) -> Result<Token> {
        let form = [("username", email), ("password", password)];
        let builder = self.request(Method::POST, "/auth/token").form(&form);
        self.execute(builder).await
    }

    pub async fn register(&self, email: &str, password: &str, name: &str) -> Result<Token> {
        let body = serde_json::json!({
            "email": email,
            "password": password,
            "name": name,
        });
        let builder = self.request(Method::POST, "/auth/register").json(&body);
        self.execute(builder).await
    }

    //////////////////////////////////////////////////////
    // Polling endpoints
    //////////////////////////////////////////////////////

    pub async fn notifications(&self) -> Result<Vec<Notification>> {
        let reply: NotificationsResponse = self
            .execute(self.request(Method::GET, "/notifications"))
            .await?;
        Ok(reply.notifications)
    }

    pub async fn check_active(&self) -> Result<CheckActiveResponse> {
        self.execute(self.request(Method::GET, "/transport/smart/check-active"))
            .await
    }

    //////////////////////////////////////////////////////
    // Smart transport alarms
    //////////////////////////////////////////////////////

    pub async fn alarms(&self) -> Result<Vec<AlarmStatus>> {
        self.execute(self.request(Method::GET, "/transport/smart/alarms"))
            .await
    }

    pub async fn create_alarm(&self, alarm: &SmartAlarmCreate) -> Result<CreatedAlarm> {
        let builder = self
            .request(Method::POST, "/transport/smart/alarms")
            .json(alarm);
        self.execute(builder).await
    }

    pub async fn update_alarm(&self, alarm_id: i64, update: &SmartAlarmUpdate) -> Result<MessageReply> {
        let builder = self
            .request(Method::PUT, &format!("/transport/smart/alarms/{}", alarm_id))
            .json(update);
        self.execute(builder).await
    }

    pub async fn delete_alarm(&self, alarm_id: i64) -> Result<MessageReply> {
        self.execute(self.request(
            Method::DELETE,
            &format!("/transport/smart/alarms/{}", alarm_id),
        ))
        .await
    }

    //////////////////////////////////////////////////////
    // Route and stop lookups
    //////////////////////////////////////////////////////

    pub async fn search_routes(&self, request: &RouteSearchRequest) -> Result<RouteSearchReply> {
        let builder = self
            .request(Method::POST, "/transport/smart/routes/search")
            .json(request);
        self.execute(builder).await
    }

    pub async fn search_routes_by_location(
        &self,
        request: &LocationRouteSearchRequest,
    ) -> Result<LocationRouteSearchReply> {
        let builder = self
            .request(Method::POST, "/transport/smart/routes/search-by-location")
            .json(request);
        self.execute(builder).await
    }

    pub async fn nearby_stops(&self, coords: Coordinates) -> Result<Vec<Stop>> {
        let builder = self
            .request(Method::GET, "/transport/smart/nearby-stops")
            .query(&[("lat", coords.lat), ("lon", coords.lon)]);
        self.execute(builder).await
    }

    pub async fn stop_routes(&self, durak_kodu: &str) -> Result<StopRoutesReply> {
        self.execute(self.request(
            Method::GET,
            &format!("/transport/smart/durak/{}/hatlar", durak_kodu),
        ))
        .await
    }

    //////////////////////////////////////////////////////
    // Market analysis
    //////////////////////////////////////////////////////

    /// Rates sit behind slow upstream feeds, so this one carries a deadline
    /// instead of hanging the panel.
    pub async fn current_rates(&self) -> Result<Vec<Rate>> {
        let limit = Duration::from_secs(RATE_FETCH_TIMEOUT_SECS);
        let fut = self.execute::<RatesResponse>(
            self.request(Method::GET, "/market-analysis/current-rates"),
        );
        let reply = with_deadline(limit, fut).await?;
        Ok(reply.data)
    }

    pub async fn upcoming_events(&self) -> Result<serde_json::Value> {
        self.execute(self.request(Method::GET, "/market-analysis/upcoming-events"))
            .await
    }

    pub async fn scenarios(&self) -> Result<serde_json::Value> {
        self.execute(self.request(Method::GET, "/market-analysis/scenarios"))
            .await
    }

    pub async fn market_summary(&self) -> Result<serde_json::Value> {
        self.execute(self.request(Method::GET, "/market-analysis/summary"))
            .await
    }

    pub async fn market_pulse(&self) -> Result<serde_json::Value> {
        self.execute(self.request(Method::GET, "/market-analysis/market-pulse"))
            .await
    }

    //////////////////////////////////////////////////////
    // Style engine
    //////////////////////////////////////////////////////

    pub async fn daily_recommendation(&self) -> Result<Recommendation> {
        self.execute(self.request(Method::GET, "/style/daily-recommendation"))
            .await
    }

    pub async fn closet(&self) -> Result<Vec<ClosetItem>> {
        self.execute(self.request(Method::GET, "/style/closet")).await
    }

    pub async fn add_closet_item(&self, item: &ClosetItemCreate) -> Result<ClosetItem> {
        let builder = self
            .request(Method::POST, "/style/closet/add-item")
            .json(item);
        self.execute(builder).await
    }

    pub async fn sync_palettes(&self) -> Result<PaletteSyncReply> {
        self.execute(self.request(Method::POST, "/style/sync-palettes"))
            .await
    }

    //////////////////////////////////////////////////////
    // Culture events
    //////////////////////////////////////////////////////

    pub async fn events(&self, limit: u32) -> Result<Vec<EventItem>> {
        let builder = self
            .request(Method::GET, "/etkinlik/events")
            .query(&[("limit", limit)]);
        self.execute(builder).await
    }
}

/// Bounds a future with a hard deadline, mapping elapse to
/// [`AgentError::Timeout`].
pub async fn with_deadline<T>(
    limit: Duration,
    fut: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => Err(AgentError::Timeout(limit)),
    }
}
