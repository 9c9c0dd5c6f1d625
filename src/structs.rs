use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Notification `type` value the backend uses for transit alarms.
pub const TRANSPORT_ALARM_KIND: &str = "transport_alarm";

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct Notification {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub action_message: Option<String>,
    #[serde(default)]
    pub timing: Option<NotificationTiming>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct NotificationTiming {
    #[serde(default)]
    pub next_departure: Option<String>,
    #[serde(default)]
    pub minutes_until_departure: Option<i64>,
    #[serde(default)]
    pub travel_time_to_stop: Option<i64>,
}

impl Notification {
    pub fn is_transport_alarm(&self) -> bool {
        self.kind == TRANSPORT_ALARM_KIND
    }

    /// Stable identity used to avoid re-emitting a desktop notification
    /// when the same item reappears across polls.
    pub fn identity(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.kind.hash(&mut h);
        self.title.hash(&mut h);
        self.message.hash(&mut h);
        if let Some(timing) = &self.timing {
            timing.next_departure.hash(&mut h);
        }
        h.finish()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct NotificationsResponse {
    #[serde(default)]
    pub notifications: Vec<Notification>,
    #[serde(default)]
    pub count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default, PartialEq)]
pub struct TriggeredAlarm {
    #[serde(default)]
    pub alarm_name: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub hat_kodu: String,
    #[serde(default)]
    pub target_arrival: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
}

impl TriggeredAlarm {
    pub fn identity(&self) -> u64 {
        let mut h = DefaultHasher::new();
        self.alarm_name.hash(&mut h);
        self.hat_kodu.hash(&mut h);
        self.target_arrival.hash(&mut h);
        self.message.hash(&mut h);
        h.finish()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct CheckActiveResponse {
    #[serde(default)]
    pub has_active_trigger: bool,
    #[serde(default)]
    pub triggered_alarms: Vec<TriggeredAlarm>,
    #[serde(default)]
    pub total_alarms: i64,
}

/// One row of `GET /transport/smart/alarms`. Route entries are re-rendered
/// as-is, so they stay untyped.
#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct AlarmStatus {
    #[serde(default)]
    pub alarm_id: i64,
    #[serde(default)]
    pub alarm_name: String,
    #[serde(default)]
    pub origin: String,
    #[serde(default)]
    pub destination: String,
    #[serde(default)]
    pub target_arrival_time: String,
    #[serde(default)]
    pub travel_time_to_stop: i64,
    #[serde(default)]
    pub routes: Vec<serde_json::Value>,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub should_trigger: bool,
    #[serde(default)]
    pub alarm_enabled: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct SmartAlarmCreate {
    pub alarm_name: String,
    pub origin_location: String,
    pub destination_location: String,
    /// "HH:MM"
    pub target_arrival_time: String,
    pub travel_time_to_stop: u32,
    pub selected_hat_kodlari: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub origin_durak_kodu: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination_durak_kodu: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct SmartAlarmUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_arrival_time: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub travel_time_to_stop: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alarm_enabled: Option<bool>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct CreatedAlarm {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub alarm_name: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct MessageReply {
    #[serde(default)]
    pub message: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct RouteSearchRequest {
    pub origin_durak_kodu: String,
    pub destination_durak_kodu: String,
}

#[derive(Clone, Debug, Serialize)]
pub struct LocationRouteSearchRequest {
    pub origin_lat: f64,
    pub origin_lon: f64,
    pub dest_lat: f64,
    pub dest_lon: f64,
    pub radius_meters: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct RouteMatch {
    #[serde(default)]
    pub hat_kodu: String,
    #[serde(default)]
    pub hat_adi: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct RouteSearchReply {
    #[serde(default)]
    pub origin_durak: String,
    #[serde(default)]
    pub destination_durak: String,
    #[serde(default)]
    pub routes: Vec<RouteMatch>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct LocationRouteSearchReply {
    /// Lines serving both points directly.
    #[serde(default)]
    pub available_routes: Vec<RouteMatch>,
    /// Lines leaving the origin towards the destination; a transfer may be
    /// needed.
    #[serde(default)]
    pub origin_only_routes: Vec<RouteMatch>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Stop {
    #[serde(default)]
    pub durak_kodu: String,
    #[serde(default)]
    pub durak_adi: String,
    #[serde(default)]
    pub distance_meters: Option<f64>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct StopRoutesReply {
    #[serde(default)]
    pub durak_kodu: String,
    #[serde(default)]
    pub hatlar: Vec<RouteMatch>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Rate {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub daily_change_percent: f64,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct RatesResponse {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Vec<Rate>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct EventVenue {
    #[serde(default)]
    pub name: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct EventItem {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub venue: Option<EventVenue>,
}

#[derive(Clone, Debug, Serialize)]
pub struct ClosetItemCreate {
    pub category: String,
    pub sub_category: String,
    pub primary_color_hex: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub material: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct ClosetItem {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub sub_category: String,
    #[serde(default)]
    pub primary_color_hex: String,
    #[serde(default)]
    pub material: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Recommendation {
    #[serde(default)]
    pub palette_name: Option<String>,
    #[serde(default)]
    pub colors: Vec<String>,
    #[serde(default)]
    pub outfit: serde_json::Value,
    #[serde(default)]
    pub weather_info: String,
    #[serde(default)]
    pub advice: String,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct PaletteSyncReply {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub count: i64,
}

#[derive(Clone, Debug, Deserialize, Default)]
pub struct Token {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
}
