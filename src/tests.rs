use crate::*;

use crate::error::AgentError;
use crate::geo::Geocoder;
use crate::notify::IdentitySet;
use crate::sound::{AudioBackend, PlaybackState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn notification(title: &str, kind: &str) -> Notification {
    Notification {
        kind: kind.to_string(),
        title: title.to_string(),
        message: format!("{} message", title),
        action_message: None,
        timing: None,
    }
}

struct CountingAudio {
    plays: Arc<AtomicUsize>,
}

impl AudioBackend for CountingAudio {
    fn play_once(&self) -> error::Result<()> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

fn counting_audio() -> (Arc<dyn AudioBackend>, Arc<AtomicUsize>) {
    let plays = Arc::new(AtomicUsize::new(0));
    let backend: Arc<dyn AudioBackend> = Arc::new(CountingAudio { plays: plays.clone() });
    (backend, plays)
}

//////////////////////////////////////////////////////////
// Notification feed
//////////////////////////////////////////////////////////

#[test]
fn feed_never_exceeds_cap() {
    let mut feed = NotificationFeed::new();
    for round in 0..4 {
        let batch: Vec<Notification> = (0..3)
            .map(|i| notification(&format!("r{}n{}", round, i), "transport_alarm"))
            .collect();
        feed.absorb(&batch);
        assert!(feed.len() <= config::MAX_VISIBLE_NOTIFICATIONS);
    }
    assert_eq!(feed.len(), config::MAX_VISIBLE_NOTIFICATIONS);
    // Latest batch sits in front, in batch order.
    assert_eq!(feed.items()[0].title, "r3n0");
    assert_eq!(feed.items()[1].title, "r3n1");
    assert_eq!(feed.items()[2].title, "r3n2");
    assert_eq!(feed.items()[3].title, "r2n0");
}

#[test]
fn empty_batch_leaves_feed_untouched() {
    let mut feed = NotificationFeed::new();
    feed.absorb(&[notification("a", "transport_alarm")]);
    feed.absorb(&[]);
    assert_eq!(feed.len(), 1);
}

#[test]
fn dismiss_removes_exactly_one_item_by_position() {
    let mut feed = NotificationFeed::new();
    feed.absorb(&[
        notification("a", "x"),
        notification("b", "x"),
        notification("c", "x"),
        notification("d", "x"),
    ]);

    let removed = feed.dismiss(1).unwrap();
    assert_eq!(removed.title, "b");

    let titles: Vec<&str> = feed.items().iter().map(|n| n.title.as_str()).collect();
    assert_eq!(titles, vec!["a", "c", "d"]);

    assert!(feed.dismiss(10).is_none());
    assert_eq!(feed.len(), 3);
}

//////////////////////////////////////////////////////////
// Desktop emission
//////////////////////////////////////////////////////////

#[test]
fn unseen_selection_never_repeats_an_identity() {
    let mut seen = IdentitySet::new();
    let batch = vec![
        notification("bus 34", "transport_alarm"),
        notification("bus 50", "transport_alarm"),
    ];

    let first = notify::select_unseen(&mut seen, &batch);
    assert_eq!(first.len(), 2);

    // Same items reported again on the next poll.
    let second = notify::select_unseen(&mut seen, &batch);
    assert!(second.is_empty());

    // A new item still comes through.
    let next = vec![batch[0].clone(), notification("bus 99", "transport_alarm")];
    let third = notify::select_unseen(&mut seen, &next);
    assert_eq!(third.len(), 1);
    assert_eq!(third[0].title, "bus 99");
}

#[test]
fn identity_tracking_evicts_oldest_past_the_cap() {
    let mut seen = IdentitySet::with_cap(3);
    for id in 0..5u64 {
        assert!(seen.insert(id));
    }

    // Stays at the cap, dropping the oldest entries first.
    assert_eq!(seen.len(), 3);
    assert!(!seen.contains(0));
    assert!(!seen.contains(1));
    assert!(seen.contains(2));
    assert!(seen.contains(4));

    // An evicted identity counts as fresh again.
    assert!(seen.insert(0));
    // A tracked one still does not.
    assert!(!seen.insert(4));
}

#[test]
fn emission_requires_alarm_kind_and_granted_permission() {
    let alarm = notification("bus 34", "transport_alarm");
    let other = notification("budget", "budget_warning");

    assert!(notify::should_emit(&alarm, notify::Permission::Granted));
    assert!(!notify::should_emit(&alarm, notify::Permission::Denied));
    assert!(!notify::should_emit(&alarm, notify::Permission::Default));
    assert!(!notify::should_emit(&other, notify::Permission::Granted));
}

#[tokio::test]
async fn cue_plays_once_per_batch_with_fresh_items() {
    let (backend, plays) = counting_audio();
    // Non-alarm kind keeps the desktop daemon out of the test.
    let mut notifier = Notifier::with_permission(backend, notify::Permission::Granted);
    let batch = vec![notification("budget", "budget_warning")];

    assert_eq!(notifier.handle_batch(&batch), 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(plays.load(Ordering::SeqCst), 1);

    // Same batch again: nothing fresh, no cue.
    assert_eq!(notifier.handle_batch(&batch), 0);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(plays.load(Ordering::SeqCst), 1);
}

//////////////////////////////////////////////////////////
// Active alarm state
//////////////////////////////////////////////////////////

fn triggered(name: &str) -> TriggeredAlarm {
    TriggeredAlarm {
        alarm_name: name.to_string(),
        message: format!("{} should leave now", name),
        hat_kodu: "34AS".to_string(),
        target_arrival: "09:00".to_string(),
        origin: "Kadıköy".to_string(),
        destination: "Levent".to_string(),
    }
}

#[test]
fn only_first_reported_alarm_is_surfaced() {
    let mut state = ActiveAlarmState::new();
    let response = CheckActiveResponse {
        has_active_trigger: true,
        triggered_alarms: vec![triggered("work"), triggered("school"), triggered("gym")],
        total_alarms: 3,
    };

    let surfaced = state.observe(&response).unwrap();
    assert_eq!(surfaced.alarm_name, "work");
    assert_eq!(state.current().unwrap().alarm_name, "work");

    // While the banner is up, repeat reports do not restart it.
    assert!(state.observe(&response).is_none());
}

#[test]
fn no_trigger_or_empty_list_surfaces_nothing() {
    let mut state = ActiveAlarmState::new();
    assert!(state
        .observe(&CheckActiveResponse {
            has_active_trigger: false,
            triggered_alarms: vec![triggered("work")],
            total_alarms: 1,
        })
        .is_none());
    assert!(state
        .observe(&CheckActiveResponse {
            has_active_trigger: true,
            triggered_alarms: vec![],
            total_alarms: 0,
        })
        .is_none());
}

#[test]
fn dismissed_trigger_does_not_refire_but_a_new_one_does() {
    let mut state = ActiveAlarmState::new();
    let work = CheckActiveResponse {
        has_active_trigger: true,
        triggered_alarms: vec![triggered("work")],
        total_alarms: 1,
    };

    assert!(state.observe(&work).is_some());
    assert_eq!(state.dismiss().unwrap().alarm_name, "work");
    assert!(state.current().is_none());

    // Backend still reports the same trigger on the next poll.
    assert!(state.observe(&work).is_none());

    let school = CheckActiveResponse {
        has_active_trigger: true,
        triggered_alarms: vec![triggered("school")],
        total_alarms: 1,
    };
    assert_eq!(state.observe(&school).unwrap().alarm_name, "school");
}

#[test]
fn dismiss_without_active_alarm_is_a_no_op() {
    let mut state = ActiveAlarmState::new();
    assert!(state.dismiss().is_none());
}

//////////////////////////////////////////////////////////
// Alarm sound
//////////////////////////////////////////////////////////

#[tokio::test]
async fn stopping_the_alarm_resets_playback_position() {
    let (backend, plays) = counting_audio();
    let mut sound = AlarmSound::new(backend);

    sound.play();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(sound.is_playing());
    assert!(plays.load(Ordering::SeqCst) >= 1);

    sound.stop();
    assert_eq!(sound.state(), PlaybackState::default());
}

#[tokio::test]
async fn play_while_playing_does_not_stack_loops() {
    let (backend, _plays) = counting_audio();
    let mut sound = AlarmSound::new(backend);
    sound.play();
    sound.play();
    assert!(sound.is_playing());
    sound.stop();
    assert!(!sound.is_playing());
}

//////////////////////////////////////////////////////////
// Deadline guard
//////////////////////////////////////////////////////////

#[tokio::test]
async fn deadline_elapses_on_a_request_that_never_resolves() {
    let never = std::future::pending::<error::Result<Vec<Rate>>>();
    let result = api::with_deadline(Duration::from_millis(10), never).await;
    assert!(matches!(result, Err(AgentError::Timeout(_))));
}

#[tokio::test]
async fn deadline_passes_through_a_prompt_result() {
    let result =
        api::with_deadline(Duration::from_millis(50), async { Ok(vec![1, 2, 3]) }).await;
    assert_eq!(result.unwrap(), vec![1, 2, 3]);
}

//////////////////////////////////////////////////////////
// Session and auth header
//////////////////////////////////////////////////////////

fn test_config(session_file: &str) -> config::Config {
    config::Config {
        base_url: "http://localhost:8000".to_string(),
        session_path: std::env::temp_dir().join(session_file),
        locationiq_token: None,
        sound_player: "true".to_string(),
    }
}

#[test]
fn login_stores_a_token_that_requests_attach_as_bearer() {
    let config = test_config("menager-agent-test-session-a.json");

    let session = Session::new("tok123".to_string());
    session.store(&config.session_path).unwrap();

    let loaded = Session::load(&config.session_path).unwrap();
    assert_eq!(loaded, session);

    let api = ApiClient::new(&config, Some(loaded));
    assert_eq!(api.auth_header().as_deref(), Some("Bearer tok123"));

    Session::clear(&config.session_path).unwrap();
    assert!(Session::load(&config.session_path).is_err());

    let api = ApiClient::new(&config, None);
    assert!(api.auth_header().is_none());
    assert!(!api.has_session());
}

#[test]
fn clearing_a_missing_session_is_fine() {
    let config = test_config("menager-agent-test-session-b.json");
    Session::clear(&config.session_path).unwrap();
    Session::clear(&config.session_path).unwrap();
}

//////////////////////////////////////////////////////////
// Wire shapes
//////////////////////////////////////////////////////////

#[test]
fn notification_payload_parses_with_type_and_timing() {
    let json = r#"{
        "notifications": [{
            "type": "transport_alarm",
            "title": "34AS Numaralı Otobüs",
            "message": "34AS numaralı araç Kadıköy'den yola çıktı!",
            "action_message": "Şimdi çıkarsan yetişirsin",
            "timing": {
                "next_departure": "2026-08-30T08:45:00",
                "minutes_until_departure": 12,
                "travel_time_to_stop": 10
            }
        }],
        "count": 1
    }"#;

    let reply: NotificationsResponse = serde_json::from_str(json).unwrap();
    assert_eq!(reply.count, 1);
    let n = &reply.notifications[0];
    assert!(n.is_transport_alarm());
    assert_eq!(
        n.timing.as_ref().unwrap().minutes_until_departure,
        Some(12)
    );
}

#[test]
fn identity_is_stable_and_distinguishes_items() {
    let a = notification("bus 34", "transport_alarm");
    let b = notification("bus 50", "transport_alarm");
    assert_eq!(a.identity(), a.clone().identity());
    assert_ne!(a.identity(), b.identity());
}

#[test]
fn check_active_payload_parses() {
    let json = r#"{
        "total_alarms": 2,
        "has_active_trigger": true,
        "triggered_alarms": [{
            "alarm_name": "İşe Gidiş",
            "message": "Şimdi çık!",
            "hat_kodu": "34AS",
            "target_arrival": "09:00",
            "origin": "Kadıköy",
            "destination": "Levent",
            "should_trigger": true
        }]
    }"#;

    let reply: CheckActiveResponse = serde_json::from_str(json).unwrap();
    assert!(reply.has_active_trigger);
    assert_eq!(reply.triggered_alarms[0].hat_kodu, "34AS");
}

#[test]
fn rates_payload_parses() {
    let json = r#"{
        "success": true,
        "data": [
            {"symbol": "USDTRY", "name": "Dolar", "price": 41.25, "daily_change_percent": -0.4}
        ]
    }"#;

    let reply: RatesResponse = serde_json::from_str(json).unwrap();
    assert!(reply.success);
    assert_eq!(reply.data[0].symbol, "USDTRY");
}

#[test]
fn token_payload_parses() {
    let token: Token =
        serde_json::from_str(r#"{"access_token": "abc", "token_type": "bearer"}"#).unwrap();
    assert_eq!(token.access_token, "abc");
}

//////////////////////////////////////////////////////////
// Input validation
//////////////////////////////////////////////////////////

#[test]
fn arrival_time_must_be_hh_mm() {
    assert!(parse_arrival_time("08:30").is_ok());
    assert!(parse_arrival_time("23:59").is_ok());
    assert!(parse_arrival_time("24:00").is_err());
    assert!(parse_arrival_time("8am").is_err());
    assert!(parse_arrival_time("").is_err());
}

//////////////////////////////////////////////////////////
// Geocoding
//////////////////////////////////////////////////////////

struct FakeGeocoder {
    fail: bool,
}

#[async_trait::async_trait]
impl Geocoder for FakeGeocoder {
    async fn locate(&self, query: &str) -> error::Result<Coordinates> {
        if self.fail {
            return Err(AgentError::NoGeocodeResult(query.to_string()));
        }
        Ok(Coordinates { lat: 40.99, lon: 29.03 })
    }

    async fn reverse_locate(&self, coords: Coordinates) -> error::Result<String> {
        if self.fail {
            return Err(AgentError::NoGeocodeResult(format!(
                "{}, {}",
                coords.lat, coords.lon
            )));
        }
        Ok("Bahariye Caddesi 12, İstanbul".to_string())
    }
}

#[tokio::test]
async fn picked_coordinates_resolve_to_an_address_for_display() {
    let geo = FakeGeocoder { fail: false };
    let coords = geo.locate("Kadıköy").await.unwrap();

    let place = resolve_place(&geo, coords).await;
    assert_eq!(place.as_deref(), Some("Bahariye Caddesi 12, İstanbul"));
}

#[tokio::test]
async fn failed_reverse_lookup_yields_no_address_line() {
    let geo = FakeGeocoder { fail: true };
    let place = resolve_place(&geo, Coordinates { lat: 40.99, lon: 29.03 }).await;
    assert!(place.is_none());
}

#[test]
fn geocode_queries_are_percent_encoded() {
    let geo = geo::LocationIq::new("k".to_string());

    let req = geo.search_request("Cadde & Sokak #3").build().unwrap();
    let query = req.url().query().unwrap_or_default().to_string();
    assert!(query.contains("%26"), "ampersand must be escaped: {}", query);
    assert!(query.contains("%23"), "hash must be escaped: {}", query);
    assert!(req.url().fragment().is_none());

    let req = geo
        .reverse_request(Coordinates { lat: 40.99, lon: 29.03 })
        .build()
        .unwrap();
    let query = req.url().query().unwrap_or_default().to_string();
    assert!(query.contains("lat=40.99"));
    assert!(query.contains("lon=29.03"));
}
