use crate::alarm::{render_banner, ActiveAlarmState};
use crate::api::ApiClient;
use crate::config::{ACTIVE_ALARM_POLL_SECS, NOTIFICATION_POLL_SECS};
use crate::notify::{NotificationFeed, Notifier};
use crate::sound::AlarmSound;

use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

//////////////////////////////////////////////////////////
// Polling tasks
//////////////////////////////////////////////////////////
//
// Each poller is one task that awaits its own request before the next tick,
// so ticks never overlap in flight. A failed poll is logged and the next
// scheduled tick is the retry. Teardown is `JoinHandle::abort`.

/// Polls `/notifications`, feeds the bounded list and the desktop notifier.
pub fn spawn_notification_poller(
    api: Arc<ApiClient>,
    feed: Arc<Mutex<NotificationFeed>>,
    notifier: Arc<Mutex<Notifier>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(Duration::from_secs(NOTIFICATION_POLL_SECS));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            // First tick fires immediately.
            timer.tick().await;

            match api.notifications().await {
                Ok(batch) => {
                    if batch.is_empty() {
                        continue;
                    }
                    feed.lock().unwrap().absorb(&batch);
                    let emitted = notifier.lock().unwrap().handle_batch(&batch);
                    log::info!(
                        "poll: {} pending notification(s), {} desktop toast(s)",
                        batch.len(),
                        emitted
                    );
                    for (i, n) in feed.lock().unwrap().items().iter().enumerate() {
                        println!("🔔 [{}] {} — {}", i, n.title, n.message);
                    }
                }
                Err(e) => log::warn!("notification poll failed: {}", e),
            }
        }
    })
}

/// Polls `/transport/smart/check-active`; on a fresh trigger raises the
/// banner and starts the looping alarm sound.
pub fn spawn_active_alarm_checker(
    api: Arc<ApiClient>,
    state: Arc<Mutex<ActiveAlarmState>>,
    sound: Arc<Mutex<AlarmSound>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(Duration::from_secs(ACTIVE_ALARM_POLL_SECS));
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            timer.tick().await;

            match api.check_active().await {
                Ok(response) => {
                    let surfaced = state.lock().unwrap().observe(&response);
                    if let Some(alarm) = surfaced {
                        log::info!("alarm triggered: {}", alarm.alarm_name);
                        sound.lock().unwrap().play();
                        println!("{}", render_banner(&alarm));
                    }
                }
                Err(e) => log::warn!("active alarm check failed: {}", e),
            }
        }
    })
}
