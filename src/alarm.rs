use crate::notify::IdentitySet;
use crate::structs::{CheckActiveResponse, TriggeredAlarm};

/// Client-side state behind the full-screen alarm banner.
///
/// At most one alarm is surfaced at a time no matter how many the backend
/// reports. A dismissed trigger identity does not re-fire on later polls;
/// only a genuinely new trigger raises the banner again.
#[derive(Default)]
pub struct ActiveAlarmState {
    current: Option<TriggeredAlarm>,
    dismissed: IdentitySet,
}

impl ActiveAlarmState {
    pub fn new() -> Self {
        ActiveAlarmState::default()
    }

    /// Feeds one poll result in; returns the alarm to surface, if any.
    pub fn observe(&mut self, response: &CheckActiveResponse) -> Option<TriggeredAlarm> {
        if !response.has_active_trigger {
            return None;
        }
        let first = response.triggered_alarms.first()?;
        if self.current.is_some() {
            // Banner already up; don't restart it.
            return None;
        }
        if self.dismissed.contains(first.identity()) {
            return None;
        }
        self.current = Some(first.clone());
        self.current.clone()
    }

    /// Clears the surfaced alarm and remembers its identity.
    pub fn dismiss(&mut self) -> Option<TriggeredAlarm> {
        let alarm = self.current.take()?;
        self.dismissed.insert(alarm.identity());
        Some(alarm)
    }

    pub fn current(&self) -> Option<&TriggeredAlarm> {
        self.current.as_ref()
    }
}

/// Terminal stand-in for the dashboard's blocking modal.
pub fn render_banner(alarm: &TriggeredAlarm) -> String {
    let rule = "=".repeat(60);
    format!(
        "\n{rule}\n\
         🚨 ALARM: {name}\n\
         {rule}\n\
         {message}\n\n\
         Line:           {hat}\n\
         Target arrival: {target}\n\
         From:           {origin}\n\
         To:             {destination}\n\
         {rule}\n\
         Type 'x' + Enter to dismiss the alarm.\n",
        rule = rule,
        name = alarm.alarm_name,
        message = alarm.message,
        hat = alarm.hat_kodu,
        target = alarm.target_arrival,
        origin = alarm.origin,
        destination = alarm.destination,
    )
}
