use crate::config::{MAX_TRACKED_IDENTITIES, MAX_VISIBLE_NOTIFICATIONS};
use crate::sound::{play_cue, AudioBackend};
use crate::structs::Notification;

use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

//////////////////////////////////////////////////////////
// Identity tracking
//////////////////////////////////////////////////////////

/// Bounded set of already-handled identities. Once the cap is reached the
/// oldest entry falls out, so memory stays flat over long watch sessions.
pub struct IdentitySet {
    order: VecDeque<u64>,
    members: HashSet<u64>,
    cap: usize,
}

impl IdentitySet {
    pub fn new() -> Self {
        IdentitySet::with_cap(MAX_TRACKED_IDENTITIES)
    }

    pub fn with_cap(cap: usize) -> Self {
        IdentitySet {
            order: VecDeque::new(),
            members: HashSet::new(),
            cap,
        }
    }

    /// Returns true when the identity was not tracked yet.
    pub fn insert(&mut self, id: u64) -> bool {
        if !self.members.insert(id) {
            return false;
        }
        self.order.push_back(id);
        while self.order.len() > self.cap {
            if let Some(oldest) = self.order.pop_front() {
                self.members.remove(&oldest);
            }
        }
        true
    }

    pub fn contains(&self, id: u64) -> bool {
        self.members.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

impl Default for IdentitySet {
    fn default() -> Self {
        IdentitySet::new()
    }
}

//////////////////////////////////////////////////////////
// Notification feed
//////////////////////////////////////////////////////////

/// Newest-first, bounded list of pending notifications.
#[derive(Default)]
pub struct NotificationFeed {
    items: Vec<Notification>,
}

impl NotificationFeed {
    pub fn new() -> Self {
        NotificationFeed::default()
    }

    /// Prepends a non-empty poll batch and trims overflow from the tail.
    pub fn absorb(&mut self, batch: &[Notification]) {
        if batch.is_empty() {
            return;
        }
        let mut next: Vec<Notification> = batch.to_vec();
        next.append(&mut self.items);
        next.truncate(MAX_VISIBLE_NOTIFICATIONS);
        self.items = next;
    }

    /// Removes exactly the item at `index`; the rest keeps its order.
    pub fn dismiss(&mut self, index: usize) -> Option<Notification> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }

    pub fn items(&self) -> &[Notification] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

//////////////////////////////////////////////////////////
// Desktop notifications
//////////////////////////////////////////////////////////

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Permission {
    Default,
    Granted,
    Denied,
}

/// Picks the batch items not yet surfaced, recording their identities so a
/// notification reappearing on a later poll is not re-emitted.
pub fn select_unseen<'a>(
    seen: &mut IdentitySet,
    batch: &'a [Notification],
) -> Vec<&'a Notification> {
    batch
        .iter()
        .filter(|n| seen.insert(n.identity()))
        .collect()
}

pub fn should_emit(notification: &Notification, permission: Permission) -> bool {
    notification.is_transport_alarm() && permission == Permission::Granted
}

/// Emits desktop toasts and the audio cue for freshly polled notifications.
pub struct Notifier {
    permission: Permission,
    seen: IdentitySet,
    audio: Arc<dyn AudioBackend>,
}

impl Notifier {
    pub fn new(audio: Arc<dyn AudioBackend>) -> Self {
        Notifier {
            permission: Permission::Default,
            seen: IdentitySet::new(),
            audio,
        }
    }

    #[cfg(test)]
    pub fn with_permission(audio: Arc<dyn AudioBackend>, permission: Permission) -> Self {
        Notifier {
            permission,
            seen: IdentitySet::new(),
            audio,
        }
    }

    pub fn permission(&self) -> Permission {
        self.permission
    }

    /// Asks the notification daemon whether it will take our toasts. Runs
    /// once per process; later calls return the settled answer.
    pub fn request_permission(&mut self) -> Permission {
        if self.permission == Permission::Default {
            self.permission = match notify_rust::get_capabilities() {
                Ok(_) => Permission::Granted,
                Err(e) => {
                    log::warn!("desktop notifications unavailable: {}", e);
                    Permission::Denied
                }
            };
        }
        self.permission
    }

    /// Handles one poll batch; returns how many desktop toasts went out.
    pub fn handle_batch(&mut self, batch: &[Notification]) -> usize {
        let fresh = select_unseen(&mut self.seen, batch);
        if fresh.is_empty() {
            return 0;
        }

        let mut emitted = 0;
        for notification in &fresh {
            if !should_emit(notification, self.permission) {
                continue;
            }
            match emit_desktop(notification) {
                Ok(()) => emitted += 1,
                Err(e) => log::warn!("desktop notification failed: {}", e),
            }
        }

        play_cue(&self.audio);
        emitted
    }
}

fn emit_desktop(notification: &Notification) -> notify_rust::error::Result<()> {
    let mut body = notification.message.clone();
    if let Some(action) = &notification.action_message {
        body = format!("{}\n{}", body, action);
    }
    if let Some(minutes) = notification
        .timing
        .as_ref()
        .and_then(|t| t.minutes_until_departure)
    {
        body = format!("{}\nDeparts in {} minutes", body, minutes);
    }

    notify_rust::Notification::new()
        .appname("menager-agent")
        .summary(&notification.title)
        .body(&body)
        .icon("dialog-warning")
        .timeout(notify_rust::Timeout::Never)
        .show()?;
    Ok(())
}
