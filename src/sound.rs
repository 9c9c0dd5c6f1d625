use crate::error::{AgentError, Result};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use std::path::PathBuf;
use std::process::Command;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Short beep, the same clip the dashboard shipped inline.
pub const BEEP_WAV_BASE64: &str = "UklGRnoGAABXQVZFZm10IBAAAAABAAEAQB8AAEAfAAABAAgAZGF0YQoGAACBhYqFbF1fdJivrJBhNjVgodDbq2EcBj+a2/LDciUFLIHO8tiJNwgZaLvt559NEAxQp+PwtmMcBjiR1/LMeSwFJHfH8N2QQAoUXrTp66hVFApGn+DyvmwhBTGH0fPTgjMGHm7A7+OZRQ0PUp/q7KhVEwtJouLyt2sjBTGN1fLOeSwFJHfH8N2QQAoUXrTp66hVFApGn+DyvmwhBTGH0fPTgjMGHm7A7+OZRg0PUp/q7KhVEwtJouLyt2sjBTGN1fLOeSwFJHfH8N2QQAoUXrTp66hVFApGn+DyvmwhBTGH0fPTgjMGHm7A7+OZRQ0PUp/q7KhVEwtJouLyt2sjBTGN1fLOeSwFJHfH8N2QQAoUXrTp66hVFApGn+DyvmwhBTGH0fPTgjMGHm7A7+OZRQ0PUp/q7KhVEwtJouLyt2sjBTGN1fLOeSwFJHfH8N2QQAoUXrTp66hVFApGn+DyvmwhBTGH0fPTgjMGHm7A7+OZRQ0PUp/q7KhVEwtJouLyt2sjBTGN1fLOeSwFJHfH8N2QQAoUXrTp66hVFApGn+DyvmwhBTGH0fPTgjMGHm7A7+OZRQ0PUp/q7KhVEwtJouLyt2sjBTGN1fLOeSwFJHfH8N2QQAoUXrTp66hVFApGn+DyvmwhBTGH0fPTgjMGHm7A7+OZRQ0PUp/q7KhVEwtJouLyt2sjBTGN1fLOeSwFJHfH8N2QQAoUXrTp66hVFApGn+DyvmwhBTGH0fPTgjMGHm7A7+OZRQ0PUp/q7KhVEwtJouLyt2sjBTGN1fLOeSwFJHfH8N2QQAoUXrTp66hVFApGn+DyvmwhBTGH0fPTgjMGHm7A7+OZRQ0PUp/q7KhVEwtJouLyt2sjBTGN1fLOeSwFJHfH8N2QQAoUXrTp66hVFApGn+DyvmwhBTGH0fPTgjMGHm7A7+OZRQ0PUp/q7KhVEwtJouLyt2sjBTGN1fLOeSwFJHfH8N2QQAoUXrTp66hVFApGn+DyvmwhBTGH0fPTgjMGHm7A7+OZRQ0PUp/q7KhVEwtJouLyt2sjBTGN1fLOeSwFJHfH8N2QQAoUXrTp66hVFApGn+DyvmwhBTGH0fPTgjMGHm7A7+OZ";

/// Seconds of audio per loop iteration, used to track playback position.
const LOOP_SECS: u64 = 1;
const LOOP_GAP_MS: u64 = 400;

//////////////////////////////////////////////////////////
// Playback
//////////////////////////////////////////////////////////

pub trait AudioBackend: Send + Sync + 'static {
    fn play_once(&self) -> Result<()>;
}

/// Plays the beep through an external player process (`paplay` by default).
pub struct CommandAudio {
    player: String,
    wav_path: PathBuf,
}

impl CommandAudio {
    pub fn new(player: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(BEEP_WAV_BASE64)
            .map_err(|e| AgentError::Audio(format!("bad embedded wav: {}", e)))?;
        let wav_path = std::env::temp_dir().join("menager-agent-beep.wav");
        std::fs::write(&wav_path, bytes)?;
        Ok(CommandAudio {
            player: player.to_string(),
            wav_path,
        })
    }
}

impl AudioBackend for CommandAudio {
    fn play_once(&self) -> Result<()> {
        let status = Command::new(&self.player)
            .arg(&self.wav_path)
            .status()
            .map_err(|e| AgentError::Audio(format!("{}: {}", self.player, e)))?;
        if !status.success() {
            return Err(AgentError::Audio(format!(
                "{} exited with {}",
                self.player, status
            )));
        }
        Ok(())
    }
}

/// One-shot cue for feed notifications. Failure is logged, never surfaced.
pub fn play_cue(backend: &Arc<dyn AudioBackend>) {
    let backend = backend.clone();
    tokio::task::spawn_blocking(move || {
        if let Err(e) = backend.play_once() {
            log::debug!("notification cue failed: {}", e);
        }
    });
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PlaybackState {
    pub playing: bool,
    pub position_secs: u64,
}

/// Looping alarm audio behind the full-screen banner.
///
/// `play` keeps re-playing the clip until `stop`, which also rewinds the
/// position to the start, mirroring what dismissing the dashboard modal did
/// to its `<audio>` element.
pub struct AlarmSound {
    backend: Arc<dyn AudioBackend>,
    state: Arc<Mutex<PlaybackState>>,
    task: Option<JoinHandle<()>>,
}

impl AlarmSound {
    pub fn new(backend: Arc<dyn AudioBackend>) -> Self {
        AlarmSound {
            backend,
            state: Arc::new(Mutex::new(PlaybackState::default())),
            task: None,
        }
    }

    pub fn play(&mut self) {
        {
            let mut st = self.state.lock().unwrap();
            if st.playing {
                return;
            }
            st.playing = true;
        }

        let backend = self.backend.clone();
        let state = self.state.clone();
        self.task = Some(tokio::spawn(async move {
            loop {
                if !state.lock().unwrap().playing {
                    break;
                }
                let b = backend.clone();
                match tokio::task::spawn_blocking(move || b.play_once()).await {
                    Ok(Ok(())) => {}
                    Ok(Err(e)) => log::warn!("alarm sound playback error: {}", e),
                    Err(e) => log::warn!("alarm sound task error: {}", e),
                }
                {
                    let mut st = state.lock().unwrap();
                    if !st.playing {
                        break;
                    }
                    st.position_secs += LOOP_SECS;
                }
                tokio::time::sleep(Duration::from_millis(LOOP_GAP_MS)).await;
            }
        }));
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
        let mut st = self.state.lock().unwrap();
        st.playing = false;
        st.position_secs = 0;
    }

    pub fn is_playing(&self) -> bool {
        self.state.lock().unwrap().playing
    }

    pub fn state(&self) -> PlaybackState {
        *self.state.lock().unwrap()
    }
}
