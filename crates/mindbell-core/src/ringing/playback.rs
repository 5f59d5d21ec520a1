//! Playback provider seam.

use std::sync::Mutex;

use crate::error::PlaybackError;
use crate::prefs::{SoundRef, VibrationPattern};

/// Invoked once when playback ends on its own.
pub type Completion = Box<dyn FnOnce() + Send + 'static>;

/// Sound, volume and vibration backend.
///
/// `start` hands back an owned handle; the ringer keeps at most one and
/// returns it through `stop`.
pub trait PlaybackProvider: Send + Sync + 'static {
    type Handle: Send + 'static;

    fn start(
        &self,
        volume: f32,
        sound: &SoundRef,
        on_complete: Completion,
    ) -> Result<Self::Handle, PlaybackError>;

    fn stop(&self, handle: Self::Handle);

    fn volume(&self) -> f32;

    fn set_volume(&self, volume: f32);

    fn vibrate(&self, pattern: &VibrationPattern);
}

/// Records every call and holds completions until the owner fires them.
#[derive(Default)]
pub struct MemoryPlayback {
    state: Mutex<MemoryPlaybackState>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryPlaybackLog {
    pub volume: f32,
    pub started: Vec<(u64, SoundRef, f32)>,
    pub stopped: Vec<u64>,
    pub vibrations: Vec<VibrationPattern>,
}

#[derive(Default)]
struct MemoryPlaybackState {
    log: MemoryPlaybackLog,
    next_handle: u64,
    fail_next: bool,
    pending: Vec<(u64, Completion)>,
}

impl MemoryPlayback {
    pub fn with_volume(volume: f32) -> Self {
        let playback = Self::default();
        playback.set_volume(volume);
        playback
    }

    /// Make the next `start` fail.
    pub fn fail_next_start(&self) {
        self.lock().fail_next = true;
    }

    /// Fire every pending completion, as if playback had run to its end.
    /// Returns how many fired.
    pub fn complete_all(&self) -> usize {
        let pending = std::mem::take(&mut self.lock().pending);
        let fired = pending.len();
        for (_, on_complete) in pending {
            on_complete();
        }
        fired
    }

    pub fn log(&self) -> MemoryPlaybackLog {
        self.lock().log.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryPlaybackState> {
        // A panic in a completion never leaves the log half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl PlaybackProvider for MemoryPlayback {
    type Handle = u64;

    fn start(
        &self,
        volume: f32,
        sound: &SoundRef,
        on_complete: Completion,
    ) -> Result<u64, PlaybackError> {
        let mut state = self.lock();
        if std::mem::take(&mut state.fail_next) {
            return Err(PlaybackError::StartFailed(
                sound.to_string(),
                "backend unavailable".into(),
            ));
        }
        state.next_handle += 1;
        let handle = state.next_handle;
        state.log.started.push((handle, sound.clone(), volume));
        state.pending.push((handle, on_complete));
        Ok(handle)
    }

    fn stop(&self, handle: u64) {
        let mut state = self.lock();
        state.pending.retain(|(h, _)| *h != handle);
        state.log.stopped.push(handle);
    }

    fn volume(&self) -> f32 {
        self.lock().log.volume
    }

    fn set_volume(&self, volume: f32) {
        self.lock().log.volume = volume;
    }

    fn vibrate(&self, pattern: &VibrationPattern) {
        self.lock().log.vibrations.push(pattern.clone());
    }
}
