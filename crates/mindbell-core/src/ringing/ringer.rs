//! Ring orchestration.
//!
//! The ringer consults the mute decision, tears down any ring still in
//! flight, then starts sound and vibration. It owns at most one playback
//! handle together with the volume to restore when that ring finishes.
//! `on_done` is invoked exactly once per ring, whether the ring was muted,
//! had nothing to play, failed to start, ran to its end or was replaced by a
//! newer ring.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::playback::{Completion, PlaybackProvider};
use super::watchdog::{WatchOutcome, Watchdog};
use crate::mute::{evaluate_signals, MuteReason, PhoneSignals};
use crate::prefs::Prefs;

/// "Explain to user" side channel for suppressed rings.
pub trait MuteNotifier: Send + Sync {
    fn show(&self, reason: MuteReason);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum RingOutcome {
    Ringing,
    Muted(MuteReason),
    /// Neither sound nor vibration enabled; nothing played.
    Silent,
    /// Backend refused to start; `on_done` already ran.
    Failed,
}

impl RingOutcome {
    pub fn started(&self) -> bool {
        matches!(self, RingOutcome::Ringing)
    }
}

struct ActiveRing<H> {
    id: u64,
    handle: H,
    restore_volume: f32,
    on_done: Completion,
}

struct Inner<P: PlaybackProvider> {
    playback: P,
    notifier: Option<Box<dyn MuteNotifier>>,
    active: Mutex<Option<ActiveRing<P::Handle>>>,
    next_id: AtomicU64,
    last_completed: AtomicU64,
}

pub struct Ringer<P: PlaybackProvider> {
    inner: Arc<Inner<P>>,
}

impl<P: PlaybackProvider> Ringer<P> {
    pub fn new(playback: P) -> Self {
        Self::build(playback, None)
    }

    pub fn with_notifier(playback: P, notifier: Box<dyn MuteNotifier>) -> Self {
        Self::build(playback, Some(notifier))
    }

    fn build(playback: P, notifier: Option<Box<dyn MuteNotifier>>) -> Self {
        Self {
            inner: Arc::new(Inner {
                playback,
                notifier,
                active: Mutex::new(None),
                next_id: AtomicU64::new(1),
                last_completed: AtomicU64::new(0),
            }),
        }
    }

    pub fn playback(&self) -> &P {
        &self.inner.playback
    }

    pub fn is_ringing(&self) -> bool {
        self.inner.lock_active().is_some()
    }

    /// Start a ring unless muted. Never blocks on playback.
    pub fn ring_bell<S: PhoneSignals + ?Sized>(
        &self,
        now_millis: i64,
        prefs: &Prefs,
        signals: &S,
        on_done: Completion,
    ) -> RingOutcome {
        let inner = &self.inner;

        let reason = evaluate_signals(now_millis, prefs, signals);
        if reason.is_muted() {
            info!(%reason, "ring suppressed");
            if prefs.show_mute_reason {
                if let Some(notifier) = &inner.notifier {
                    notifier.show(reason);
                }
            }
            on_done();
            return RingOutcome::Muted(reason);
        }

        let bell = &prefs.bell;
        if !bell.sound_enabled && !bell.vibrate {
            debug!("sound and vibration both disabled, nothing to ring");
            on_done();
            return RingOutcome::Silent;
        }

        self.finish_ringing();

        if bell.vibrate {
            inner.playback.vibrate(&bell.vibration_pattern);
        }
        if !bell.sound_enabled {
            info!("ringing with vibration only");
            on_done();
            return RingOutcome::Ringing;
        }

        let id = inner.next_id.fetch_add(1, Ordering::SeqCst);
        let restore_volume = inner.playback.volume();
        inner.playback.set_volume(bell.volume);

        let weak: Weak<Inner<P>> = Arc::downgrade(inner);
        let on_complete: Completion = Box::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.playback_completed(id);
            }
        });

        match inner.playback.start(bell.volume, &bell.sound, on_complete) {
            Ok(handle) => {
                let ring = ActiveRing {
                    id,
                    handle,
                    restore_volume,
                    on_done,
                };
                let mut active = inner.lock_active();
                if inner.last_completed.load(Ordering::SeqCst) == id {
                    // Playback finished inside start().
                    drop(active);
                    inner.release(ring, false);
                } else {
                    *active = Some(ring);
                }
                info!(ring = id, sound = %bell.sound, volume = bell.volume, "ringing");
                RingOutcome::Ringing
            }
            Err(err) => {
                warn!(error = %err, "playback failed to start");
                inner.playback.set_volume(restore_volume);
                on_done();
                RingOutcome::Failed
            }
        }
    }

    /// Stop the ring in flight, if any, restoring the volume.
    pub fn finish_ringing(&self) {
        let ring = self.inner.lock_active().take();
        if let Some(ring) = ring {
            info!(ring = ring.id, "finishing ring in flight");
            self.inner.release(ring, true);
        }
    }

    /// [`ring_bell`](Self::ring_bell) guarded by `watchdog`: returns once the
    /// ring is done, cancelled or the watchdog timeout elapsed.
    pub async fn ring_and_wait<S: PhoneSignals + ?Sized>(
        &self,
        now_millis: i64,
        prefs: &Prefs,
        signals: &S,
        watchdog: &Watchdog,
    ) -> (RingOutcome, WatchOutcome) {
        let (tx, rx) = oneshot::channel();
        let outcome = self.ring_bell(
            now_millis,
            prefs,
            signals,
            Box::new(move || {
                let _ = tx.send(());
            }),
        );
        let watched = watchdog.wait(rx).await;
        (outcome, watched)
    }
}

impl<P: PlaybackProvider> Inner<P> {
    fn lock_active(&self) -> MutexGuard<'_, Option<ActiveRing<P::Handle>>> {
        self.active.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn playback_completed(&self, id: u64) {
        self.last_completed.store(id, Ordering::SeqCst);
        let ring = {
            let mut active = self.lock_active();
            match active.as_ref() {
                Some(ring) if ring.id == id => active.take(),
                _ => None,
            }
        };
        if let Some(ring) = ring {
            info!(ring = id, "ring completed");
            self.release(ring, false);
        }
    }

    fn release(&self, ring: ActiveRing<P::Handle>, stop: bool) {
        if stop {
            self.playback.stop(ring.handle);
        }
        self.playback.set_volume(ring.restore_volume);
        (ring.on_done)();
    }
}
