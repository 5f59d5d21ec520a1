//! Ring through the terminal bell.

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use mindbell_core::error::PlaybackError;
use mindbell_core::events::utc_from_millis;
use mindbell_core::mute::MuteReason;
use mindbell_core::ringing::{Completion, MuteNotifier};
use mindbell_core::{
    Event, PlaybackProvider, Prefs, RingOutcome, Ringer, SoundRef, StaticSignals,
    VibrationPattern, WatchOutcome, Watchdog,
};

use super::{load_config, load_prefs, now_millis, print_events, CliResult};

/// How long one terminal ring "plays" before it reports completion.
const RING_DURATION: Duration = Duration::from_secs(2);

/// Writes BEL to stderr and completes after [`RING_DURATION`].
pub struct TerminalBell {
    volume: Mutex<f32>,
}

impl Default for TerminalBell {
    fn default() -> Self {
        Self {
            volume: Mutex::new(1.0),
        }
    }
}

impl PlaybackProvider for TerminalBell {
    /// Set when the ring is stopped early.
    type Handle = Arc<AtomicBool>;

    fn start(
        &self,
        volume: f32,
        sound: &SoundRef,
        on_complete: Completion,
    ) -> Result<Self::Handle, PlaybackError> {
        let mut stderr = std::io::stderr();
        stderr
            .write_all(b"\x07")
            .and_then(|_| stderr.flush())
            .map_err(|e| PlaybackError::StartFailed(sound.to_string(), e.to_string()))?;
        tracing::debug!(%sound, volume, "terminal bell");

        let stopped = Arc::new(AtomicBool::new(false));
        let watched = stopped.clone();
        std::thread::spawn(move || {
            std::thread::sleep(RING_DURATION);
            if !watched.load(Ordering::SeqCst) {
                on_complete();
            }
        });
        Ok(stopped)
    }

    fn stop(&self, handle: Self::Handle) {
        handle.store(true, Ordering::SeqCst);
    }

    fn volume(&self) -> f32 {
        *self.volume.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn set_volume(&self, volume: f32) {
        *self.volume.lock().unwrap_or_else(|p| p.into_inner()) = volume;
    }

    fn vibrate(&self, pattern: &VibrationPattern) {
        tracing::debug!(%pattern, "no vibrator on a terminal");
    }
}

struct StderrNotifier;

impl MuteNotifier for StderrNotifier {
    fn show(&self, reason: MuteReason) {
        eprintln!("{reason}");
    }
}

/// Ring once and report the outcome as an event.
pub fn ring_now(now: i64, prefs: &Prefs, wait: bool) -> CliResult<Event> {
    let ringer = Ringer::with_notifier(TerminalBell::default(), Box::new(StderrNotifier));
    let signals = StaticSignals::default();

    if !wait {
        let outcome = ringer.ring_bell(now, prefs, &signals, Box::new(|| {}));
        return Ok(ring_event(outcome, None, now));
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()?;
    let watchdog = Watchdog::default();
    let (outcome, watched) =
        runtime.block_on(ringer.ring_and_wait(now, prefs, &signals, &watchdog));
    Ok(ring_event(outcome, Some(watched), now))
}

fn ring_event(outcome: RingOutcome, watchdog: Option<WatchOutcome>, now: i64) -> Event {
    let at = utc_from_millis(now);
    match outcome {
        RingOutcome::Muted(reason) => Event::BellMuted { reason, at },
        outcome => Event::BellRang {
            outcome,
            watchdog,
            at,
        },
    }
}

pub fn run(wait: bool) -> CliResult {
    let config = load_config()?;
    let prefs = load_prefs(&config)?;
    let event = ring_now(now_millis(None)?, &prefs, wait)?;
    print_events(&[event])
}
