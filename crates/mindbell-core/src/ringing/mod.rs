mod playback;
mod ringer;
mod watchdog;

pub use playback::{Completion, MemoryPlayback, MemoryPlaybackLog, PlaybackProvider};
pub use ringer::{MuteNotifier, RingOutcome, Ringer};
pub use watchdog::{WatchOutcome, Watchdog, WatchdogCancel, DEFAULT_WATCHDOG_TIMEOUT};
