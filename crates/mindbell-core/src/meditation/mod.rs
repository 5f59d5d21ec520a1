mod session;

pub use session::{advance, MeditationCue, MeditationStep, MeditationTransition, NextFiring};
