use clap::Subcommand;
use mindbell_core::Trigger;

use super::{dispatcher, load_config, load_prefs, now_millis, print_events, CliResult};

#[derive(Subcommand)]
pub enum MeditateAction {
    /// Start a meditation with the configured ramp-up and periods
    Start,
    /// Stop the running meditation and resume the regular bell
    Stop,
}

pub fn run(action: MeditateAction) -> CliResult {
    let config = load_config()?;
    let prefs = load_prefs(&config)?;
    let mut dispatcher = dispatcher()?;
    let trigger = match action {
        MeditateAction::Start => Trigger::StartMeditation,
        MeditateAction::Stop => Trigger::StopMeditation,
    };
    let events = dispatcher.on_trigger(trigger, now_millis(None)?, &prefs)?;
    print_events(&events)
}
