use clap::Subcommand;
use mindbell_core::events::utc_from_millis;
use serde_json::json;

use super::{load_config, now_millis, CliResult};

#[derive(Subcommand)]
pub enum MuteAction {
    /// Mute for the given number of minutes
    For {
        minutes: u32,
    },
}

pub fn run(action: MuteAction) -> CliResult {
    match action {
        MuteAction::For { minutes } => {
            let mut config = load_config()?;
            let until = now_millis(None)? + i64::from(minutes) * 60 * 1000;
            config.mute.muted_till = until;
            config.save()?;
            tracing::info!(minutes, "bell muted manually");
            println!(
                "{}",
                serde_json::to_string_pretty(&json!({ "muted_till": utc_from_millis(until) }))?
            );
        }
    }
    Ok(())
}

pub fn unmute() -> CliResult {
    let mut config = load_config()?;
    config.mute.muted_till = 0;
    config.save()?;
    println!("unmuted");
    Ok(())
}
