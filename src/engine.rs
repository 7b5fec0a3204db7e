use std::time::Duration;

use anyhow::Context;

use crate::{demo::DemoState, hmd::HeadMountedDisplay};

/// Advances the demo by one tick using the current HMD input. Does nothing
/// while no session is running.
///
/// A face button starts a new round once the current one is over, and the
/// controllers vibrate on every tick that converts a prop.
pub fn update(
    state: &mut DemoState,
    hmd: &mut dyn HeadMountedDisplay,
    elapsed: Duration,
) -> anyhow::Result<()> {
    if !hmd.is_session_active() {
        return Ok(());
    }

    let hands = hmd.hands();
    if hands.button && state.reset().context("Failed to start a new round")? {
        log::debug!("Round reset from controller");
    }

    let hit = state
        .update(&hands, elapsed)
        .context("Failed to update demo state")?;
    hmd.set_vibration(if hit { 1.0 } else { 0.0 });

    Ok(())
}
