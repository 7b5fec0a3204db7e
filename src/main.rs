use anyhow::Result;

use crate::config::DemoConfig;

mod config;
mod demo;
mod engine;
mod hmd;
mod lighting;
mod math;
mod model;
mod rendering;
mod scene_graph;
mod window;

fn main() -> Result<()> {
    pretty_env_logger::init();

    pollster::block_on(window::run(DemoConfig::from_env()))?;

    Ok(())
}
