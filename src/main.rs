//! Portal viewer

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use portal::prelude::*;

/// Animated portal in a lit room
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// RON or JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Scene variant, overriding the config file
    #[arg(long, value_enum)]
    variant: Option<SceneVariant>,

    /// Frame scheduling, overriding the config file
    #[arg(long, value_enum)]
    frame_policy: Option<FramePolicy>,

    /// Asset directory, overriding the config file
    #[arg(long)]
    assets: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> anyhow::Result<PortalConfig> {
        let mut config = match &self.config {
            Some(path) => PortalConfig::load(path)
                .with_context(|| format!("loading config {}", path.display()))?,
            None => PortalConfig::default(),
        };
        if let Some(variant) = self.variant {
            config.variant = variant;
        }
        if let Some(policy) = self.frame_policy {
            config.frame_policy = policy;
        }
        if let Some(assets) = self.assets {
            config.asset_root = assets;
        }
        Ok(config)
    }
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Cli::parse().into_config()?;
    log::info!(
        "Variant {:?}, frame policy {:?}, assets in {}",
        config.variant,
        config.frame_policy,
        config.asset_root.display()
    );

    let engine = Engine::new(config.engine_config(), PortalApp::new(config));
    engine.run()?;
    Ok(())
}
