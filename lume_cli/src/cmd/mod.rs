use std::path::PathBuf;

use anyhow::Result;
use lume_node::config::LumeNodeConfig;

mod frames;
mod keys;
mod store;

pub use frames::run_inspect;
pub use keys::{run_keygen, run_sign};
pub use store::{run_apply, run_get};

pub async fn run_command(config_file: PathBuf, cmd: crate::Commands) -> Result<()> {
    match cmd {
        crate::Commands::Config { cmd } => cmd.run(config_file),
        crate::Commands::Keygen { out, force } => run_keygen(&out, force),
        crate::Commands::Sign {
            key,
            revision,
            data,
            prefix,
        } => run_sign(&key, revision, &data, prefix),
        crate::Commands::Inspect { frame, prefixed } => run_inspect(&frame, prefixed),
        crate::Commands::Get { public_key } => {
            let config = LumeNodeConfig::load(&config_file)?;
            run_get(&config, &config_file, &public_key).await
        }
        crate::Commands::Apply { frame, from } => {
            let config = LumeNodeConfig::load(&config_file)?;
            run_apply(&config, &config_file, &frame, from.as_deref()).await
        }
    }
}
