use super::args::*;
use std::path::Path;

use edgepack_core::PackConfig;

pub mod build;
pub mod inspect;
pub mod token;
pub mod validate;

use crate::exit_codes::SUCCESS;

pub fn dispatch(cli: Cli) -> anyhow::Result<i32> {
    let config = load_config(cli.config.as_deref())?;
    match cli.cmd {
        Command::Build(args) => build::run(args, config),
        Command::Checksum(args) => build::checksum(args),
        Command::Validate(args) => validate::run(args),
        Command::Token(args) => token::run(args, &config),
        Command::Inspect(args) => inspect::run(args, &config),
        Command::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(SUCCESS)
        }
    }
}

/// Environment first, then the config file on top.
fn load_config(path: Option<&Path>) -> anyhow::Result<PackConfig> {
    let config = PackConfig::from_env();
    let Some(path) = path else {
        return Ok(config);
    };
    tracing::debug!(path = %path.display(), "loading config overrides");
    Ok(config.apply(PackConfig::load_overrides(path)?))
}
