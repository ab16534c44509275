use super::super::args::ValidateArgs;
use crate::exit_codes;
use anyhow::Context;
use edgepack_core::manifest;

pub fn run(args: ValidateArgs) -> anyhow::Result<i32> {
    let raw = std::fs::read(&args.manifest)
        .with_context(|| format!("failed to read {}", args.manifest.display()))?;

    match manifest::validate(&raw) {
        Ok(m) => {
            println!("ok: version {}", m.version);
            if let Some(api) = &m.api_version {
                println!("api-version: {api}");
            }
            Ok(exit_codes::SUCCESS)
        }
        Err(e) => {
            eprintln!("error: {}: {e}", args.manifest.display());
            Ok(exit_codes::INVALID_INPUT)
        }
    }
}
