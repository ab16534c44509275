use super::super::args::TokenArgs;
use crate::exit_codes;
use edgepack_core::tokens::TokenEntryChange;
use edgepack_core::{PackConfig, PatchTarget, TokenPatcher, TokenRecord};

pub fn run(args: TokenArgs, config: &PackConfig) -> anyhow::Result<i32> {
    let target = PatchTarget::detect(args.path);
    let record = TokenRecord::new(args.token_name, args.reference);

    let patcher = TokenPatcher::new(config);
    let outcome = match patcher.patch(&target, &args.namespaces, &record, args.overwrite) {
        Ok(outcome) => outcome,
        Err(e) if e.is_no_change() => {
            println!("{e}; nothing to do");
            return Ok(exit_codes::SUCCESS);
        }
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(e.exit_code());
        }
    };

    let verb = match outcome.change {
        TokenEntryChange::Updated => "updated",
        TokenEntryChange::Created => "created",
    };
    println!(
        "{verb} {} in {} for namespaces: {}",
        config.token_file,
        outcome.path.display(),
        outcome.namespaces.join(", ")
    );
    Ok(exit_codes::SUCCESS)
}
