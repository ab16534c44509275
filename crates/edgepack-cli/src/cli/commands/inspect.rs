use super::super::args::InspectArgs;
use crate::exit_codes;
use edgepack_core::bundle::inspect;
use edgepack_core::PackConfig;

pub fn run(args: InspectArgs, config: &PackConfig) -> anyhow::Result<i32> {
    let listing = match inspect(&args.archive, &config.manifest_file) {
        Ok(listing) => listing,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(e.exit_code());
        }
    };

    for member in &listing.members {
        let marker = if member.is_file { ' ' } else { '*' };
        println!("{:>10} {marker} {}", member.size, member.path);
    }

    match listing.manifest {
        Some(Ok(m)) => {
            println!("manifest: version {}", m.version);
            Ok(exit_codes::SUCCESS)
        }
        Some(Err(e)) => {
            eprintln!("manifest: {e}");
            Ok(exit_codes::INVALID_INPUT)
        }
        None => {
            eprintln!("manifest: {} not found at archive root", config.manifest_file);
            Ok(exit_codes::INVALID_INPUT)
        }
    }
}
