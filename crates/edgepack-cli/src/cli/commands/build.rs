use super::super::args::{BuildArgs, ChecksumArgs};
use crate::exit_codes;
use anyhow::Context;
use edgepack_core::dedup::parse_version_list;
use edgepack_core::{
    check_duplicate, validate_existing, Bundle, BundleBuilder, DuplicateCheckResult, PackConfig,
};
use std::path::Path;

pub fn run(args: BuildArgs, config: PackConfig) -> anyhow::Result<i32> {
    let config = match args.output_dir {
        Some(dir) => config.with_output_dir(dir),
        None => config,
    };

    let bundle = match BundleBuilder::new(config).build(&args.dir) {
        Ok(bundle) => bundle,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(e.exit_code());
        }
    };

    println!("bundle:   {}", bundle.path.display());
    println!("checksum: {}", bundle.checksum);
    if let Some(manifest) = &bundle.manifest {
        println!("version:  {}", manifest.version);
    }
    println!("members:  {}", bundle.member_files.len());

    report_duplicate(&bundle, args.versions.as_deref())
}

pub fn checksum(args: ChecksumArgs) -> anyhow::Result<i32> {
    let bundle = match validate_existing(&args.archive) {
        Ok(bundle) => bundle,
        Err(e) => {
            eprintln!("error: {e}");
            return Ok(e.exit_code());
        }
    };
    println!("{}  {}", bundle.checksum, bundle.path.display());
    report_duplicate(&bundle, args.versions.as_deref())
}

fn report_duplicate(bundle: &Bundle, versions: Option<&Path>) -> anyhow::Result<i32> {
    let Some(path) = versions else {
        return Ok(exit_codes::SUCCESS);
    };
    let raw = std::fs::read(path)
        .with_context(|| format!("failed to read version list {}", path.display()))?;
    let versions = parse_version_list(&raw)
        .with_context(|| format!("failed to parse version list {}", path.display()))?;

    match check_duplicate(bundle, &versions) {
        DuplicateCheckResult::Clear => Ok(exit_codes::SUCCESS),
        DuplicateCheckResult::Duplicate(existing) => {
            eprintln!(
                "error: bundle is identical to published version {} (checksum {})",
                existing.identifier, existing.checksum
            );
            Ok(exit_codes::DUPLICATE)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn workdir() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("main.js"),
            "export function onClientRequest() {}\n",
        )
        .unwrap();
        fs::write(
            dir.path().join("bundle.json"),
            r#"{"edgeworker-version":"1.0"}"#,
        )
        .unwrap();
        dir
    }

    #[test]
    fn build_reports_missing_files_with_exit_code() {
        let empty = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        let code = run(
            BuildArgs {
                dir: empty.path().to_path_buf(),
                output_dir: Some(out.path().to_path_buf()),
                versions: None,
            },
            PackConfig::default(),
        )
        .unwrap();
        assert_eq!(code, exit_codes::CONFIG_ERROR);
    }

    #[test]
    fn build_fails_on_duplicate_version() {
        let work = workdir();
        let out = tempfile::tempdir().unwrap();
        let config = PackConfig::default().with_output_dir(out.path());
        let built = BundleBuilder::new(config.clone()).build(work.path()).unwrap();

        let versions = out.path().join("versions.json");
        fs::write(
            &versions,
            format!(r#"[{{"version":"1.0","checksum":"{}"}}]"#, built.checksum),
        )
        .unwrap();

        let code = run(
            BuildArgs {
                dir: work.path().to_path_buf(),
                output_dir: None,
                versions: Some(versions.clone()),
            },
            config,
        )
        .unwrap();
        assert_eq!(code, exit_codes::DUPLICATE);

        let code = checksum(ChecksumArgs {
            archive: built.path,
            versions: Some(versions),
        })
        .unwrap();
        assert_eq!(code, exit_codes::DUPLICATE);
    }

    #[test]
    fn unreadable_version_list_is_an_error() {
        let work = workdir();
        let out = tempfile::tempdir().unwrap();
        let result = run(
            BuildArgs {
                dir: work.path().to_path_buf(),
                output_dir: Some(out.path().to_path_buf()),
                versions: Some(out.path().join("missing.json")),
            },
            PackConfig::default(),
        );
        assert!(result.is_err());
    }
}
