//! `mirrorkit` command-line entry point.
//!
//! Usage: `mirrorkit <SOURCE> <DESTINATION> [IGNORE_FILE]`

mod cli;
mod error;

use std::io::{self, Write};
use std::path::Path;
use std::process::ExitCode;

use clap::Parser;
use mirrorkit_io_fs::{EnumMirrorAction, IgnoreMatcher, mirror_tree_with};
use tracing::{debug, info};

use cli::Cli;
use error::{CliError, Result};

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("[ERROR] {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    mirrorkit_log::init(cli.verbose).map_err(|e| CliError::Logging(e.to_string()))?;

    let ignore_matcher = load_ignore_matcher(cli.ignore_file.as_deref())?;
    let mut stdout = std::io::stdout().lock();
    run_mirror(cli, &ignore_matcher, &mut stdout)
}

/// Mirror and print the action log to `out`.
///
/// The mirror run is not interrupted by a failing writer; the first write
/// error is returned once the run is over.
fn run_mirror<W: Write>(cli: &Cli, ignore_matcher: &IgnoreMatcher, out: &mut W) -> Result<()> {
    let mut err_output: Option<io::Error> = None;
    let report = mirror_tree_with(
        &cli.source,
        &cli.destination,
        ignore_matcher,
        cli.to_options(),
        &mut |action| match action {
            EnumMirrorAction::Error { .. } => eprintln!("{action}"),
            _ => {
                if let Err(e) = writeln!(out, "{action}") {
                    err_output.get_or_insert(e);
                }
            }
        },
    )?;
    info!("{}", report.format("[MIRROR]"));

    if let Some(e) = err_output {
        return Err(CliError::Output(e));
    }
    writeln!(out, "Sync finished.").map_err(CliError::Output)?;
    out.flush().map_err(CliError::Output)?;
    Ok(())
}

fn load_ignore_matcher(path_rules: Option<&Path>) -> Result<IgnoreMatcher> {
    let Some(path_rules) = path_rules else {
        return Ok(IgnoreMatcher::default());
    };
    if !path_rules.exists() {
        debug!(path = %path_rules.display(), "ignore file not found; no rules loaded");
    }
    let ignore_matcher =
        IgnoreMatcher::from_file(path_rules).map_err(|e| CliError::RulesFile {
            path: path_rules.to_path_buf(),
            source: e,
        })?;
    info!(
        path = %path_rules.display(),
        rules = ignore_matcher.len(),
        "ignore rules loaded"
    );
    Ok(ignore_matcher)
}

#[cfg(test)]
mod tests {
    use std::io::{self, Write};

    use clap::Parser;
    use mirrorkit_io_fs::IgnoreMatcher;

    use super::run_mirror;
    use crate::cli::Cli;
    use crate::error::CliError;

    struct BrokenPipeWriter;

    impl Write for BrokenPipeWriter {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Err(io::Error::from(io::ErrorKind::BrokenPipe))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn parse_cli(src: &std::path::Path, dst: &std::path::Path) -> Cli {
        Cli::try_parse_from([
            std::ffi::OsStr::new("mirrorkit"),
            src.as_os_str(),
            dst.as_os_str(),
        ])
        .expect("parse")
    }

    #[test]
    fn run_mirror_writes_action_log_and_completion() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        std::fs::create_dir_all(&src).expect("mkdir src");
        std::fs::write(src.join("a.txt"), "a").expect("write");

        let mut raw_out = Vec::new();
        run_mirror(&parse_cli(&src, &dst), &IgnoreMatcher::default(), &mut raw_out)
            .expect("run mirror");

        let txt_out = String::from_utf8(raw_out).expect("utf8");
        assert!(txt_out.starts_with("[COPY] "));
        assert!(txt_out.ends_with("Sync finished.\n"));
    }

    #[test]
    fn run_mirror_reports_closed_output() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let src = tmp.path().join("src");
        let dst = tmp.path().join("dst");
        std::fs::create_dir_all(&src).expect("mkdir src");
        std::fs::write(src.join("a.txt"), "a").expect("write");

        let err = run_mirror(
            &parse_cli(&src, &dst),
            &IgnoreMatcher::default(),
            &mut BrokenPipeWriter,
        )
        .expect_err("broken writer must fail");
        assert!(matches!(err, CliError::Output(_)));
        // The mirror itself still completed.
        assert!(dst.join("a.txt").exists());

        let err = run_mirror(
            &parse_cli(&src, &dst),
            &IgnoreMatcher::default(),
            &mut BrokenPipeWriter,
        )
        .expect_err("completion line must fail too");
        assert!(matches!(err, CliError::Output(_)));
    }
}
