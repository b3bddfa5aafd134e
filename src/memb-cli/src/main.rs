//! memb entry point
//!
//! Thin shell around the engine: parse options, set up logging, run the
//! operation, and turn the error taxonomy into process exit codes.

mod cli;
mod run;

use std::process::ExitCode;

use clap::Parser;
use tracing::Level;

use cli::Cli;
use memb::{ParamError, RegionError, SourceError};

fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = if cli.verbose {
        Level::DEBUG
    } else {
        match cli.log_level.parse() {
            Ok(level) => level,
            Err(_) => {
                eprintln!("memb: invalid -d,--log-level \"{}\"", cli.log_level);
                return ExitCode::from(126);
            }
        }
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let stdout = std::io::stdout();
    match run::run(&cli, &mut stdout.lock()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("memb: {err:#}");
            ExitCode::from(exit_code(&err))
        }
    }
}

/// Exit codes distinguish usage errors (126), addressing validation (124),
/// source-buffer errors (123), access preconditions (125) and open/mmap
/// failures (122).
fn exit_code(err: &anyhow::Error) -> u8 {
    if let Some(param) = err.downcast_ref::<ParamError>() {
        return match param {
            ParamError::InvalidWidth(_) | ParamError::InvalidMode(_) => 126,
            _ => 124,
        };
    }
    if err.downcast_ref::<SourceError>().is_some() {
        return 123;
    }
    if let Some(region) = err.downcast_ref::<RegionError>() {
        return match region {
            RegionError::NotAccessible { .. } => 125,
            _ => 122,
        };
    }
    if let Some(usage) = err.downcast_ref::<run::UsageError>() {
        return match usage {
            run::UsageError::SourceWithReadOnly => 123,
            run::UsageError::PrintCountTooLarge(_) => 126,
            run::UsageError::BinFileNotReadable(_) => 126,
        };
    }
    1
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn test_exit_codes_by_error_class() {
        assert_eq!(exit_code(&anyhow!(ParamError::InvalidWidth(3))), 126);
        assert_eq!(
            exit_code(&anyhow!(ParamError::IndexOutOfStep { index: 2, step: 2 })),
            124
        );
        assert_eq!(
            exit_code(&anyhow!(SourceError::InsufficientLiterals { min: 4 })),
            123
        );
        assert_eq!(
            exit_code(&anyhow!(RegionError::NotAccessible {
                path: "/dev/mem".into(),
                required: "readable",
            })),
            125
        );
        assert_eq!(exit_code(&anyhow!(run::UsageError::PrintCountTooLarge(33))), 126);
        assert_eq!(
            exit_code(&anyhow!(run::UsageError::BinFileNotReadable(
                "/nonexistent/memb-source.bin".into()
            ))),
            126
        );
        assert_eq!(exit_code(&anyhow!("unclassified")), 1);
    }
}
