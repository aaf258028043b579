use anyhow::Context;
use clap::Command;
use mixins::dashboard::DASHBOARDS;
use mixins::generate;
use ringlog::*;

fn main() -> anyhow::Result<()> {
    let cli = Command::new(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .about(env!("CARGO_PKG_DESCRIPTION"))
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(generate::command())
        .subcommand(Command::new("list").about("List the dashboards that can be generated"));

    match cli.get_matches().subcommand() {
        Some(("generate", args)) => {
            let config = generate::Config::try_from(args.clone())?;
            let mut log = configure_logging(config.verbose)?;

            let result = generate::run(config);
            finish(result, log.flush())
        }
        Some(("list", _)) => {
            for name in DASHBOARDS {
                println!("{name}");
            }
            Ok(())
        }
        _ => unreachable!("subcommand is required"),
    }
}

/// The command's own error wins over a failed log flush
fn finish(result: Result<(), mixins::Error>, flushed: std::io::Result<()>) -> anyhow::Result<()> {
    result.context("failed to generate dashboard manifest")?;
    flushed.context("failed to flush log")
}

/// Debug log on stderr, stdout is reserved for the manifest
fn configure_logging(verbose: u8) -> anyhow::Result<Box<dyn Drain>> {
    let level = match verbose {
        0 => Level::Info,
        1 => Level::Debug,
        _ => Level::Trace,
    };

    let debug_output: Box<dyn Output> = Box::new(Stderr::new());

    let debug_log = if level <= Level::Info {
        LogBuilder::new().format(ringlog::default_format)
    } else {
        LogBuilder::new()
    }
    .output(debug_output)
    .build()
    .map_err(|e| anyhow::anyhow!("failed to initialize debug log: {e:?}"))?;

    let log = MultiLogBuilder::new()
        .level_filter(level.to_level_filter())
        .default(debug_log)
        .build()
        .start();

    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn flush_errors_surface() {
        assert!(finish(Ok(()), Ok(())).is_ok());

        let err = finish(Ok(()), Err(io::Error::other("stderr closed"))).unwrap_err();
        assert_eq!(err.to_string(), "failed to flush log");
        assert_eq!(err.root_cause().to_string(), "stderr closed");
    }

    #[test]
    fn command_error_takes_precedence() {
        let err = finish(
            Err(mixins::Error::UnknownDashboard("kubernetes".to_string())),
            Err(io::Error::other("stderr closed")),
        )
        .unwrap_err();
        assert_eq!(err.to_string(), "failed to generate dashboard manifest");
        assert_eq!(err.root_cause().to_string(), "unknown dashboard `kubernetes`");
    }
}
