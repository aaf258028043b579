use crate::dashboard::{get_dashboard, otel_app_semantic};
use crate::error::Error;
use crate::manifest::Manifest;
use clap::{Arg, ArgAction, ArgMatches, Command};
use ringlog::{debug, info};
use std::io::Write;
use std::path::PathBuf;

mod config;

pub use self::config::File;

/// Settings for the `generate` subcommand
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub verbose: u8,
    pub dashboard: String,
    pub folder: String,
    pub dashboard_config: otel_app_semantic::Config,
    pub output: Option<PathBuf>,
    pub compact: bool,
}

impl TryFrom<ArgMatches> for Config {
    type Error = Error;

    /// Flags take precedence over the config file. Without a file the log
    /// row uses the default query.
    fn try_from(args: ArgMatches) -> Result<Self, Error> {
        let mut file = match args.get_one::<PathBuf>("CONFIG") {
            Some(path) => File::load(path)?,
            None => File {
                folder: String::new(),
                dashboard: otel_app_semantic::Config {
                    logs_query: Some(otel_app_semantic::DEFAULT_LOGS_QUERY.to_string()),
                    ..Default::default()
                },
            },
        };

        if let Some(folder) = args.get_one::<String>("FOLDER") {
            file.folder = folder.clone();
        }
        if let Some(query) = args.get_one::<String>("LOGS_QUERY") {
            file.dashboard.logs_query = Some(query.clone());
        }
        if args.get_flag("NO_LOGS") {
            file.dashboard.logs_query = None;
        }
        if let Some(namespaces) = args.get_many::<String>("NAMESPACE") {
            file.dashboard.service_namespaces = namespaces.cloned().collect();
        }
        if let Some(names) = args.get_many::<String>("SERVICE") {
            file.dashboard.service_names = names.cloned().collect();
        }

        Ok(Config {
            verbose: *args.get_one::<u8>("VERBOSE").unwrap_or(&0),
            dashboard: args
                .get_one::<String>("DASHBOARD")
                .cloned()
                .unwrap_or_else(|| "otel-app-semantic".to_string()),
            folder: file.folder,
            dashboard_config: file.dashboard,
            output: args.get_one::<PathBuf>("OUTPUT").cloned(),
            compact: args.get_flag("COMPACT"),
        })
    }
}

/// Create the generate subcommand
pub fn command() -> Command {
    Command::new("generate")
        .about("Render a dashboard manifest as JSON")
        .arg(
            Arg::new("DASHBOARD")
                .help("Dashboard to render, see `list`")
                .default_value("otel-app-semantic")
                .index(1),
        )
        .arg(
            Arg::new("CONFIG")
                .long("config")
                .short('c')
                .help("TOML file with folder and dashboard settings")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("FOLDER")
                .long("folder")
                .help("Folder uid for the manifest annotation"),
        )
        .arg(
            Arg::new("LOGS_QUERY")
                .long("logs-query")
                .help("LogQL expression for the logs row"),
        )
        .arg(
            Arg::new("NO_LOGS")
                .long("no-logs")
                .help("Leave out the logs row")
                .action(ArgAction::SetTrue)
                .conflicts_with("LOGS_QUERY"),
        )
        .arg(
            Arg::new("NAMESPACE")
                .long("namespace")
                .help("Allowed service namespace, repeatable")
                .action(ArgAction::Append)
                .value_delimiter(','),
        )
        .arg(
            Arg::new("SERVICE")
                .long("service")
                .help("Allowed service name, repeatable")
                .action(ArgAction::Append)
                .value_delimiter(','),
        )
        .arg(
            Arg::new("OUTPUT")
                .long("output")
                .short('o')
                .help("Write the manifest to a file instead of stdout")
                .value_parser(clap::value_parser!(PathBuf)),
        )
        .arg(
            Arg::new("COMPACT")
                .long("compact")
                .help("Emit single line JSON")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("VERBOSE")
                .long("verbose")
                .short('v')
                .help("Increase verbosity")
                .action(ArgAction::Count),
        )
}

/// Build the named dashboard and serialize it inside its manifest
pub fn render(config: &Config) -> Result<String, Error> {
    let dashboard = get_dashboard(&config.dashboard, &config.dashboard_config)
        .ok_or_else(|| Error::UnknownDashboard(config.dashboard.clone()))??;

    debug!(
        "`{}`: {} variables, {} rows, {} panels",
        dashboard.uid,
        dashboard.templating.list.len(),
        dashboard.rows().count(),
        dashboard.panels.len()
    );

    Manifest::new(&config.folder, dashboard).to_json(!config.compact)
}

pub fn run(config: Config) -> Result<(), Error> {
    let json = render(&config)?;

    match &config.output {
        Some(path) => {
            std::fs::write(path, format!("{json}\n"))?;
            info!("wrote {} to {}", config.dashboard, path.display());
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            writeln!(stdout, "{json}")?;
            stdout.flush()?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn parse(args: &[&str]) -> Config {
        let matches = command()
            .try_get_matches_from(std::iter::once("generate").chain(args.iter().copied()))
            .unwrap();
        Config::try_from(matches).unwrap()
    }

    #[test]
    fn defaults() {
        let config = parse(&[]);
        assert_eq!(config.dashboard, "otel-app-semantic");
        assert_eq!(config.folder, "");
        assert_eq!(
            config.dashboard_config.logs_query(),
            Some(otel_app_semantic::DEFAULT_LOGS_QUERY)
        );
        assert!(config.dashboard_config.service_namespaces.is_empty());
        assert_eq!(config.output, None);
        assert!(!config.compact);
        assert_eq!(config.verbose, 0);
    }

    #[test]
    fn flags() {
        let config = parse(&[
            "--folder",
            "obs",
            "--namespace",
            "teamA,teamB",
            "--namespace",
            "teamC",
            "--service",
            "api",
            "--no-logs",
            "--compact",
            "-vv",
        ]);
        assert_eq!(config.folder, "obs");
        assert_eq!(
            config.dashboard_config.service_namespaces,
            vec!["teamA", "teamB", "teamC"]
        );
        assert_eq!(config.dashboard_config.service_names, vec!["api"]);
        assert_eq!(config.dashboard_config.logs_query(), None);
        assert!(config.compact);
        assert_eq!(config.verbose, 2);
    }

    #[test]
    fn no_logs_conflicts_with_query() {
        let result = command().try_get_matches_from(["generate", "--no-logs", "--logs-query", "{}"]);
        assert!(result.is_err());
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mixins.toml");
        std::fs::write(
            &path,
            "folder = \"from-file\"\n[dashboard]\nservice_namespaces = [\"teamA\"]\nservice_names = [\"api\"]\n",
        )
        .unwrap();

        let config = parse(&["--config", path.to_str().unwrap(), "--service", "web"]);
        assert_eq!(config.folder, "from-file");
        assert_eq!(config.dashboard_config.service_namespaces, vec!["teamA"]);
        assert_eq!(config.dashboard_config.service_names, vec!["web"]);
        // the file has no logs_query, so the row is dropped
        assert_eq!(config.dashboard_config.logs_query(), None);
    }

    #[test]
    fn render_manifest() {
        let config = parse(&["--folder", "obs", "--namespace", "teamA"]);
        let value: Value = serde_json::from_str(&render(&config).unwrap()).unwrap();

        assert_eq!(value["metadata"]["annotations"]["grafana.app/folder"], "obs");
        assert_eq!(value["spec"]["templating"]["list"][2]["regex"], "/^(teamA)$/");
        assert_eq!(value["spec"]["templating"]["list"][2]["multi"], false);
        assert_eq!(value["spec"]["panels"].as_array().unwrap().len(), 7);
    }

    #[test]
    fn unknown_dashboard() {
        let config = parse(&["kubernetes"]);
        assert!(matches!(
            render(&config),
            Err(Error::UnknownDashboard(name)) if name == "kubernetes"
        ));
    }

    #[test]
    fn allow_list_patterns_kept() {
        let config = parse(&["--namespace", "team(a", "--service", "(?!canary).*"]);
        let value: Value = serde_json::from_str(&render(&config).unwrap()).unwrap();

        assert_eq!(value["spec"]["templating"]["list"][2]["regex"], "/^(team(a)$/");
        assert_eq!(value["spec"]["templating"]["list"][3]["regex"], "/^((?!canary).*)$/");
    }

    #[test]
    fn writes_output_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dashboard.json");
        let config = parse(&["--output", path.to_str().unwrap()]);

        run(config.clone()).unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert_eq!(written, format!("{}\n", render(&config).unwrap()));
    }
}
