//! Command-line front end over the casework request boundary.
//!
//! # Responsibility
//! - Load configuration from the environment and open the configured stores.
//! - Log in as the configured operator and print one listing or report as
//!   JSON.
//!
//! Every command runs the same token-checked path a presentation layer uses.

use casework_core::api::ApiError;
use casework_core::{
    init_logging, open_stores, seed_demo, CaseworkApi, Clock, CoreConfig, RequestParams,
    SystemClock,
};
use clap::{Parser, Subcommand};
use log::{error, info};
use serde_json::Value;
use std::process::ExitCode;
use std::sync::Arc;

#[derive(Debug, Parser)]
#[command(name = "casework", version, about = "Social-assistance casework dashboard")]
struct Cli {
    /// Skip loading the demo registry and attendances.
    #[arg(long)]
    no_seed: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print core version and health probe.
    Ping,
    /// List registry entries.
    Persons {
        /// Request parameter as `key=value`, e.g. `search=maria` or `sexo=F`.
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// List attendance records.
    Attendances {
        /// Request parameter as `key=value`, e.g. `resultado=APROVADO`.
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Build a dashboard report.
    Report {
        /// One of `geral|mensal|servicos|tecnicos|demografico`.
        #[arg(long, default_value = "geral")]
        tipo: String,
        #[arg(long)]
        data_inicio: Option<String>,
        #[arg(long)]
        data_fim: Option<String>,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    if let Command::Ping = cli.command {
        println!("casework_core ping={}", casework_core::ping());
        println!("casework_core version={}", casework_core::core_version());
        return ExitCode::SUCCESS;
    }

    match run(cli) {
        Ok(output) => {
            println!("{output}");
            ExitCode::SUCCESS
        }
        Err(message) => {
            eprintln!("{message}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<String, String> {
    let config = CoreConfig::from_env().map_err(|err| format!("configuration: {err}"))?;
    init_logging(&config.logging)?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (persons, attendances) =
        open_stores(&config.store).map_err(|err| format!("store: {err}"))?;
    if !cli.no_seed {
        seed_demo(&persons, &attendances, clock.today()).map_err(|err| format!("seed: {err}"))?;
    }

    let api = CaseworkApi::new(persons, attendances, &config, clock)
        .map_err(|err| format!("token: {err}"))?;
    let session = api
        .login(&config.operator.username, &config.operator.password)
        .map_err(failure)?
        .data;
    info!(
        "event=cli_session module=cli status=ok user={}",
        session.user.id
    );
    let token = Some(session.token.as_str());

    let body = match cli.command {
        Command::Ping => return Ok(String::new()),
        Command::Persons { params } => {
            to_json(&api.list_persons(token, &into_params(params)).map_err(failure)?)
        }
        Command::Attendances { params } => {
            to_json(&api.list_attendances(token, &into_params(params)).map_err(failure)?)
        }
        Command::Report {
            tipo,
            data_inicio,
            data_fim,
        } => {
            let mut params = RequestParams::new();
            params.insert("tipo".to_string(), tipo);
            if let Some(start) = data_inicio {
                params.insert("dataInicio".to_string(), start);
            }
            if let Some(end) = data_fim {
                params.insert("dataFim".to_string(), end);
            }
            to_json(&api.report(token, &params).map_err(failure)?)
        }
    }?;
    Ok(body)
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(key, value)| (key.trim().to_string(), value.to_string()))
        .filter(|(key, _)| !key.is_empty())
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

fn into_params(pairs: Vec<(String, String)>) -> RequestParams {
    pairs.into_iter().collect()
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string_pretty(value).map_err(|err| format!("encode: {err}"))
}

fn failure(err: ApiError) -> String {
    error!(
        "event=cli_command module=cli status=error code={}",
        err.status_code()
    );
    let envelope = serde_json::to_value(err.envelope()).unwrap_or(Value::Null);
    format!("{} {envelope}", err.status_code())
}

#[cfg(test)]
mod tests {
    use super::{into_params, parse_param, Cli};
    use clap::Parser;

    #[test]
    fn param_splits_on_first_equals() {
        assert_eq!(
            parse_param("search=a=b").unwrap(),
            ("search".to_string(), "a=b".to_string())
        );
        assert!(parse_param("search").is_err());
        assert!(parse_param("=x").is_err());
    }

    #[test]
    fn later_params_override_earlier_ones() {
        let params = into_params(vec![
            ("page".to_string(), "1".to_string()),
            ("page".to_string(), "2".to_string()),
        ]);
        assert_eq!(params.get("page").map(String::as_str), Some("2"));
    }

    #[test]
    fn report_defaults_to_general() {
        let cli = Cli::try_parse_from(["casework", "report"]).unwrap();
        assert!(matches!(cli.command, super::Command::Report { ref tipo, .. } if tipo == "geral"));
    }
}
