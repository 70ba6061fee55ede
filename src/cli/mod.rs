use crate::domain::{Project, SettingsError, SettingsInput, validate_settings};
use crate::infra::{Connector, DEFAULT_ENDPOINT, TraderError};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use thiserror::Error;

pub const DEFAULT_LOG_FILE: &str = "debug.log";
pub const ENDPOINT_ENV: &str = "TRADER_API_ENDPOINT";

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CliInvocation {
    PrintHelp,
    PrintVersion,
    Tui(RunOptions),
    /// Prompt for credentials on stdin and print the account's open orders.
    OpenOrders(RunOptions),
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RunOptions {
    pub config_path: Option<PathBuf>,
    pub log_file: PathBuf,
    pub endpoint: Option<String>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            config_path: None,
            log_file: PathBuf::from(DEFAULT_LOG_FILE),
            endpoint: None,
        }
    }
}

impl RunOptions {
    /// `--endpoint` wins over the environment, which wins over the built-in default.
    pub fn resolve_endpoint(&self, from_env: Option<String>) -> String {
        self.endpoint
            .clone()
            .or_else(|| from_env.filter(|value| !value.trim().is_empty()))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string())
    }
}

#[derive(Debug, Error, Eq, PartialEq)]
pub enum CliParseError {
    #[error("unknown flag: {0}")]
    UnknownFlag(String),

    #[error("missing value for flag: {0}")]
    MissingFlagValue(String),

    #[error("invalid value for {flag}: {value:?}")]
    InvalidFlagValue { flag: String, value: String },

    #[error("unexpected argument: {0}")]
    UnexpectedArgument(String),
}

pub fn parse_invocation(args: &[String]) -> Result<CliInvocation, CliParseError> {
    if args.iter().any(|arg| arg == "--help" || arg == "-h") {
        return Ok(CliInvocation::PrintHelp);
    }
    if args.iter().any(|arg| arg == "--version" || arg == "-V") {
        return Ok(CliInvocation::PrintVersion);
    }

    let mut options = RunOptions::default();
    let mut open_orders = false;
    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "--config" | "-c" => {
                let value = flag_value(&mut iter, "--config")?;
                options.config_path = Some(PathBuf::from(value));
            }
            "--log-file" => {
                let value = flag_value(&mut iter, "--log-file")?;
                options.log_file = PathBuf::from(value);
            }
            "--endpoint" => {
                let value = flag_value(&mut iter, "--endpoint")?;
                options.endpoint = Some(value.to_string());
            }
            "open-orders" if !open_orders => open_orders = true,
            _ if arg.starts_with('-') => {
                return Err(CliParseError::UnknownFlag(arg.to_string()));
            }
            _ => return Err(CliParseError::UnexpectedArgument(arg.to_string())),
        }
    }

    if open_orders {
        Ok(CliInvocation::OpenOrders(options))
    } else {
        Ok(CliInvocation::Tui(options))
    }
}

fn flag_value<'a>(
    iter: &mut impl Iterator<Item = &'a String>,
    flag: &str,
) -> Result<&'a str, CliParseError> {
    let value = iter
        .next()
        .ok_or_else(|| CliParseError::MissingFlagValue(flag.to_string()))?;
    if value.trim().is_empty() {
        return Err(CliParseError::InvalidFlagValue {
            flag: flag.to_string(),
            value: value.to_string(),
        });
    }
    Ok(value.as_str())
}

#[derive(Debug, Error)]
pub enum CliRunError {
    #[error(transparent)]
    Io(#[from] io::Error),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error(transparent)]
    Trader(#[from] TraderError),

    #[error("input ended before {0} was entered")]
    InputClosed(&'static str),

    #[error("market cannot be empty")]
    EmptyMarket,
}

/// Plain prompt-and-print flow: read credentials and a market, fetch once, print every order.
pub fn run_open_orders(
    input: &mut impl BufRead,
    out: &mut impl Write,
    connector: &dyn Connector,
) -> Result<(), CliRunError> {
    writeln!(out, "Getting open orders for account!")?;
    writeln!(out)?;

    let auth_header = prompt(input, out, "your auth header")?;
    let market = prompt(input, out, "the market you want to check")?;
    let public_key = prompt(input, out, "your public key")?;
    let open_orders_address = prompt(input, out, "your open orders address")?;
    if market.is_empty() {
        return Err(CliRunError::EmptyMarket);
    }

    let settings = validate_settings(&SettingsInput {
        auth_header,
        private_key: String::new(),
        public_key,
        open_orders_address,
        project: Project::Serum.as_str().to_string(),
    })?;
    let owner = settings
        .public_key
        .ok_or(TraderError::NotConfigured("public key"))?;
    let address = settings
        .open_orders_address
        .ok_or(TraderError::NotConfigured("open orders address"))?;

    writeln!(out)?;
    write!(out, "Loading...")?;
    out.flush()?;
    let client = connector.connect(&settings)?;
    let orders = client.open_orders(&market, owner, address, settings.project)?;

    writeln!(out)?;
    writeln!(out, "Orders ({}):", orders.len())?;
    for order in &orders {
        writeln!(
            out,
            "  [{}] Order {}: {}@{}",
            order.side.label(),
            order.order_id,
            order.remaining_size,
            order.price
        )?;
    }
    Ok(())
}

fn prompt(
    input: &mut impl BufRead,
    out: &mut impl Write,
    what: &'static str,
) -> Result<String, CliRunError> {
    writeln!(out, "Enter {what}: ")?;
    out.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(CliRunError::InputClosed(what));
    }
    Ok(line.trim().to_string())
}

pub fn help_text() -> String {
    format!(
        "\
{name} {version}
Terminal client for the bloXroute Trader API.

Usage:
  {name} [--config PATH] [--log-file PATH] [--endpoint URL]
  {name} open-orders [--endpoint URL]   prompt for an account and print its open orders

Options:
  -c, --config PATH    settings file (default: <config dir>/trader-tui/settings.json)
      --log-file PATH  log destination (default: {DEFAULT_LOG_FILE})
      --endpoint URL   Trader API base URL (env: {ENDPOINT_ENV}, default: {DEFAULT_ENDPOINT})
  -h, --help           print this help
  -V, --version        print the version

Keys:
  Ctrl+C / Ctrl+Q      quit from anywhere
  Tab / Shift+Tab      move between form fields
  Enter                submit / choose
  /                    filter a list
  q / Esc              leave a list
",
        name = env!("CARGO_PKG_NAME"),
        version = env!("CARGO_PKG_VERSION"),
    )
}
