use fleet_health::{
    dispatcher::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_CONCURRENCY, DEFAULT_REQUEST_DELAY},
    DispatchConfig, Input, DEFAULT_MAX_REDIRECTS, DEFAULT_USER_AGENT,
};

use anyhow::{anyhow, Error, Result};
use lazy_static::lazy_static;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use std::{fs, io::ErrorKind, path::PathBuf};
use structopt::StructOpt;

const OUTPUT: &str = "report.json";

#[derive(Debug, Deserialize, PartialEq, Eq, Clone, Copy)]
#[serde(rename_all = "lowercase")]
pub enum Format {
    String,
    Json,
}

impl FromStr for Format {
    type Err = Error;
    fn from_str(format: &str) -> Result<Self, Self::Err> {
        match format {
            "string" => Ok(Format::String),
            "json" => Ok(Format::Json),
            _ => Err(anyhow!("Could not parse format {}", format)),
        }
    }
}

impl Default for Format {
    fn default() -> Self {
        Format::String
    }
}

// this exists because structopt requires `&str` type values for defaults
lazy_static! {
    static ref TIMEOUT_STR: String = DEFAULT_FETCH_TIMEOUT.as_secs().to_string();
    static ref REQUEST_DELAY_STR: String = DEFAULT_REQUEST_DELAY.as_millis().to_string();
    static ref MAX_CONCURRENCY_STR: String = DEFAULT_MAX_CONCURRENCY.to_string();
    static ref MAX_REDIRECTS_STR: String = DEFAULT_MAX_REDIRECTS.to_string();
}

// Macro for generating default functions to be used by serde
macro_rules! default_function {
    ( $( $name:ident : $T:ty = $e:expr; )* ) => {
        $(
            fn $name() -> $T {
                $e
            }
        )*
    };
}

// Generate the functions for serde defaults
default_function! {
    timeout: u64 = DEFAULT_FETCH_TIMEOUT.as_secs();
    request_delay: u64 = DEFAULT_REQUEST_DELAY.as_millis() as u64;
    max_concurrency: usize = DEFAULT_MAX_CONCURRENCY;
    max_redirects: usize = DEFAULT_MAX_REDIRECTS;
    user_agent: String = DEFAULT_USER_AGENT.to_string();
    output: PathBuf = PathBuf::from(OUTPUT);
}

// Macro for merging configuration values
macro_rules! fold_in {
    ( $cli:ident , $toml:ident ; $( $key:ident : $default:expr; )* ) => {
        $(
            if $cli.$key == $default && $toml.$key != $default {
                $cli.$key = $toml.$key;
            }
        )*
    };
}

#[derive(Debug, StructOpt)]
#[structopt(
    name = "fleet-health",
    about = "Collects the health status of a fleet of hosts and reports success rates per application version"
)]
pub(crate) struct FleetOptions {
    /// File with one host per line, or `-` to read from stdin
    #[structopt(name = "hosts", default_value = "servers.txt")]
    raw_input: String,

    /// Configuration file to use
    #[structopt(short, long = "config", default_value = "./fleet-health.toml")]
    pub config_file: String,

    #[structopt(flatten)]
    pub config: Config,
}

impl FleetOptions {
    pub(crate) fn input(&self) -> Input {
        Input::new(&self.raw_input)
    }
}

#[derive(Debug, Deserialize, StructOpt)]
pub struct Config {
    /// Verbose program output
    #[structopt(short, long)]
    #[serde(default)]
    pub verbose: bool,

    /// Do not show progress bar.
    /// This is recommended for non-interactive shells (e.g. for continuous
    /// integration)
    #[structopt(short, long)]
    #[serde(default)]
    pub no_progress: bool,

    /// Timeout of a single status request in seconds
    #[structopt(short, long, env = "HTTP_TIMEOUT", default_value = &TIMEOUT_STR)]
    #[serde(default = "timeout")]
    pub timeout: u64,

    /// Pause in milliseconds every request takes before it is sent
    #[structopt(short = "d", long, env = "REQUEST_DELAY", default_value = &REQUEST_DELAY_STR)]
    #[serde(default = "request_delay")]
    pub request_delay: u64,

    /// Maximum number of concurrent status requests
    #[structopt(long, env = "MAX_CONCURRENCY", default_value = &MAX_CONCURRENCY_STR)]
    #[serde(default = "max_concurrency")]
    pub max_concurrency: usize,

    /// Number of threads to utilize.
    /// Defaults to number of cores available to the system
    #[structopt(short = "T", long)]
    #[serde(default)]
    pub threads: Option<usize>,

    /// Maximum number of allowed redirects
    #[structopt(short, long, default_value = &MAX_REDIRECTS_STR)]
    #[serde(default = "max_redirects")]
    pub max_redirects: usize,

    /// User agent
    #[structopt(short, long, default_value = DEFAULT_USER_AGENT)]
    #[serde(default = "user_agent")]
    pub user_agent: String,

    /// File the JSON report is written to
    #[structopt(short, long, parse(from_os_str), default_value = OUTPUT)]
    #[serde(default = "output")]
    pub output: PathBuf,

    /// Format of the report printed to stdout (string, json)
    #[structopt(short, long, default_value = "string")]
    #[serde(default)]
    pub format: Format,
}

impl Config {
    /// Load configuration from a file
    pub(crate) fn load_from_file(path: &str) -> Result<Option<Config>> {
        // Read configuration file
        let result = fs::read_to_string(path);

        // Ignore a file not found error
        let contents = match result {
            Ok(c) => c,
            Err(e) => {
                return match e.kind() {
                    ErrorKind::NotFound => Ok(None),
                    _ => Err(Error::from(e)),
                }
            }
        };

        Ok(Some(toml::from_str(&contents)?))
    }

    /// Merge the configuration from TOML into the CLI configuration
    pub(crate) fn merge(&mut self, toml: Config) {
        fold_in! {
            // Destination and source configs
            self, toml;

            // Keys with defaults to assign
            verbose: false;
            no_progress: false;
            timeout: timeout();
            request_delay: request_delay();
            max_concurrency: max_concurrency();
            threads: None;
            max_redirects: max_redirects();
            user_agent: user_agent();
            output: output();
            format: Format::String;
        }
    }

    /// Settings for the dispatcher
    pub(crate) fn dispatch_config(&self) -> DispatchConfig {
        DispatchConfig {
            fetch_timeout: Duration::from_secs(self.timeout),
            request_delay: Duration::from_millis(self.request_delay),
            max_concurrency: self.max_concurrency,
        }
    }
}
