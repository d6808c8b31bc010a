//! Provides the CLI option parser
//!
//! Used to parse the argv/config file into a struct that
//! the aggregator can consume and use as configuration data.

use clap::{App, Arg};
use metric::TagMap;
use std::env;
use std::error;
use std::fmt;
use std::fs::File;
use std::io::{self, Read};
use std::path::PathBuf;
use toml;

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

fn default_version() -> String {
    VERSION.unwrap_or("unknown").to_string()
}

/// Configuration for the metricline executable
///
/// This struct is what we construct from parsing the command line and the
/// optional configuration file. Please see documentation on `parse_args` in
/// this module for more details.
#[derive(Debug, PartialEq)]
pub struct Args {
    /// The verbosity setting of metricline. The higher the value the more
    /// chatty metricline gets.
    pub verbose: u64,
    /// metricline version string. This is set automatically.
    pub version: String,
    /// The width, in seconds, of each aggregation window.
    pub bin_width: i64,
    /// Stored weight above which every window is flushed, closed or not.
    pub max_weight: usize,
    /// The file to read observation lines from. Standard input when `None`.
    pub input: Option<PathBuf>,
    /// Tags added to every observation that does not already carry them.
    pub tags: TagMap,
}

impl Default for Args {
    fn default() -> Self {
        Args {
            verbose: 0,
            version: default_version(),
            bin_width: 10,
            max_weight: 100_000,
            input: None,
            tags: TagMap::default(),
        }
    }
}

/// Errors raised while reading configuration.
#[derive(Debug)]
pub enum Error {
    /// The configuration file could not be read.
    Io(io::Error),
    /// The configuration file is not valid TOML.
    Toml(toml::de::Error),
    /// A key holds a value of the wrong type or out of range.
    Invalid(String),
    /// A tag refers to an environment variable that is not set.
    MissingEnvironment(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref e) => write!(f, "could not read config file: {}", e),
            Error::Toml(ref e) => write!(f, "could not parse config file: {}", e),
            Error::Invalid(ref msg) => write!(f, "invalid configuration: {}", msg),
            Error::MissingEnvironment(ref var) => {
                write!(f, "environment variable {} is not set", var)
            }
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match *self {
            Error::Io(ref e) => Some(e),
            Error::Toml(ref e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Error {
        Error::Io(e)
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Error {
        Error::Toml(e)
    }
}

/// A global tag, either given inline or read from the environment.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum TagValue {
    Literal(String),
    Environment { environment: bool, value: String },
}

/// Parse the metricline configuration arguments
///
/// This function will read the environment arguments and construct an
/// `Args`. Settings not given on the command line come from the config file
/// named by `--config`, if any, else from `Args::default`. See
/// `metricline --help` for more information.
pub fn parse_args() -> Result<Args, Error> {
    let args = App::new("metricline")
        .version(VERSION.unwrap_or("unknown"))
        .about("aggregate statsd-style observations into canonical metric lines")
        .arg(
            Arg::with_name("config-file")
                .long("config")
                .short("C")
                .value_name("config")
                .help("The config file to feed in.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("input")
                .long("input")
                .short("i")
                .value_name("input")
                .help("Read observations from this file instead of stdin.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .multiple(true)
                .help("Turn on verbose output."),
        )
        .get_matches();

    let verb = if args.is_present("verbose") {
        args.occurrences_of("verbose")
    } else {
        0
    };

    let mut parsed = match args.value_of("config-file") {
        Some(filename) => {
            let mut fp = File::open(filename)?;
            let mut buffer = String::new();
            fp.read_to_string(&mut buffer)?;
            parse_config_file(&buffer, verb)?
        }
        None => Args {
            verbose: verb,
            ..Args::default()
        },
    };
    if let Some(input) = args.value_of("input") {
        parsed.input = Some(PathBuf::from(input));
    }
    Ok(parsed)
}

/// Parse the metricline configuration file.
///
/// The file is TOML. All keys are optional:
///
/// ```toml
/// bin-width = 10
/// max-weight = 100000
/// input = "/var/log/observations"
///
/// [tags]
/// source = "metricline"
/// host = { environment = true, value = "HOSTNAME" }
/// ```
pub fn parse_config_file(buffer: &str, verbosity: u64) -> Result<Args, Error> {
    let mut args = Args::default();
    let value: toml::Value = toml::from_str(buffer)?;

    args.verbose = verbosity;

    if let Some(bw) = value.get("bin-width") {
        args.bin_width = match bw.as_integer() {
            Some(bw) if bw > 0 => bw,
            _ => return Err(Error::Invalid("bin-width must be a positive integer".into())),
        };
    }

    if let Some(mw) = value.get("max-weight") {
        args.max_weight = match mw.as_integer() {
            Some(mw) if mw > 0 => mw as usize,
            _ => return Err(Error::Invalid("max-weight must be a positive integer".into())),
        };
    }

    if let Some(input) = value.get("input") {
        args.input = match input.as_str() {
            Some(s) => Some(PathBuf::from(s)),
            None => return Err(Error::Invalid("input must be a string".into())),
        };
    }

    if let Some(tbl) = value.get("tags") {
        let ttbl = match tbl.as_table() {
            Some(ttbl) => ttbl,
            None => return Err(Error::Invalid("tags must be a table".into())),
        };
        for (k, v) in ttbl.iter() {
            let val = match v.clone().try_into::<TagValue>() {
                Ok(TagValue::Literal(s)) => s,
                Ok(TagValue::Environment {
                    environment: true,
                    value: env_key,
                }) => match env::var(&env_key) {
                    Ok(s) => s,
                    Err(_) => return Err(Error::MissingEnvironment(env_key)),
                },
                _ => {
                    return Err(Error::Invalid(format!(
                        "tag {} must be a string or an environment / value table",
                        k
                    )))
                }
            };
            args.tags.insert(k.clone(), val);
        }
    }

    Ok(args)
}
