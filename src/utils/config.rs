#![forbid(unsafe_code)]

use anyhow::{Result, anyhow};
use log::{info, error, LevelFilter};
use serde::Deserialize;
use std::{env, fs, path::Path};
use fs_mistrust::Mistrust;
use std::os::unix::fs::PermissionsExt;
use structopt::StructOpt;

use log4rs::append::console::ConsoleAppender;
use log4rs::config::{Appender, Config as LogConfig, Root};
use log4rs::encode::pattern::PatternEncoder;

use crate::utils::errors::Errors;
use crate::utils::server_utils::get_absolute_path;
use crate::utils::trivia::DEFAULT_TRIVIA_URL;

// ***************************************************************************
//                                Constants
// ***************************************************************************
// Directory and file locations. Unless otherwise noted, all files and directories
// are relative to the root directory.
const ENV_ROOT_DIR         : &str = "NUMCLASS_ROOT_DIR";
const DEFAULT_ROOT_DIR     : &str = "~/.numclass";
const CONFIG_DIR           : &str = "/config";
const LOGS_DIR             : &str = "/logs";
const LOG4RS_CONFIG_FILE   : &str = "/log4rs.yml";    // relative to config dir
const SERVER_CONFIG_FILE   : &str = "/numclass.toml"; // relative to config dir

// Used when no log4rs configuration file exists.
const DEFAULT_LOG_PATTERN  : &str = "{d(%Y-%m-%dT%H:%M:%S%.3f%Z)} {h({l})} {M} - {m}{n}";

// Networking.
const DEFAULT_HTTP_ADDR    : &str = "http://localhost";
const DEFAULT_HTTP_PORT    : u16  = 3000;

// ***************************************************************************
//                             Directory Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// DataDirs:
// ---------------------------------------------------------------------------
#[derive(Debug, Clone)]
pub struct DataDirs {
    pub root_dir: String,
    pub config_dir: String,
    pub logs_dir: String,
}

// ***************************************************************************
//                               Config Structs
// ***************************************************************************
// ---------------------------------------------------------------------------
// ServerArgs:
// ---------------------------------------------------------------------------
#[derive(Debug, Default, StructOpt)]
#[structopt(name = "numclass_args", about = "Command line arguments for the number classification server.")]
pub struct ServerArgs {
    /// Specify the server's root data directory.
    ///
    /// The root directory is calculated using the following priority order:
    ///
    ///   1. If set, the value of the NUMCLASS_ROOT_DIR environment variable,
    ///
    ///   2. Otherwise, if set, the value of the --root-dir command line argument,
    ///
    ///   3. Otherwise, ~/.numclass
    ///
    #[structopt(short, long)]
    pub root_dir: Option<String>,

    /// Listen on this port, overriding the configuration file.
    #[structopt(short, long)]
    pub port: Option<u16>,
}

// ---------------------------------------------------------------------------
// Parms:
// ---------------------------------------------------------------------------
#[derive(Debug)]
pub struct Parms {
    pub config_file: String,
    pub config: Config,
}

// ---------------------------------------------------------------------------
// RuntimeCtx:
// ---------------------------------------------------------------------------
/** Everything read at startup.  It's created once in main and handed to the
 * components that need it.
 */
#[derive(Debug)]
#[allow(dead_code)]
pub struct RuntimeCtx {
    pub parms: Parms,
    pub args: ServerArgs,
    pub dirs: DataDirs,
}

// ---------------------------------------------------------------------------
// Config:
// ---------------------------------------------------------------------------
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    pub title: String,
    pub http_addr: String,
    pub http_port: u16,
    pub trivia_url: String,
}

impl Config {
    pub fn new() -> Self {
        Config::default()
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            title: "Number Classification Server".to_string(),
            http_addr: DEFAULT_HTTP_ADDR.to_string(),
            http_port: DEFAULT_HTTP_PORT,
            trivia_url: DEFAULT_TRIVIA_URL.to_string(),
        }
    }
}

// ***************************************************************************
//                            Directory Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_data_dirs:
// ---------------------------------------------------------------------------
/** Calculate the external data directories, creating any that don't exist. */
pub fn init_data_dirs(args: &ServerArgs) -> Result<DataDirs> {
    let mistrust = get_mistrust()?;

    let root_dir = get_root_dir(args);
    check_data_dir(&root_dir, "root directory", &mistrust)?;

    let config_dir = root_dir.clone() + CONFIG_DIR;
    check_data_dir(&config_dir, "config directory", &mistrust)?;

    let logs_dir = root_dir.clone() + LOGS_DIR;
    check_data_dir(&logs_dir, "logs directory", &mistrust)?;

    Ok(DataDirs { root_dir, config_dir, logs_dir })
}

// ---------------------------------------------------------------------------
// check_data_dir:
// ---------------------------------------------------------------------------
/** Check that the path is absolute and, if it exists, that is has the proper
 * permissions assigned.  If it doesn't exist, create it.  The mistrust package
 * creates directories with 0o700 permissions.
 */
fn check_data_dir(dir: &str, msgname: &str, mistrust: &Mistrust) -> Result<()> {
    let path = Path::new(dir);
    if !path.is_absolute() {
        return Err(anyhow!(Errors::DataDirectory(dir.to_string(),
                           format!("the {} path must be absolute", msgname))));
    }
    if path.exists() {
        if !path.is_dir() {
            return Err(anyhow!(Errors::DataDirectory(dir.to_string(),
                               format!("the {} path must be a directory", msgname))));
        }

        // Owner only access.
        let perm = path.metadata().map_err(Errors::IOError)?.permissions().mode();
        if perm & 0o777 != 0o700 {
            return Err(anyhow!(Errors::DataDirectory(dir.to_string(),
                               format!("the {} path must have 0o700 permissions", msgname))));
        }
    } else if let Err(e) = mistrust.make_directory(path) {
        return Err(anyhow!(Errors::DataDirectory(dir.to_string(), e.to_string())));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// get_mistrust:
// ---------------------------------------------------------------------------
fn get_mistrust() -> Result<Mistrust> {
    match Mistrust::builder()
        .ignore_prefix(get_absolute_path("~"))
        .trust_group(0)
        .build() {
            Ok(m) => Ok(m),
            Err(e) => Err(anyhow!("Mistrust configuration error: {}", e)),
        }
}

// ---------------------------------------------------------------------------
// get_root_dir:
// ---------------------------------------------------------------------------
fn get_root_dir(args: &ServerArgs) -> String {
    // Order of precedence:
    //  1. Environment variable
    //  2. Command line --root-dir argument
    //  3. Default location
    let root_dir = env::var(ENV_ROOT_DIR).unwrap_or_else(
        |_| {
            match args.root_dir.clone() {
                Some(r) => r,
                None => DEFAULT_ROOT_DIR.to_string(),
            }
        });

    get_absolute_path(&root_dir)
}

// ***************************************************************************
//                               Log Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_log:
// ---------------------------------------------------------------------------
/** Initialize log4rs from the configuration file in the config directory.
 * When there's no such file, log at info level to the console.
 */
pub fn init_log(dirs: &DataDirs) -> Result<()> {
    let logconfig = dirs.config_dir.clone() + LOG4RS_CONFIG_FILE;
    if Path::new(&logconfig).exists() {
        if let Err(e) = log4rs::init_file(&logconfig, Default::default()) {
            eprintln!("{}", e);
            return Err(anyhow!(Errors::Log4rsInitialization(logconfig)));
        }
        info!("Log4rs initialized using: {}", logconfig);
    } else {
        let stdout = ConsoleAppender::builder()
            .encoder(Box::new(PatternEncoder::new(DEFAULT_LOG_PATTERN)))
            .build();
        let config = LogConfig::builder()
            .appender(Appender::builder().build("stdout", Box::new(stdout)))
            .build(Root::builder().appender("stdout").build(LevelFilter::Info))?;
        log4rs::init_config(config)?;
        info!("Log4rs configuration file not found at {}, logging to console.", logconfig);
    }
    Ok(())
}

// ***************************************************************************
//                             Parms Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// get_parms:
// ---------------------------------------------------------------------------
/** Read the server configuration file from the config directory.  A missing
 * file means all defaults are used; a file that doesn't parse is an error.
 */
fn get_parms(dirs: &DataDirs) -> Result<Parms> {
    let config_file = get_absolute_path(&(dirs.config_dir.clone() + SERVER_CONFIG_FILE));
    info!("{}", Errors::ReadingConfigFile(config_file.clone()));
    let contents = match fs::read_to_string(&config_file) {
        Ok(c) => c,
        Err(_) => {
            info!("Unable to read configuration at {}. Using default values.", config_file);
            return Ok(Parms { config_file: Default::default(), config: Config::new() });
        }
    };

    let config = parse_config(&contents, &config_file)?;
    Ok(Parms { config_file, config })
}

// ---------------------------------------------------------------------------
// parse_config:
// ---------------------------------------------------------------------------
fn parse_config(contents: &str, config_file: &str) -> Result<Config> {
    match toml::from_str(contents) {
        Ok(c)  => Ok(c),
        Err(e) => {
            let msg = format!("{}\n   {}", Errors::TOMLParseError(config_file.to_string()), e);
            error!("{}", msg);
            Err(anyhow!(msg))
        }
    }
}

// ***************************************************************************
//                             Config Functions
// ***************************************************************************
// ---------------------------------------------------------------------------
// init_runtime_context:
// ---------------------------------------------------------------------------
/** Read the configuration and apply command line overrides.  Logging must
 * already be initialized.
 */
pub fn init_runtime_context(args: ServerArgs, dirs: DataDirs) -> Result<RuntimeCtx> {
    let mut parms = get_parms(&dirs)?;
    if let Some(port) = args.port {
        parms.config.http_port = port;
    }
    Ok(RuntimeCtx {parms, args, dirs})
}

// ***************************************************************************
//                                  Tests
// ***************************************************************************
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::new();
        assert_eq!(config.http_port, DEFAULT_HTTP_PORT);
        assert_eq!(config.trivia_url, DEFAULT_TRIVIA_URL);
    }

    #[test]
    fn partial_config_file() {
        let config = parse_config("http_port = 8080\ntrivia_url = \"http://localhost:9000\"\n",
                                  "numclass.toml").unwrap();
        assert_eq!(config.http_port, 8080);
        assert_eq!(config.trivia_url, "http://localhost:9000");
        assert_eq!(config.http_addr, DEFAULT_HTTP_ADDR);
    }

    #[test]
    fn bad_config_file() {
        assert!(parse_config("http_port = \"not a port\"", "numclass.toml").is_err());
    }

    #[test]
    fn data_dir_errors() {
        let mistrust = get_mistrust().unwrap();
        assert!(check_data_dir("relative/numclass", "root directory", &mistrust).is_err());
        assert!(check_data_dir(concat!(env!("CARGO_MANIFEST_DIR"), "/Cargo.toml"), "root directory", &mistrust).is_err());

        let err: Errors = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied").into();
        assert!(matches!(err, Errors::IOError(_)));
        assert_eq!(err.to_string(), "access denied");
    }

    #[test]
    fn sample_log_config_writes_to_logs_dir() {
        let sample = include_str!("../../resources/log4rs.yml");
        let paths: Vec<&str> = sample.lines()
            .map(str::trim)
            .filter(|l| l.starts_with("path:"))
            .collect();
        assert_eq!(paths, vec!["path: \"$ENV{HOME}/.numclass/logs/numclass.log\""]);
    }

    #[test]
    fn port_override() {
        let dirs = DataDirs {
            root_dir: "/nonexistent/numclass".to_string(),
            config_dir: "/nonexistent/numclass/config".to_string(),
            logs_dir: "/nonexistent/numclass/logs".to_string(),
        };
        let args = ServerArgs { root_dir: None, port: Some(4321) };
        let ctx = init_runtime_context(args, dirs).unwrap();
        assert_eq!(ctx.parms.config.http_port, 4321);
        assert_eq!(ctx.parms.config_file, "");
    }
}
