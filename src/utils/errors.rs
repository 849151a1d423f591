#![forbid(unsafe_code)]

use thiserror::Error;

/// Error enumerates the errors returned by this application.
#[derive(Error, Debug)]
pub enum Errors {
    /// Input parameter logging.
    #[error("numclass_server input parameters:\n{}", .0)]
    InputParms(String),

    /// Represents all other cases of `std::io::Error`.
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Inaccessible logger configuration file.
    #[error("Unable to access the Log4rs configuration file: {}", .0)]
    Log4rsInitialization(String),

    #[error("Reading application configuration file: {}", .0)]
    ReadingConfigFile(String),

    #[error("Unable to parse TOML file: {}", .0)]
    TOMLParseError(String),

    #[error("Invalid data directory {}: {}", .0, .1)]
    DataDirectory(String, String),
}

/// The candidate number was missing or could not be read as a number.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No number was provided")]
    Missing,

    #[error("Unable to parse number: {}", .0)]
    NotANumber(String),

    #[error("Number is out of range: {}", .0)]
    OutOfRange(String),
}

/// Failures talking to the trivia provider.  These never leave the trivia
/// module as errors; callers only ever see a fallback string.
#[derive(Error, Debug)]
pub enum TriviaError {
    #[error("Trivia request failed: {}", .0)]
    Transport(#[from] reqwest::Error),

    #[error("Trivia provider returned HTTP status {}", .0)]
    Status(u16),

    #[error("Unable to decode trivia response: {}", .0)]
    Decode(String),
}
