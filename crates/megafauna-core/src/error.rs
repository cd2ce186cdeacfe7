use thiserror::Error;

/// Fatal configuration errors surfaced to the host at startup.
///
/// Programming errors (feeding beyond demand, simulating a dead herbivore,
/// non-successive dates) are not represented here; they panic with a clear
/// message because they must never occur on a correctly composed driver.
#[derive(Debug, Error)]
pub enum MegafaunaError {
    #[error("failed to read instruction file \"{path}\": {source}")]
    InstructionFileIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("instruction file is not valid TOML: {0}")]
    InstructionFileSyntax(String),

    #[error("missing mandatory parameter \"{key}\"")]
    MissingParameter { key: String },

    #[error("missing mandatory parameter \"{key}\" in HFT \"{hft}\"")]
    MissingHftParameter { hft: String, key: String },

    #[error("invalid value \"{value}\" for \"{key}\"; valid options are: {}", valid_options.join(", "))]
    InvalidOption {
        key: String,
        value: String,
        valid_options: Vec<String>,
    },

    #[error("parameter \"{key}\" has wrong type: expected {expected}")]
    WrongType { key: String, expected: &'static str },

    #[error("parameter \"{key}\" is out of range: {reason}")]
    OutOfRange { key: String, reason: String },

    #[error("HFT \"{hft}\": {reason}")]
    InvalidHft { hft: String, reason: String },

    #[error("HFT group \"{0}\" is referenced but not defined")]
    UnknownGroup(String),

    #[error("duplicate HFT name \"{0}\"")]
    DuplicateHft(String),

    #[error("the instruction file defines no HFT")]
    NoHftDefined,

    #[error("failed to write output: {0}")]
    OutputIo(#[from] std::io::Error),
}
