use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("Conflicting arguments: {first} and {second}")]
    ConflictingArguments {
        first: &'static str,
        second: &'static str,
    },

    #[error("Cannot infer the satellite from scene id {scene}; pass --satellite")]
    UnknownSatellite { scene: String },

    #[error(transparent)]
    Satcomp(#[from] satcomp::Error),
}
