use thiserror::Error;

/// Application-specific errors for the CLI
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Invalid filter criterion: {criterion}. Expected KEY=VALUE[,VALUE...]")]
    InvalidCriterion { criterion: String },

    #[error("Missing required argument: {arg}")]
    MissingArgument { arg: String },

    #[error("No `{parameter}` value for cell {cell_id} on {date}")]
    NotFound {
        parameter: String,
        cell_id: String,
        date: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Library(#[from] etlocal::Error),
}
