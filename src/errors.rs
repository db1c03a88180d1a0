use std::error::Error;

#[derive(Debug)]
pub enum ScriptError {
    /// A general logic or configuration error
    General(String),
    /// The script has no steps at all
    Empty,
    /// No step is marked as the confirmation step
    MissingConfirmation,
    /// A confirmation step appears somewhere other than the end
    MisplacedConfirmation(usize),
    /// A step that collects an answer has no key to store it under
    MissingKey(usize),
    /// A step declares an option set with nothing in it
    EmptyOptions(usize),
    /// The script table could not be read
    Csv(csv::Error),
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::General(message) => write!(f, "Invalid conversation script: {}", message),
            Self::Empty => write!(f, "Invalid conversation script: no steps"),
            Self::MissingConfirmation => {
                write!(f, "Invalid conversation script: no confirmation step")
            }
            Self::MisplacedConfirmation(index) => write!(
                f,
                "Invalid conversation script: confirmation step {} is not the last step",
                index
            ),
            Self::MissingKey(index) => {
                write!(f, "Invalid conversation script: step {} has no key", index)
            }
            Self::EmptyOptions(index) => write!(
                f,
                "Invalid conversation script: step {} has an empty option set",
                index
            ),
            Self::Csv(err) => write!(f, "Could not read conversation script: {}", err),
        }
    }
}

impl Error for ScriptError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Csv(err) => Some(err),
            _ => None,
        }
    }
}

impl From<csv::Error> for ScriptError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<&str> for ScriptError {
    fn from(message: &str) -> Self {
        Self::General(message.to_owned())
    }
}
