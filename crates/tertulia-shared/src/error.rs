use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModelError {
    #[error("Empty {0} id")]
    EmptyId(&'static str),

    #[error("Display name must not be blank")]
    EmptyDisplayName,
}
