use derive_more::{Display, Error};

pub type Error = exn::Exn<ErrorKind>;
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Display, Error)]
pub enum ErrorKind {
    #[display("cannot load configuration")]
    Config,
    #[display("cannot set up storage")]
    Storage,
    #[display("cannot open {_0}")]
    Input(#[error(not(source))] String),
    #[display("cannot retry item {_0}")]
    Retry(#[error(not(source))] usize),
    /// Some files did not make it; the batch was reported but is incomplete.
    #[display("{_0} file(s) not uploaded")]
    Incomplete(#[error(not(source))] usize),
}
