use std::fmt;
use std::error::Error as StdError;

use tokio::io;
use rusoto_core::request::TlsError;
use rusoto_core::RusotoError;

#[derive(Debug)]
pub struct StringError(String);
impl fmt::Display for StringError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl StdError for StringError {}
impl From<String> for StringError {
    fn from(s: String) -> StringError {
        StringError(s)
    }
}

#[derive(Debug)]
pub struct StaticStrError(&'static str);
impl fmt::Display for StaticStrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
impl StdError for StaticStrError {}
impl From<&'static str> for StaticStrError {
    fn from(s: &'static str) -> StaticStrError {
        StaticStrError(s)
    }
}

#[derive(Debug)]
pub enum Error {
    Io(io::Error),
    Rusoto(RusotoError<StringError>),
    Tls(TlsError),
    Dotenv(dotenvy::Error),
    Regex(regex::Error),
    Json(serde_json::Error),
    String(StringError),
    StaticStr(StaticStrError),
}
impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.source() {
            Some(e) => write!(f, "{}", e),
            None => write!(f, "{:?}", self),
        }
    }
}
impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match self {
            &Self::Io(ref e) => Some(e),
            &Self::Rusoto(ref e) => Some(e),
            &Self::Tls(ref e) => Some(e),
            &Self::Dotenv(ref e) => Some(e),
            &Self::Regex(ref e) => Some(e),
            &Self::Json(ref e) => Some(e),
            &Self::String(ref e) => Some(e),
            &Self::StaticStr(ref e) => Some(e),
        }
    }
}
impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}
impl<E> From<RusotoError<E>> for Error
where
    E: fmt::Display,
{
    fn from(e: RusotoError<E>) -> Self {
        Self::Rusoto(match e {
            RusotoError::Service(e) => RusotoError::Service(format!("{}", e).into()),
            RusotoError::HttpDispatch(e) => RusotoError::HttpDispatch(e),
            RusotoError::Credentials(e) => RusotoError::Credentials(e),
            RusotoError::Validation(e) => RusotoError::Validation(e),
            RusotoError::ParseError(e) => RusotoError::ParseError(e),
            RusotoError::Unknown(e) => RusotoError::Unknown(e),
        })
    }
}
impl From<TlsError> for Error {
    fn from(e: TlsError) -> Self {
        Self::Tls(e)
    }
}
impl From<dotenvy::Error> for Error {
    fn from(e: dotenvy::Error) -> Self {
        Self::Dotenv(e)
    }
}
impl From<regex::Error> for Error {
    fn from(e: regex::Error) -> Self {
        Self::Regex(e)
    }
}
impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Self::Json(e)
    }
}
impl From<StringError> for Error {
    fn from(e: StringError) -> Self {
        Self::String(e)
    }
}
impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::String(StringError(s))
    }
}
impl From<StaticStrError> for Error {
    fn from(e: StaticStrError) -> Self {
        Self::StaticStr(e)
    }
}
impl From<&'static str> for Error {
    fn from(e: &'static str) -> Self {
        Self::StaticStr(StaticStrError(e))
    }
}
