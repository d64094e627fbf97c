use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;
pub type TemplateResult<T> = std::result::Result<T, TemplateError>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("template rejected : {0}")]
    Template(#[from] TemplateError),
    #[error("invalid value for option {key} : {value}")]
    InvalidOption { key: String, value: String },
    #[error("options are not form-encoded : {0}")]
    OptionsEncoding(#[from] serde_urlencoded::de::Error),
    #[error("template has no Host header")]
    MissingHost,
    #[error("invalid request url {url} : {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },
    #[error("header {0} could not be converted into an HTTP header")]
    InvalidHeader(String),
    #[error("request failed : {0}")]
    Transport(#[source] reqwest::Error),
    #[error("request failed with status {status} : {body}")]
    RequestFailed { status: u16, body: String },
    #[error("failed to read response body : {0}")]
    ResponseRead(#[source] reqwest::Error),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TemplateError {
    #[error("error parsing http template : {0}")]
    Parse(String),
    #[error("error merging variables in http template, no value for {0}")]
    Merge(String),
    #[error("invalid request method {0} in template, must be one of GET, PUT, POST or DELETE")]
    InvalidMethod(String),
    #[error("malformed request line : {0:?}")]
    MalformedRequestLine(String),
}
