use std::io;

/// Errors raised while reading, parsing or transforming input documents.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid XML: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid XML attribute: {0}")]
    XmlAttribute(#[from] quick_xml::events::attributes::AttrError),

    #[error("malformed XML: {0}")]
    XmlStructure(String),

    #[error("invalid path expression `{expr}`: {reason}")]
    XPath { expr: String, reason: String },

    #[error("invalid Gherkin: {0}")]
    Gherkin(String),

    #[error("invalid regex: {0}")]
    Regex(#[from] regex::Error),

    #[error("template error: {0}")]
    Template(#[from] minijinja::Error),

    #[error("input is not valid UTF-8")]
    NonUtf8,

    #[error("unsupported document encoding: {0}")]
    UnknownEncoding(String),

    #[error("input is not valid {0}")]
    Malformed(&'static str),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

pub type Result<T> = std::result::Result<T, Error>;
