#[allow(clippy::single_component_path_imports)]
use serde_yaml;

#[derive(Debug, thiserror::Error)]
pub enum TrendError {
    #[error("malformed trend selector '{0}': expected subrecord__slug or subrecord__slug__field")]
    MalformedSelector(String),
    #[error("unknown trend kind: {0}")]
    UnknownTrendKind(String),
    #[error("trend kind already registered: {0}")]
    DuplicateTrendKind(String),
    #[error("trend '{slug}' requires a field name")]
    MissingFieldName { slug: String },
    #[error("field '{field}' on '{subrecord}' is not supported by this trend")]
    UnsupportedFieldType { subrecord: String, field: String },
    #[error("unknown subrecord: {0}")]
    UnknownSubrecord(String),
    #[error("unknown field '{field}' on subrecord '{subrecord}'")]
    UnknownField { subrecord: String, field: String },
    #[error("invalid drill-down value: {0}")]
    InvalidValue(String),
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(#[from] trendy_types::IdentifierError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("failed to read file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize trend data: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize record store: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
}

pub type TrendResult<T> = std::result::Result<T, TrendError>;
