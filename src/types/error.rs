use thiserror::Error;

#[derive(Error, Debug)]
pub enum DatabaseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization/deserialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Table '{name}' not found")]
    TableNotFound { name: String },

    #[error("Table '{name}' already exists")]
    TableAlreadyExists { name: String },

    #[error("Column '{name}' not found in table '{table}'")]
    ColumnNotFound { name: String, table: String },

    #[error("Duplicate primary key value: {value}")]
    DuplicatePrimaryKey { value: String },

    #[error("Primary key value '{value}' does not exist")]
    PrimaryKeyNotFound { value: String },

    #[error("Value '{value}' cannot be converted to {target}")]
    TypeConversion { value: String, target: String },

    #[error("Unsupported operator: {operator}")]
    UnsupportedOperator { operator: String },

    #[error("Delete requires the primary key column; '{column}' is not the primary key of table '{table}'")]
    InvalidDeleteTarget { column: String, table: String },

    #[error("Malformed condition expression: {details}")]
    MalformedCondition { details: String },

    #[error("Invalid data: {details}")]
    InvalidData { details: String },
}

pub type Result<T> = std::result::Result<T, DatabaseError>;
