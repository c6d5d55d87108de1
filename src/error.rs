use std::io;

#[derive(thiserror::Error, Debug)]
pub enum TableError {
    #[error("{0}")]
    IoError(#[from] io::Error),

    /// Malformed arguments or a violated precondition not covered by a
    /// more specific variant.
    #[error("invalid argument")]
    Generic,

    #[error("table id already in use")]
    IdAlreadyExists,

    #[error("table id not defined")]
    IdNotFound,

    #[error("maximum number of tables reached")]
    MaxTablesReached,

    #[error("field count outside the allowed range")]
    MaxFieldsInvalid,

    #[error("key already present")]
    DuplicateKey,

    #[error("table is not empty")]
    NotEmpty,

    #[error("element not found")]
    NotFound,

    #[error("string length bound outside the allowed range")]
    FieldTooLong,

    #[error("table is full")]
    OutOfMemory,
}

impl PartialEq for TableError {
    fn eq(&self, other: &Self) -> bool {
        use TableError::*;
        matches!(
            (self, other),
            (IoError(_), IoError(_))
                | (Generic, Generic)
                | (IdAlreadyExists, IdAlreadyExists)
                | (IdNotFound, IdNotFound)
                | (MaxTablesReached, MaxTablesReached)
                | (MaxFieldsInvalid, MaxFieldsInvalid)
                | (DuplicateKey, DuplicateKey)
                | (NotEmpty, NotEmpty)
                | (NotFound, NotFound)
                | (FieldTooLong, FieldTooLong)
                | (OutOfMemory, OutOfMemory)
        )
    }
}
