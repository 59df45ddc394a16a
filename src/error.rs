use thiserror::Error;

pub const EXPECTED_COLUMNS: &str = "Year, Eligible, Placed, Higher Studies";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("document store error: {0}")]
    Backend(String),

    #[error("malformed document {collection}/{id}: {message}")]
    Decode {
        collection: String,
        id: String,
        message: String,
    },
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

#[derive(Error, Debug)]
pub enum ImportError {
    #[error("could not read {path}: {message}. Expected columns: {EXPECTED_COLUMNS}")]
    Unreadable { path: String, message: String },

    #[error("unsupported file type '{0}'. Upload a .csv, .xlsx, .xls or .ods file with columns: {EXPECTED_COLUMNS}")]
    UnsupportedExtension(String),

    #[error("missing column(s) {missing}. Expected columns: {EXPECTED_COLUMNS}")]
    MissingColumns { missing: String },

    #[error("the sheet is empty. Expected columns: {EXPECTED_COLUMNS}")]
    Empty,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("year is required")]
    MissingYear,

    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("package must be a non-negative number")]
    InvalidPackage,

    #[error("document URL must start with http:// or https://")]
    InvalidDocumentUrl,
}

#[derive(Error, Debug)]
pub enum PortalError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}
