//! Error types for every stage of a pipeline: declaring, loading, fitting,
//! transforming, evaluating and persisting.
//!
//! Each stage has its own enum so callers can match on what actually went
//! wrong. [`Error`] wraps all of them for code that chains stages with `?`.

use thiserror::Error;

use crate::schema::ColumnType;

/// Malformed or conflicting column declarations, or invalid handle use while
/// appending steps. Raised before any data is touched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// Two declarations (or two outputs of one step) share a name.
    #[error("column '{0}' is declared more than once")]
    DuplicateColumn(String),

    /// The declared data kind cannot be loaded into a numeric pipeline.
    #[error("column '{column}' has unsupported kind '{kind}'")]
    UnsupportedKind { column: String, kind: String },

    /// A source range is empty (`min > max`).
    #[error("column '{column}' has an inverted source range {min}..={max}")]
    InvalidRange {
        column: String,
        min: usize,
        max: usize,
    },

    /// A declaration spans more source positions than a column may hold.
    #[error("column '{column}' spans more than {limit} source positions")]
    RangeTooWide { column: String, limit: usize },

    /// A declaration lists no source positions at all.
    #[error("column '{0}' declares no source positions")]
    NoSource(String),

    /// The same source position is read as two different kinds.
    #[error(
        "source position {position} is read as '{first_kind}' by '{first}' and as '{second_kind}' by '{second}'"
    )]
    OverlappingSources {
        position: usize,
        first: String,
        first_kind: String,
        second: String,
        second_kind: String,
    },

    /// Lookup of a column name that is not visible.
    #[error("column '{0}' is not declared")]
    UnknownColumn(String),

    /// A handle that was never produced by this pipeline (or is no longer visible).
    #[error("column handle '{0}' is not visible at this point of the pipeline")]
    ForeignHandle(String),

    /// A handle has the wrong kind or shape for the step consuming it.
    #[error("column '{column}' must be {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: String,
        found: ColumnType,
    },

    /// A step was built without any input column.
    #[error("step '{0}' needs at least one input column")]
    NoInputs(&'static str),

    /// An append produced no columns at all.
    #[error("a pipeline step must produce at least one column")]
    EmptyOutputs,
}

/// Failure while fitting a pipeline. No model is produced.
#[derive(Debug, Error)]
pub enum FitError {
    /// Pipeline has no steps to fit.
    #[error("cannot fit an empty pipeline")]
    EmptyPipeline,

    /// Training data has no rows.
    #[error("cannot fit on empty data")]
    EmptyData,

    /// A value that must be finite is NaN or infinite.
    #[error("column '{column}' has a non-finite value at row {row}")]
    NonFinite { column: String, row: usize },

    /// Invalid hyperparameter value.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Labels and features disagree on the number of rows.
    #[error("label has {labels} rows but features have {features}")]
    RowMismatch { labels: usize, features: usize },

    /// The fitted predictor could not be recovered as the named type.
    #[error("expected predictor type '{0}'")]
    PredictorType(String),

    /// A step failed; `source` holds the cause.
    #[error("step '{step}' producing '{output}' failed: {source}")]
    Step {
        step: &'static str,
        output: String,
        #[source]
        source: Box<FitError>,
    },

    /// Data handed to a step did not match what it expects.
    #[error(transparent)]
    Transform(#[from] TransformError),
}

/// Applying a model (or a fitted step) to data whose schema disagrees with it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TransformError {
    /// A required column is absent from the data.
    #[error("column '{0}' is missing from the data")]
    MissingColumn(String),

    /// A column exists but with another kind or shape.
    #[error("column '{column}' expected {expected}, found {found}")]
    TypeMismatch {
        column: String,
        expected: ColumnType,
        found: ColumnType,
    },

    /// Vector width differs from what the fitted step was trained on.
    #[error("column '{column}' expected {expected} slots, found {found}")]
    WidthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    /// Feature rows handed to a predictor have the wrong number of slots.
    #[error("predictor expects {expected} features per row, found {found}")]
    FeatureCount { expected: usize, found: usize },

    /// A new column does not have the same row count as the data.
    #[error("column '{column}' has {found} rows, data has {expected}")]
    RowCountMismatch {
        column: String,
        expected: usize,
        found: usize,
    },
}

/// Failure while reading delimited text.
#[derive(Debug, Error)]
pub enum LoadError {
    /// I/O error while opening or reading a file.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record framing error from the CSV reader.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A field could not be parsed as the declared kind.
    #[error("line {line}, position {position}: cannot parse '{value}' as {kind}")]
    Parse {
        line: u64,
        position: usize,
        value: String,
        kind: String,
    },

    /// A record is shorter than the highest declared source position.
    #[error("line {line}: no field at position {position}")]
    MissingField { line: u64, position: usize },

    /// Separators must be single-byte characters.
    #[error("separator {0:?} is not an ASCII character")]
    InvalidSeparator(char),

    /// Declarations were rejected.
    #[error(transparent)]
    Schema(#[from] SchemaError),

    /// Column buffer could not be shaped into a matrix.
    #[error("shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    /// A loaded column disagrees with the view it is added to.
    #[error(transparent)]
    Column(#[from] TransformError),
}

/// Failure while evaluating or cross-validating.
#[derive(Debug, Error)]
pub enum EvaluationError {
    /// Test fraction outside `(0, 1)`.
    #[error("test fraction must be in (0, 1), got {0}")]
    InvalidFraction(f64),

    /// Too few rows to split or fold.
    #[error("need at least {needed} rows, got {rows}")]
    NotEnoughRows { needed: usize, rows: usize },

    /// Fold count below two.
    #[error("cross-validation needs at least 2 folds, got {0}")]
    InvalidFolds(usize),

    /// Every row was skipped (NaN label) or the data is empty.
    #[error("no rows with a valid label to evaluate")]
    NoValidRows,

    /// Label or score column missing or mistyped.
    #[error(transparent)]
    Transform(#[from] TransformError),

    /// Fitting a fold failed.
    #[error(transparent)]
    Fit(#[from] FitError),
}

/// Failure while saving or loading fitted parameters.
#[derive(Debug, Error)]
pub enum PersistError {
    /// I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Encoding or decoding error.
    #[error("serialization error: {0}")]
    Serialization(#[from] bincode::Error),
}

/// Any error raised by this crate.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Load(#[from] LoadError),
    #[error(transparent)]
    Fit(#[from] FitError),
    #[error(transparent)]
    Transform(#[from] TransformError),
    #[error(transparent)]
    Evaluation(#[from] EvaluationError),
    #[error(transparent)]
    Persist(#[from] PersistError),
}

/// Convenience alias over the crate-level [`Error`].
pub type Result<T, E = Error> = std::result::Result<T, E>;
