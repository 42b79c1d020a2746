//! Column declarations and the typed handles produced from them.
//!
//! A [`SchemaSpec`] lists `(name, kind, source positions)` declarations, the
//! same information a delimited-text reader needs. [`Schema::declare`]
//! validates it and hands out one [`ColumnHandle`] per column. Pipelines wire
//! steps together with these handles instead of raw strings: every handle
//! carries a process-unique id, so a handle that did not come from the
//! pipeline being extended is rejected when the step is appended.
//!
//! # Example
//!
//! ```
//! use mlchain::schema::{DataKind, Schema, SchemaSpec, Shape};
//!
//! let spec = SchemaSpec::new()
//!     .scalar("label", DataKind::Float, 0)
//!     .vector("features", DataKind::Float, 1, 6);
//!
//! let schema = Schema::declare(&spec).unwrap();
//! let features = schema.columns().get("features").unwrap();
//! assert_eq!(features.column_type().shape, Shape::Vector(6));
//! ```

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::SchemaError;

/// Kind of a source field as declared in a schema.
///
/// Numeric kinds are all loaded as `f32`. `Text` exists so that configurations
/// describing text fields fail with a clear error instead of a parse error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataKind {
    Float,
    Double,
    Int,
    Bool,
    Text,
}

impl DataKind {
    /// The in-memory value kind, or `None` when the kind cannot be loaded.
    pub fn value_kind(self) -> Option<ValueKind> {
        match self {
            DataKind::Float | DataKind::Double | DataKind::Int => Some(ValueKind::Float),
            DataKind::Bool => Some(ValueKind::Bool),
            DataKind::Text => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DataKind::Float => "float",
            DataKind::Double => "double",
            DataKind::Int => "int",
            DataKind::Bool => "bool",
            DataKind::Text => "text",
        }
    }
}

impl fmt::Display for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of the values stored in a loaded column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    /// Real numbers.
    Float,
    /// `0.0` / `1.0`.
    Bool,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueKind::Float => f.write_str("float"),
            ValueKind::Bool => f.write_str("bool"),
        }
    }
}

/// Scalar column or fixed-width vector column.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Scalar,
    Vector(usize),
}

impl Shape {
    /// Number of values per row.
    pub fn width(self) -> usize {
        match self {
            Shape::Scalar => 1,
            Shape::Vector(n) => n,
        }
    }
}

/// Declared type of a column: value kind plus shape.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnType {
    pub kind: ValueKind,
    pub shape: Shape,
}

impl ColumnType {
    pub const fn scalar(kind: ValueKind) -> Self {
        Self {
            kind,
            shape: Shape::Scalar,
        }
    }

    pub const fn vector(kind: ValueKind, width: usize) -> Self {
        Self {
            kind,
            shape: Shape::Vector(width),
        }
    }

    pub fn width(&self) -> usize {
        self.shape.width()
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self.shape, Shape::Scalar)
    }
}

impl fmt::Display for ColumnType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.shape {
            Shape::Scalar => write!(f, "{}", self.kind),
            Shape::Vector(n) => write!(f, "Vector<{}, {}>", self.kind, n),
        }
    }
}

/// Inclusive range of source field positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRange {
    pub min: usize,
    pub max: usize,
}

impl SourceRange {
    pub fn single(position: usize) -> Self {
        Self {
            min: position,
            max: position,
        }
    }

    pub fn new(min: usize, max: usize) -> Self {
        Self { min, max }
    }
}

/// One column declaration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColumnDecl {
    pub name: String,
    pub kind: DataKind,
    pub sources: Vec<SourceRange>,
}

/// Declarative description of the columns a reader produces.
///
/// A declaration with exactly one single-position source is a scalar column;
/// everything else is a vector whose width is the total number of positions.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SchemaSpec {
    pub columns: Vec<ColumnDecl>,
}

impl SchemaSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a scalar column read from one position.
    pub fn scalar(self, name: impl Into<String>, kind: DataKind, position: usize) -> Self {
        self.column(ColumnDecl {
            name: name.into(),
            kind,
            sources: vec![SourceRange::single(position)],
        })
    }

    /// Declare a vector column read from the inclusive range `min..=max`.
    pub fn vector(self, name: impl Into<String>, kind: DataKind, min: usize, max: usize) -> Self {
        self.column(ColumnDecl {
            name: name.into(),
            kind,
            sources: vec![SourceRange::new(min, max)],
        })
    }

    /// Add an arbitrary declaration.
    pub fn column(mut self, decl: ColumnDecl) -> Self {
        self.columns.push(decl);
        self
    }

    /// Parse a spec from its JSON form.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

static NEXT_COLUMN_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a column handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColumnId(u64);

impl ColumnId {
    fn fresh() -> Self {
        Self(NEXT_COLUMN_ID.fetch_add(1, Ordering::Relaxed))
    }
}

/// Typed reference to a column.
///
/// Cheap to clone. Handles are created only by [`Schema::declare`] and by
/// appending steps to a pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ColumnHandle {
    id: ColumnId,
    name: Arc<str>,
    ty: ColumnType,
}

impl ColumnHandle {
    pub(crate) fn new(name: &str, ty: ColumnType) -> Self {
        Self {
            id: ColumnId::fresh(),
            name: Arc::from(name),
            ty,
        }
    }

    pub fn id(&self) -> ColumnId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.ty
    }

    pub fn width(&self) -> usize {
        self.ty.width()
    }
}

/// Ordered, name-unique set of visible column handles.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColumnSet {
    handles: Vec<ColumnHandle>,
}

impl ColumnSet {
    pub(crate) fn from_handles(handles: Vec<ColumnHandle>) -> Self {
        Self { handles }
    }

    /// Look up a handle by name.
    pub fn get(&self, name: &str) -> Result<&ColumnHandle, SchemaError> {
        self.find(name)
            .ok_or_else(|| SchemaError::UnknownColumn(name.to_string()))
    }

    pub fn find(&self, name: &str) -> Option<&ColumnHandle> {
        self.handles.iter().find(|h| h.name() == name)
    }

    /// Whether this exact handle (by id) is part of the set.
    pub fn contains(&self, handle: &ColumnHandle) -> bool {
        self.handles.iter().any(|h| h.id == handle.id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ColumnHandle> {
        self.handles.iter()
    }

    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.handles.iter().map(|h| h.name()).collect()
    }
}

impl<'a> IntoIterator for &'a ColumnSet {
    type Item = &'a ColumnHandle;
    type IntoIter = std::slice::Iter<'a, ColumnHandle>;

    fn into_iter(self) -> Self::IntoIter {
        self.handles.iter()
    }
}

/// Upper bound on the number of source positions one column may read.
pub const MAX_COLUMN_WIDTH: usize = 1 << 20;

/// Resolved source layout of one declared column.
#[derive(Clone, Debug)]
pub(crate) struct ColumnLayout {
    pub handle: ColumnHandle,
    pub kind: DataKind,
    pub positions: Vec<usize>,
}

/// A validated schema: the handles plus where each column is read from.
#[derive(Clone, Debug)]
pub struct Schema {
    columns: ColumnSet,
    layout: Vec<ColumnLayout>,
}

impl Schema {
    /// Validate declarations and produce one handle per column.
    ///
    /// # Errors
    /// Returns [`SchemaError`] if a name repeats, a kind is unsupported, a
    /// source range is inverted, missing or wider than [`MAX_COLUMN_WIDTH`],
    /// or a source position is read as two different kinds.
    pub fn declare(spec: &SchemaSpec) -> Result<Self, SchemaError> {
        let mut names = HashSet::new();
        let mut owners: HashMap<usize, (&str, DataKind)> = HashMap::new();
        let mut layout = Vec::with_capacity(spec.columns.len());

        for decl in &spec.columns {
            if !names.insert(decl.name.as_str()) {
                return Err(SchemaError::DuplicateColumn(decl.name.clone()));
            }
            let kind = decl
                .kind
                .value_kind()
                .ok_or_else(|| SchemaError::UnsupportedKind {
                    column: decl.name.clone(),
                    kind: decl.kind.to_string(),
                })?;
            if decl.sources.is_empty() {
                return Err(SchemaError::NoSource(decl.name.clone()));
            }

            let mut width = 0usize;
            for range in &decl.sources {
                if range.min > range.max {
                    return Err(SchemaError::InvalidRange {
                        column: decl.name.clone(),
                        min: range.min,
                        max: range.max,
                    });
                }
                width = (range.max - range.min)
                    .checked_add(1)
                    .and_then(|w| w.checked_add(width))
                    .filter(|&w| w <= MAX_COLUMN_WIDTH)
                    .ok_or_else(|| SchemaError::RangeTooWide {
                        column: decl.name.clone(),
                        limit: MAX_COLUMN_WIDTH,
                    })?;
            }
            let mut positions = Vec::with_capacity(width);
            for range in &decl.sources {
                positions.extend(range.min..=range.max);
            }

            for &position in &positions {
                match owners.get(&position) {
                    Some(&(owner, owner_kind)) if owner_kind != decl.kind => {
                        return Err(SchemaError::OverlappingSources {
                            position,
                            first: owner.to_string(),
                            first_kind: owner_kind.to_string(),
                            second: decl.name.clone(),
                            second_kind: decl.kind.to_string(),
                        });
                    }
                    Some(_) => {}
                    None => {
                        owners.insert(position, (decl.name.as_str(), decl.kind));
                    }
                }
            }

            let is_scalar = decl.sources.len() == 1 && decl.sources[0].min == decl.sources[0].max;
            let shape = if is_scalar {
                Shape::Scalar
            } else {
                Shape::Vector(positions.len())
            };

            layout.push(ColumnLayout {
                handle: ColumnHandle::new(&decl.name, ColumnType { kind, shape }),
                kind: decl.kind,
                positions,
            });
        }

        let columns = ColumnSet::from_handles(layout.iter().map(|c| c.handle.clone()).collect());
        Ok(Self { columns, layout })
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub(crate) fn layout(&self) -> &[ColumnLayout] {
        &self.layout
    }

    /// Highest source position any column reads, if any column is declared.
    pub fn max_position(&self) -> Option<usize> {
        self.layout
            .iter()
            .flat_map(|c| c.positions.iter().copied())
            .max()
    }
}

/// Declare columns and return only their handles.
pub fn declare_columns(spec: &SchemaSpec) -> Result<ColumnSet, SchemaError> {
    Schema::declare(spec).map(|schema| schema.columns)
}
