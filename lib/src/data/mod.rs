//! In-memory tabular data flowing through pipelines.
//!
//! A [`DataView`] is a set of row-aligned named columns. Every column is
//! stored as an `n_rows × width` `f32` matrix together with its
//! [`ColumnType`], so scalar and vector columns share one representation.
//!
//! Views are cheap to clone: column buffers sit behind `Arc` and are only
//! copied when rows are selected.
//!
//! # Example
//!
//! ```
//! use mlchain::data::DataView;
//! use mlchain::schema::{ColumnType, ValueKind};
//! use ndarray::array;
//!
//! let mut view = DataView::new(2);
//! view.push_column("label", ColumnType::scalar(ValueKind::Float), array![[1.0], [2.0]])
//!     .unwrap();
//! assert_eq!(view.scalar("label").unwrap().to_vec(), vec![1.0, 2.0]);
//! ```

pub mod loader;

pub use self::loader::{TextLoader, TextLoaderOptions};

use std::sync::Arc;

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::error::TransformError;
use crate::schema::{ColumnHandle, ColumnType, ValueKind};

/// One named column of a [`DataView`].
#[derive(Clone, Debug)]
pub struct Column {
    name: Arc<str>,
    ty: ColumnType,
    values: Arc<Array2<f32>>,
}

impl Column {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn column_type(&self) -> ColumnType {
        self.ty
    }

    /// Values as an `n_rows × width` matrix.
    pub fn values(&self) -> ArrayView2<'_, f32> {
        self.values.view()
    }
}

/// Row-aligned collection of named columns.
#[derive(Clone, Debug, Default)]
pub struct DataView {
    n_rows: usize,
    columns: Vec<Column>,
}

impl DataView {
    /// Create an empty view expecting `n_rows` rows per column.
    pub fn new(n_rows: usize) -> Self {
        Self {
            n_rows,
            columns: Vec::new(),
        }
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn n_columns(&self) -> usize {
        self.columns.len()
    }

    /// Add a column, replacing any column with the same name in place.
    ///
    /// # Errors
    /// Returns [`TransformError::RowCountMismatch`] if the row count differs
    /// from the view, or [`TransformError::WidthMismatch`] if the matrix width
    /// disagrees with the declared type.
    pub fn push_column(
        &mut self,
        name: &str,
        ty: ColumnType,
        values: Array2<f32>,
    ) -> Result<(), TransformError> {
        if values.nrows() != self.n_rows {
            return Err(TransformError::RowCountMismatch {
                column: name.to_string(),
                expected: self.n_rows,
                found: values.nrows(),
            });
        }
        if values.ncols() != ty.width() {
            return Err(TransformError::WidthMismatch {
                column: name.to_string(),
                expected: ty.width(),
                found: values.ncols(),
            });
        }

        let column = Column {
            name: Arc::from(name),
            ty,
            values: Arc::new(values),
        };
        match self.columns.iter_mut().find(|c| c.name() == name) {
            Some(existing) => *existing = column,
            None => self.columns.push(column),
        }
        Ok(())
    }

    /// Builder-style [`push_column`](Self::push_column).
    pub fn with_column(
        mut self,
        name: &str,
        ty: ColumnType,
        values: Array2<f32>,
    ) -> Result<Self, TransformError> {
        self.push_column(name, ty, values)?;
        Ok(self)
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name() == name)
    }

    pub fn columns(&self) -> impl Iterator<Item = &Column> {
        self.columns.iter()
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name()).collect()
    }

    /// Find the column a handle refers to and check that its type matches.
    pub fn check(&self, handle: &ColumnHandle) -> Result<&Column, TransformError> {
        let column = self
            .column(handle.name())
            .ok_or_else(|| TransformError::MissingColumn(handle.name().to_string()))?;
        if column.ty != handle.column_type() {
            return Err(TransformError::TypeMismatch {
                column: handle.name().to_string(),
                expected: handle.column_type(),
                found: column.ty,
            });
        }
        Ok(column)
    }

    /// View a scalar float column as a vector.
    pub fn scalar(&self, name: &str) -> Result<ArrayView1<'_, f32>, TransformError> {
        let column = self
            .column(name)
            .ok_or_else(|| TransformError::MissingColumn(name.to_string()))?;
        let expected = ColumnType::scalar(ValueKind::Float);
        if column.ty != expected {
            return Err(TransformError::TypeMismatch {
                column: name.to_string(),
                expected,
                found: column.ty,
            });
        }
        Ok(column.values.column(0))
    }

    /// View any float column as an `n_rows × width` matrix.
    pub fn features(&self, name: &str) -> Result<ArrayView2<'_, f32>, TransformError> {
        let column = self
            .column(name)
            .ok_or_else(|| TransformError::MissingColumn(name.to_string()))?;
        Ok(column.values.view())
    }

    /// New view holding only the given rows, in the given order.
    pub fn take_rows(&self, rows: &[usize]) -> DataView {
        let columns = self
            .columns
            .iter()
            .map(|c| Column {
                name: Arc::clone(&c.name),
                ty: c.ty,
                values: Arc::new(c.values.select(Axis(0), rows)),
            })
            .collect();
        DataView {
            n_rows: rows.len(),
            columns,
        }
    }
}
