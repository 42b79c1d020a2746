//! Join several float columns into one vector column.

use ndarray::{s, Array2};

use crate::data::DataView;
use crate::error::{FitError, SchemaError, TransformError};
use crate::pipeline::{Estimator, Transformer};
use crate::schema::{ColumnHandle, ColumnType, ValueKind};

/// Concatenates its inputs slot-wise, in the order given. Learns nothing.
#[derive(Clone, Debug)]
pub struct Concatenate {
    inputs: Vec<ColumnHandle>,
}

impl Concatenate {
    pub fn new(inputs: &[&ColumnHandle]) -> Self {
        Self {
            inputs: inputs.iter().map(|&h| h.clone()).collect(),
        }
    }

    fn width(&self) -> usize {
        self.inputs.iter().map(ColumnHandle::width).sum()
    }
}

impl Estimator for Concatenate {
    type Fitted = Concatenate;

    fn name(&self) -> &'static str {
        "Concatenate"
    }

    fn inputs(&self) -> Vec<ColumnHandle> {
        self.inputs.clone()
    }

    fn output_type(&self) -> Result<ColumnType, SchemaError> {
        if self.inputs.is_empty() {
            return Err(SchemaError::NoInputs("Concatenate"));
        }
        if let Some(bad) = self
            .inputs
            .iter()
            .find(|h| h.column_type().kind != ValueKind::Float)
        {
            return Err(SchemaError::TypeMismatch {
                column: bad.name().to_string(),
                expected: "a float column".to_string(),
                found: bad.column_type(),
            });
        }
        Ok(ColumnType::vector(ValueKind::Float, self.width()))
    }

    fn fit(&self, data: &DataView) -> Result<Concatenate, FitError> {
        for handle in &self.inputs {
            data.check(handle)?;
        }
        Ok(self.clone())
    }
}

impl Transformer for Concatenate {
    fn transform(&self, data: &DataView) -> Result<Array2<f32>, TransformError> {
        let mut out = Array2::zeros((data.n_rows(), self.width()));
        let mut start = 0;
        for handle in &self.inputs {
            let values = data.check(handle)?.values();
            let end = start + values.ncols();
            out.slice_mut(s![.., start..end]).assign(&values);
            start = end;
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_concatenate_scalar_and_vector() {
        let a = ColumnHandle::new("a", ColumnType::scalar(ValueKind::Float));
        let b = ColumnHandle::new("b", ColumnType::vector(ValueKind::Float, 2));
        let data = DataView::new(2)
            .with_column("a", a.column_type(), array![[1.0], [2.0]])
            .unwrap()
            .with_column("b", b.column_type(), array![[3.0, 4.0], [5.0, 6.0]])
            .unwrap();

        let concat = Concatenate::new(&[&b, &a]);
        assert_eq!(
            concat.output_type().unwrap(),
            ColumnType::vector(ValueKind::Float, 3)
        );
        let out = concat.fit(&data).unwrap().transform(&data).unwrap();
        assert_eq!(out, array![[3.0f32, 4.0, 1.0], [5.0, 6.0, 2.0]]);
    }

    #[test]
    fn test_concatenate_needs_inputs() {
        assert_eq!(
            Concatenate::new(&[]).output_type(),
            Err(SchemaError::NoInputs("Concatenate"))
        );
    }

    #[test]
    fn test_concatenate_missing_column() {
        let a = ColumnHandle::new("a", ColumnType::scalar(ValueKind::Float));
        let err = Concatenate::new(&[&a]).transform(&DataView::new(1)).unwrap_err();
        assert_eq!(err, TransformError::MissingColumn("a".to_string()));
    }
}
