//! The fitted, immutable form of a pipeline.

use std::sync::Arc;

use crate::data::DataView;
use crate::error::TransformError;
use crate::schema::{ColumnHandle, ColumnSet};

use super::step::Transformer;

#[derive(Clone, Debug)]
pub(crate) struct FittedStep {
    pub name: &'static str,
    pub output: ColumnHandle,
    pub transformer: Arc<dyn Transformer>,
}

/// Composition of fitted steps, applied stage by stage.
///
/// Cloning shares the fitted steps.
#[derive(Clone, Debug)]
pub struct FittedModel {
    required: Vec<ColumnHandle>,
    outputs: ColumnSet,
    stages: Vec<Vec<FittedStep>>,
}

impl FittedModel {
    pub(crate) fn new(
        required: Vec<ColumnHandle>,
        outputs: ColumnSet,
        stages: Vec<Vec<FittedStep>>,
    ) -> Self {
        Self {
            required,
            outputs,
            stages,
        }
    }

    /// Apply every fitted step to `data`.
    ///
    /// The result holds exactly the pipeline's final columns, in order. The
    /// input is left untouched and repeated calls give identical results.
    ///
    /// # Errors
    /// [`TransformError`] when `data` lacks a column the model reads or a
    /// column has another type than at fit time.
    pub fn transform(&self, data: &DataView) -> Result<DataView, TransformError> {
        for handle in &self.required {
            data.check(handle)?;
        }

        let mut view = data.clone();
        for stage in &self.stages {
            let snapshot = view.clone();
            let produced = stage
                .iter()
                .map(|step| Ok((&step.output, step.transformer.transform(&snapshot)?)))
                .collect::<Result<Vec<_>, TransformError>>()?;
            for (handle, values) in produced {
                view.push_column(handle.name(), handle.column_type(), values)?;
            }
        }

        let mut result = DataView::new(view.n_rows());
        for handle in &self.outputs {
            let column = view.check(handle)?;
            result.push_column(
                handle.name(),
                handle.column_type(),
                column.values().to_owned(),
            )?;
        }
        Ok(result)
    }

    /// Columns of the transformed data.
    pub fn output_columns(&self) -> &ColumnSet {
        &self.outputs
    }

    /// Source columns the model reads from its input.
    pub fn required_columns(&self) -> &[ColumnHandle] {
        &self.required
    }

    pub fn step_names(&self) -> Vec<&'static str> {
        self.stages.iter().flatten().map(|step| step.name).collect()
    }
}

#[cfg(test)]
mod tests {
    use crate::data::DataView;
    use crate::error::TransformError;
    use crate::pipeline::{Outputs, Pipeline};
    use crate::preprocessing::Normalize;
    use crate::schema::{declare_columns, ColumnType, DataKind, SchemaSpec, ValueKind};
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn view(values: ndarray::Array2<f32>) -> DataView {
        let n = values.nrows();
        DataView::new(n)
            .with_column("x", ColumnType::vector(ValueKind::Float, 2), values)
            .unwrap()
    }

    fn fitted() -> crate::pipeline::FittedModel {
        let columns =
            declare_columns(&SchemaSpec::new().vector("x", DataKind::Float, 0, 1)).unwrap();
        Pipeline::new(columns)
            .append(|c| {
                let x = c.get("x")?;
                Ok(Outputs::new().keep(x).add("x_scaled", Normalize::min_max(x)))
            })
            .unwrap()
            .fit(&view(array![[0.0, 10.0], [5.0, 20.0], [10.0, 30.0]]))
            .unwrap()
            .model
    }

    #[test]
    fn test_transform_is_repeatable() {
        let model = fitted();
        let data = view(array![[2.5, 15.0], [20.0, 0.0]]);

        let first = model.transform(&data).unwrap();
        let second = model.transform(&data).unwrap();
        assert_eq!(
            first.features("x_scaled").unwrap(),
            second.features("x_scaled").unwrap()
        );
        let expected = array![[0.25f32, 0.25], [2.0, -0.5]];
        for (got, want) in first.features("x_scaled").unwrap().iter().zip(expected.iter()) {
            assert_abs_diff_eq!(*got, *want, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_transform_missing_column() {
        let model = fitted();
        let err = model.transform(&DataView::new(1)).unwrap_err();
        assert_eq!(err, TransformError::MissingColumn("x".to_string()));
    }

    #[test]
    fn test_transform_type_mismatch() {
        let model = fitted();
        let data = DataView::new(1)
            .with_column("x", ColumnType::vector(ValueKind::Float, 3), array![[1.0, 2.0, 3.0]])
            .unwrap();
        assert!(matches!(
            model.transform(&data),
            Err(TransformError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_step_names() {
        assert_eq!(fitted().step_names(), vec!["Normalize"]);
    }
}
