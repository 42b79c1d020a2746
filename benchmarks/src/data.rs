//! Seeded synthetic regression data.

use mlchain::schema::{declare_columns, ColumnSet, DataKind, SchemaSpec};
use mlchain::{DataView, Result};
use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Columns plus rows, ready for `Pipeline::new(columns)`.
#[derive(Debug, Clone)]
pub struct SyntheticData {
    pub columns: ColumnSet,
    pub data: DataView,
}

/// `rows` rows of `label` (scalar) and `features` (`n_features` wide).
///
/// The label mixes a linear part, an interaction between the first two
/// features and uniform noise, so both linear and tree trainers have
/// something to learn.
pub fn synthetic_regression(rows: usize, n_features: usize, seed: u64) -> Result<SyntheticData> {
    let mut rng = StdRng::seed_from_u64(seed);
    let features = Array2::from_shape_fn((rows, n_features), |_| rng.gen_range(-1.0f32..1.0));
    let coefficients: Array1<f32> = (0..n_features).map(|j| 1.0 / (j + 1) as f32).collect();

    let mut label = features.dot(&coefficients);
    if n_features >= 2 {
        label += &(&features.column(0) * &features.column(1) * 2.0);
    }
    label.mapv_inplace(|v| v + rng.gen_range(-0.1f32..0.1));

    let spec = SchemaSpec::new()
        .scalar("label", DataKind::Float, 0)
        .vector("features", DataKind::Float, 1, n_features);
    let columns = declare_columns(&spec)?;

    let data = DataView::new(rows)
        .with_column(
            "label",
            columns.get("label")?.column_type(),
            label.insert_axis(Axis(1)),
        )?
        .with_column(
            "features",
            columns.get("features")?.column_type(),
            features,
        )?;
    Ok(SyntheticData { columns, data })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shapes_and_seed() {
        let a = synthetic_regression(50, 4, 3).unwrap();
        let b = synthetic_regression(50, 4, 3).unwrap();
        assert_eq!(a.data.n_rows(), 50);
        assert_eq!(a.data.features("features").unwrap().ncols(), 4);
        assert_eq!(a.columns.names(), vec!["label", "features"]);
        assert_eq!(a.data.scalar("label").unwrap(), b.data.scalar("label").unwrap());
    }
}
