//! Shared fixtures for the integration tests.

use mlchain::prelude::*;

/// `label` at position 0, six float features at positions 1..=6.
pub fn housing_spec() -> SchemaSpec {
    SchemaSpec::new()
        .scalar("label", DataKind::Float, 0)
        .vector("features", DataKind::Float, 1, 6)
}

/// Tab-separated rows of a noiseless linear target
/// `label = 3 + 2*f0 - f1 + 0.5*f2` with three nuisance features.
pub fn housing_text(rows: usize) -> String {
    let mut text = String::new();
    for i in 0..rows {
        let f: Vec<f32> = (0..6)
            .map(|j| ((i * (2 * j + 3) + (i / 7) * (j + 1)) % 17) as f32 / 2.0)
            .collect();
        let label = 3.0 + 2.0 * f[0] - f[1] + 0.5 * f[2];
        text.push_str(&label.to_string());
        for v in &f {
            text.push('\t');
            text.push_str(&v.to_string());
        }
        text.push('\n');
    }
    text
}

pub fn housing_data(rows: usize) -> (TextLoader, DataView) {
    let loader = TextLoader::new(&housing_spec(), TextLoaderOptions::default())
        .expect("valid schema");
    let data = loader.read_str(&housing_text(rows)).expect("valid data");
    (loader, data)
}
