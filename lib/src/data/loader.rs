//! Delimited-text reader driven by a [`SchemaSpec`].
//!
//! Each declared column reads one or more field positions of every record.
//! Numeric kinds load as `f32`, booleans as `0.0`/`1.0`, and empty fields as
//! `NaN`. Several files can be read into one view with
//! [`TextLoader::read_paths`].

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use csv::{ReaderBuilder, StringRecord, Trim};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::data::DataView;
use crate::error::LoadError;
use crate::pipeline::Pipeline;
use crate::schema::{ColumnSet, DataKind, Schema, SchemaSpec};

/// Options for [`TextLoader`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TextLoaderOptions {
    /// Field separator. Must be ASCII.
    pub separator: char,
    /// Skip the first record of every file.
    pub has_header: bool,
}

impl Default for TextLoaderOptions {
    fn default() -> Self {
        Self {
            separator: '\t',
            has_header: false,
        }
    }
}

impl TextLoaderOptions {
    pub fn with_separator(mut self, separator: char) -> Self {
        self.separator = separator;
        self
    }

    pub fn with_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Parse options from JSON, filling missing fields with defaults.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Reads delimited text into a [`DataView`] according to a schema.
#[derive(Clone, Debug)]
pub struct TextLoader {
    schema: Schema,
    separator: u8,
    has_header: bool,
}

/// Per-column value buffers filled record by record.
struct Buffers {
    n_rows: usize,
    values: Vec<Vec<f32>>,
}

impl TextLoader {
    /// Validate the schema and the options.
    ///
    /// # Errors
    /// [`LoadError::Schema`] for invalid declarations and
    /// [`LoadError::InvalidSeparator`] for a non-ASCII separator.
    pub fn new(spec: &SchemaSpec, options: TextLoaderOptions) -> Result<Self, LoadError> {
        if !options.separator.is_ascii() {
            return Err(LoadError::InvalidSeparator(options.separator));
        }
        let schema = Schema::declare(spec)?;
        Ok(Self {
            schema,
            separator: options.separator as u8,
            has_header: options.has_header,
        })
    }

    /// Handles of the columns this loader produces.
    pub fn columns(&self) -> &ColumnSet {
        self.schema.columns()
    }

    /// Start an empty pipeline over this loader's columns.
    pub fn make_new_estimator(&self) -> Pipeline {
        Pipeline::new(self.columns().clone())
    }

    pub fn read_path(&self, path: impl AsRef<Path>) -> Result<DataView, LoadError> {
        self.read_paths(std::iter::once(path))
    }

    /// Read several files as one data set, in order.
    pub fn read_paths<I, P>(&self, paths: I) -> Result<DataView, LoadError>
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        let mut buffers = self.buffers();
        for path in paths {
            let path = path.as_ref();
            debug!(path = %path.display(), "reading delimited text");
            let file = File::open(path)?;
            self.consume(BufReader::new(file), &mut buffers)?;
        }
        self.finish(buffers)
    }

    pub fn read<R: Read>(&self, reader: R) -> Result<DataView, LoadError> {
        let mut buffers = self.buffers();
        self.consume(reader, &mut buffers)?;
        self.finish(buffers)
    }

    pub fn read_str(&self, text: &str) -> Result<DataView, LoadError> {
        self.read(text.as_bytes())
    }

    fn buffers(&self) -> Buffers {
        Buffers {
            n_rows: 0,
            values: vec![Vec::new(); self.schema.layout().len()],
        }
    }

    fn consume<R: Read>(&self, reader: R, buffers: &mut Buffers) -> Result<(), LoadError> {
        let mut rdr = ReaderBuilder::new()
            .delimiter(self.separator)
            .has_headers(self.has_header)
            .flexible(true)
            .trim(Trim::All)
            .from_reader(reader);

        for result in rdr.records() {
            let record = result?;
            self.parse_record(&record, buffers)?;
            buffers.n_rows += 1;
        }
        Ok(())
    }

    fn parse_record(&self, record: &StringRecord, buffers: &mut Buffers) -> Result<(), LoadError> {
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        for (layout, values) in self.schema.layout().iter().zip(buffers.values.iter_mut()) {
            for &position in &layout.positions {
                let field = record
                    .get(position)
                    .ok_or(LoadError::MissingField { line, position })?;
                let value = parse_field(field, layout.kind).ok_or_else(|| LoadError::Parse {
                    line,
                    position,
                    value: field.to_string(),
                    kind: layout.kind.to_string(),
                })?;
                values.push(value);
            }
        }
        Ok(())
    }

    fn finish(&self, buffers: Buffers) -> Result<DataView, LoadError> {
        let mut view = DataView::new(buffers.n_rows);
        for (layout, values) in self.schema.layout().iter().zip(buffers.values) {
            let ty = layout.handle.column_type();
            let matrix = Array2::from_shape_vec((buffers.n_rows, ty.width()), values)?;
            view.push_column(layout.handle.name(), ty, matrix)?;
        }
        debug!(rows = view.n_rows(), columns = view.n_columns(), "loaded data");
        Ok(view)
    }
}

fn parse_field(field: &str, kind: DataKind) -> Option<f32> {
    if field.is_empty() {
        return Some(f32::NAN);
    }
    match kind {
        DataKind::Float => field.parse::<f32>().ok(),
        DataKind::Double => field.parse::<f64>().ok().map(|v| v as f32),
        DataKind::Int => field.parse::<i64>().ok().map(|v| v as f32),
        DataKind::Bool => match field.to_ascii_lowercase().as_str() {
            "true" | "1" => Some(1.0),
            "false" | "0" => Some(0.0),
            _ => None,
        },
        DataKind::Text => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{ColumnType, ValueKind};
    use approx::assert_relative_eq;
    use std::io::Write;

    fn housing_loader(has_header: bool) -> TextLoader {
        let spec = SchemaSpec::new()
            .scalar("label", DataKind::Float, 0)
            .vector("features", DataKind::Float, 1, 3);
        TextLoader::new(&spec, TextLoaderOptions::default().with_header(has_header)).unwrap()
    }

    #[test]
    fn test_read_tab_separated() {
        let loader = housing_loader(true);
        let data = loader
            .read_str("MedV\tCrim\tZn\tIndus\n24.0\t0.006\t18\t2.31\n21.6\t0.027\t0\t7.07\n")
            .unwrap();

        assert_eq!(data.n_rows(), 2);
        assert_eq!(data.scalar("label").unwrap().to_vec(), vec![24.0, 21.6]);
        let features = data.features("features").unwrap();
        assert_eq!(features.dim(), (2, 3));
        assert_relative_eq!(features[[1, 2]], 7.07);
        assert_eq!(
            data.column("features").unwrap().column_type(),
            ColumnType::vector(ValueKind::Float, 3)
        );
    }

    #[test]
    fn test_empty_field_is_nan() {
        let loader = housing_loader(false);
        let data = loader.read_str("1\t\t2\t3\n").unwrap();
        assert!(data.features("features").unwrap()[[0, 0]].is_nan());
    }

    #[test]
    fn test_parse_error_reports_line_and_position() {
        let loader = housing_loader(false);
        let err = loader.read_str("1\t2\t3\t4\n5\tabc\t7\t8\n").unwrap_err();
        match err {
            LoadError::Parse {
                line,
                position,
                value,
                ..
            } => {
                assert_eq!(line, 2);
                assert_eq!(position, 1);
                assert_eq!(value, "abc");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_short_record_is_missing_field() {
        let loader = housing_loader(false);
        let err = loader.read_str("1\t2\t3\n").unwrap_err();
        assert!(matches!(err, LoadError::MissingField { position: 3, .. }));
    }

    #[test]
    fn test_bool_and_int_kinds() {
        let spec = SchemaSpec::new()
            .scalar("flag", DataKind::Bool, 0)
            .scalar("count", DataKind::Int, 1);
        let loader =
            TextLoader::new(&spec, TextLoaderOptions::default().with_separator(',')).unwrap();
        let data = loader.read_str("true,3\nFALSE,4\n").unwrap();

        let flag = data.column("flag").unwrap();
        assert_eq!(flag.column_type(), ColumnType::scalar(ValueKind::Bool));
        assert_eq!(flag.values().column(0).to_vec(), vec![1.0, 0.0]);
        assert_eq!(data.scalar("count").unwrap().to_vec(), vec![3.0, 4.0]);

        assert!(loader.read_str("true,3.5\n").is_err());
    }

    #[test]
    fn test_rejects_non_ascii_separator() {
        let spec = SchemaSpec::new().scalar("x", DataKind::Float, 0);
        let err = TextLoader::new(&spec, TextLoaderOptions::default().with_separator('¦'))
            .unwrap_err();
        assert!(matches!(err, LoadError::InvalidSeparator('¦')));
    }

    #[test]
    fn test_rejects_invalid_schema() {
        let spec = SchemaSpec::new().scalar("name", DataKind::Text, 0);
        let err = TextLoader::new(&spec, TextLoaderOptions::default()).unwrap_err();
        assert!(matches!(err, LoadError::Schema(_)));
    }

    #[test]
    fn test_read_paths_concatenates_files() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("part-0.tsv");
        let second = dir.path().join("part-1.tsv");
        let files = [
            (&first, "h\ta\tb\tc\n1\t1\t1\t1\n"),
            (&second, "h\ta\tb\tc\n2\t2\t2\t2\n3\t3\t3\t3\n"),
        ];
        for (path, body) in files {
            let mut file = File::create(path).unwrap();
            file.write_all(body.as_bytes()).unwrap();
        }

        let loader = housing_loader(true);
        let data = loader.read_paths([&first, &second]).unwrap();
        assert_eq!(data.scalar("label").unwrap().to_vec(), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let loader = housing_loader(false);
        let err = loader.read_path("/definitely/not/here.tsv").unwrap_err();
        assert!(matches!(err, LoadError::Io(_)));
    }

    #[test]
    fn test_options_from_json() {
        let options = TextLoaderOptions::from_json(r#"{ "has_header": true }"#).unwrap();
        assert_eq!(options.separator, '\t');
        assert!(options.has_header);
    }
}
