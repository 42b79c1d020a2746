//! Persistence of trained predictors and hyperparameters.
//!
//! Anything that is `Serialize + DeserializeOwned` (every predictor and
//! parameter struct in this crate) gets [`SerializableParams`] for free,
//! encoded with `bincode`.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::PersistError;

/// Plain numeric state that can be written to and read from bytes.
pub trait SerializableParams: Sized {
    /// Encode into a byte buffer.
    fn to_bytes(&self) -> Result<Vec<u8>, PersistError>;

    /// Decode from a byte buffer.
    fn from_bytes(bytes: &[u8]) -> Result<Self, PersistError>;

    /// Write the encoding to `path`, replacing any existing file.
    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), PersistError>;

    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, PersistError>;
}

impl<T> SerializableParams for T
where
    T: Serialize + DeserializeOwned,
{
    fn to_bytes(&self) -> Result<Vec<u8>, PersistError> {
        Ok(bincode::serialize(self)?)
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, PersistError> {
        Ok(bincode::deserialize(bytes)?)
    }

    fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), PersistError> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        bincode::serialize_into(&mut writer, self)?;
        writer.flush()?;
        debug!(path = %path.display(), "saved parameters");
        Ok(())
    }

    fn load_from_file(path: impl AsRef<Path>) -> Result<Self, PersistError> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        Ok(bincode::deserialize_from(reader)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trainers::{FastTreeParams, LinearRegressionPredictor};
    use ndarray::array;

    #[test]
    fn test_predictor_bytes() {
        let predictor = LinearRegressionPredictor::new(array![1.5f32, -2.0], 0.25);
        let bytes = predictor.to_bytes().unwrap();
        assert_eq!(LinearRegressionPredictor::from_bytes(&bytes).unwrap(), predictor);
    }

    #[test]
    fn test_params_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("params.bin");
        let params = FastTreeParams {
            num_trees: 7,
            ..FastTreeParams::default()
        };
        params.save_to_file(&path).unwrap();
        assert_eq!(FastTreeParams::load_from_file(&path).unwrap(), params);
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = LinearRegressionPredictor::load_from_file(dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, PersistError::Io(_)));
    }

    #[test]
    fn test_truncated_bytes() {
        let predictor = LinearRegressionPredictor::new(array![1.0f32, 2.0, 3.0], 0.0);
        let bytes = predictor.to_bytes().unwrap();
        let err = LinearRegressionPredictor::from_bytes(&bytes[..bytes.len() / 2]).unwrap_err();
        assert!(matches!(err, PersistError::Serialization(_)));
    }
}
