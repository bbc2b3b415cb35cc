//! # Image Feature Store
//!
//! Resolves per-image feature files on disk and loads them as
//! L2-normalized vectors. A failed load substitutes a zero-valued
//! placeholder and logs a warning so batch assembly never stalls on a
//! single missing image.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use safetensors::SafeTensors;
use tracing::warn;

use crate::config::DataConfig;
use crate::error::{Result, VqafeedError};
use crate::types::Split;

/// File suffix of per-image feature files.
pub const FEATURE_FILE_SUFFIX: &str = ".safetensors";

/// Name of the feature tensor inside each file.
pub const FEATURE_TENSOR_NAME: &str = "x";

/// Locates and loads per-image feature vectors.
#[derive(Debug, Clone)]
pub struct FeatureStore {
    prefixes: HashMap<Split, String>,
    feature_dim: usize,
}

impl FeatureStore {
    /// Build a store from the data-paths config, capturing the feature
    /// prefix of every configured split.
    #[must_use]
    pub fn new(config: &DataConfig, feature_dim: usize) -> Self {
        let mut prefixes = HashMap::new();
        for (name, paths) in &config.splits {
            if let Ok(split) = Split::parse(name) {
                prefixes.insert(split, paths.features_prefix.clone());
            }
        }

        Self {
            prefixes,
            feature_dim,
        }
    }

    /// Width of the vectors this store serves.
    #[must_use]
    pub fn feature_dim(&self) -> usize {
        self.feature_dim
    }

    /// Path of the feature file for an image. VQA splits zero-fill the
    /// image id to 12 digits; genome ids are used verbatim.
    pub fn feature_path(&self, split: Split, image_id: u64) -> Result<PathBuf> {
        let prefix = self
            .prefixes
            .get(&split)
            .ok_or_else(|| VqafeedError::UnknownSplit {
                split: split.as_str().into(),
            })?;

        let name = if split.zero_pads_image_ids() {
            format!("{prefix}{image_id:012}{FEATURE_FILE_SUFFIX}")
        } else {
            format!("{prefix}{image_id}{FEATURE_FILE_SUFFIX}")
        };
        Ok(PathBuf::from(name))
    }

    /// Load the feature vector for an image, L2-normalized.
    ///
    /// # Errors
    ///
    /// Returns an error when the file is missing, holds the wrong tensor
    /// name or dtype, or its element count differs from `feature_dim`.
    pub fn try_load(&self, split: Split, image_id: u64) -> Result<Vec<f32>> {
        let path = self.feature_path(split, image_id)?;
        let vector = read_feature_file(&path, self.feature_dim)?;
        Ok(l2_normalize(vector))
    }

    /// Load the feature vector for an image, substituting a zero-valued
    /// placeholder (with a logged warning) on any failure.
    #[must_use]
    pub fn load(&self, split: Split, image_id: u64) -> Vec<f32> {
        match self.try_load(split, image_id) {
            Ok(vector) => vector,
            Err(e) => {
                warn!(
                    split = %split,
                    image_id,
                    error = %e,
                    "feature load failed, substituting zeros"
                );
                vec![0.0; self.feature_dim]
            }
        }
    }
}

fn read_feature_file(path: &Path, feature_dim: usize) -> Result<Vec<f32>> {
    let buffer = fs::read(path)?;
    let tensors = SafeTensors::deserialize(&buffer)
        .map_err(|e| VqafeedError::FeatureFile(format!("{}: {e}", path.display())))?;
    let view = tensors
        .tensor(FEATURE_TENSOR_NAME)
        .map_err(|e| VqafeedError::FeatureFile(format!("{}: {e}", path.display())))?;

    if view.dtype() != safetensors::Dtype::F32 {
        return Err(VqafeedError::FeatureFile(format!(
            "{}: expected f32 tensor, got {:?}",
            path.display(),
            view.dtype()
        )));
    }

    let data = view.data();
    let count = data.len() / 4;
    if count != feature_dim {
        return Err(VqafeedError::FeatureFile(format!(
            "{}: expected {feature_dim} elements, got {count}",
            path.display()
        )));
    }

    Ok(data
        .chunks_exact(4)
        .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .collect())
}

/// Scale a vector to unit L2 norm. All-zero vectors are left untouched.
fn l2_normalize(mut vector: Vec<f32>) -> Vec<f32> {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for v in &mut vector {
            *v /= norm;
        }
    }
    vector
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SplitPaths;
    use safetensors::tensor::TensorView;
    use safetensors::{serialize_to_file, Dtype};

    fn fixture_prefix() -> String {
        let dir = std::env::temp_dir().join(format!("vqafeed-feat-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        format!("{}/feat_", dir.display())
    }

    fn write_feature_file(path: &Path, values: &[f32]) {
        let data: Vec<u8> = values.iter().flat_map(|v| v.to_le_bytes()).collect();
        let view = TensorView::new(Dtype::F32, vec![values.len()], &data).unwrap();
        serialize_to_file(vec![(FEATURE_TENSOR_NAME, view)], &None, path).unwrap();
    }

    fn store_with_prefix(prefix: &str, split: Split, dim: usize) -> FeatureStore {
        let mut config = DataConfig::default();
        config.insert(
            split,
            SplitPaths {
                features_prefix: prefix.to_string(),
                ..SplitPaths::default()
            },
        );
        FeatureStore::new(&config, dim)
    }

    #[test]
    fn test_feature_path_zero_pads_vqa_ids() {
        let store = store_with_prefix("/data/feat/COCO_train2014_", Split::Train, 4);
        let path = store.feature_path(Split::Train, 42).unwrap();
        assert_eq!(
            path,
            PathBuf::from("/data/feat/COCO_train2014_000000000042.safetensors")
        );
    }

    #[test]
    fn test_feature_path_genome_ids_verbatim() {
        let store = store_with_prefix("/data/feat/genome/", Split::Genome, 4);
        let path = store.feature_path(Split::Genome, 42).unwrap();
        assert_eq!(path, PathBuf::from("/data/feat/genome/42.safetensors"));
    }

    #[test]
    fn test_load_normalizes() {
        let prefix = fixture_prefix();
        let store = store_with_prefix(&prefix, Split::Genome, 4);
        let path = store.feature_path(Split::Genome, 1).unwrap();
        write_feature_file(&path, &[3.0, 0.0, 4.0, 0.0]);

        let vector = store.load(Split::Genome, 1);
        assert_eq!(vector, vec![0.6, 0.0, 0.8, 0.0]);
    }

    #[test]
    fn test_missing_file_substitutes_zeros() {
        let store = store_with_prefix("/nonexistent/feat_", Split::Train, 4);
        let vector = store.load(Split::Train, 12345);
        assert_eq!(vector, vec![0.0; 4]);
    }

    #[test]
    fn test_wrong_length_substitutes_zeros() {
        let prefix = fixture_prefix();
        let store = store_with_prefix(&prefix, Split::Genome, 4);
        let path = store.feature_path(Split::Genome, 2).unwrap();
        write_feature_file(&path, &[1.0, 2.0]);

        assert!(store.try_load(Split::Genome, 2).is_err());
        assert_eq!(store.load(Split::Genome, 2), vec![0.0; 4]);
    }

    #[test]
    fn test_all_zero_vector_stays_finite() {
        let prefix = fixture_prefix();
        let store = store_with_prefix(&prefix, Split::Genome, 3);
        let path = store.feature_path(Split::Genome, 3).unwrap();
        write_feature_file(&path, &[0.0, 0.0, 0.0]);

        let vector = store.load(Split::Genome, 3);
        assert!(vector.iter().all(|v| v.is_finite()));
        assert_eq!(vector, vec![0.0; 3]);
    }
}
