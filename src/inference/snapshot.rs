//! Helpers for reading a Hugging Face style model snapshot directory.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use candle::{DType, Device};
use candle_nn::VarBuilder;
use serde::Deserialize;
use tokenizers::Tokenizer;

const WEIGHT_CANDIDATES: &[&str] = &["model.safetensors", "pytorch_model.bin", "model.bin"];

/// The label tables most `config.json` files carry next to the architecture.
#[derive(Debug, Default, Deserialize)]
pub struct LabelTables {
    #[serde(default)]
    pub model_type: Option<String>,
    #[serde(default)]
    pub id2label: HashMap<String, String>,
    #[serde(default)]
    pub label2id: HashMap<String, u32>,
}

pub fn read_config_json(snapshot: &Path) -> Result<String> {
    let path = snapshot.join("config.json");
    if !path.exists() {
        return Err(anyhow!("config.json not found under {}", snapshot.display()));
    }
    fs::read_to_string(&path).with_context(|| format!("failed to read {}", path.display()))
}

pub fn load_tokenizer(path: &Path) -> Result<Tokenizer> {
    if !path.exists() {
        return Err(anyhow!("tokenizer.json not found at {}", path.display()));
    }
    Tokenizer::from_file(path)
        .map_err(|e| anyhow!("Tokenizer load failed ({}): {e}", path.display()))
}

/// A weights file and the loader candle needs for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelWeights {
    Safetensors(PathBuf),
    Pickle(PathBuf),
}

impl ModelWeights {
    /// Picks the loader from the file extension; anything not `.safetensors` is a torch pickle.
    pub fn at(path: PathBuf) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("safetensors") => Self::Safetensors(path),
            _ => Self::Pickle(path),
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            Self::Safetensors(path) | Self::Pickle(path) => path,
        }
    }

    /// Tensors are read as f32 whatever the checkpoint stores.
    pub fn var_builder(&self, device: &Device) -> Result<VarBuilder<'static>> {
        let loaded = match self {
            // SAFETY: the file is mapped read-only and not modified while the model lives.
            Self::Safetensors(path) => unsafe {
                VarBuilder::from_mmaped_safetensors(&[path], DType::F32, device)
            },
            Self::Pickle(path) => VarBuilder::from_pth(path, DType::F32, device),
        };
        loaded.with_context(|| format!("failed to load weights from {}", self.path().display()))
    }
}

pub fn find_model_weights(snapshot: &Path) -> Option<ModelWeights> {
    WEIGHT_CANDIDATES
        .iter()
        .map(|candidate| snapshot.join(candidate))
        .find(|path| path.exists())
        .map(ModelWeights::at)
}
