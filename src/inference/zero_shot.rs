use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use candle::{DType, Device, IndexOp, Tensor};
use candle_transformers::models::modernbert::{
    ClassifierConfig, ClassifierPooling, Config, ModernBertForSequenceClassification,
};
use hf_hub::{api::sync::Api, Repo, RepoType};
use tokenizers::{PaddingParams, Tokenizer, TruncationParams, TruncationStrategy};
use tracing::{debug, info};

use super::snapshot::{self, LabelTables, ModelWeights};
use super::{ClassificationResult, Classifier, Label, CANDIDATE_LABELS};
use crate::error::SentigateError;

const HYPOTHESIS_TEMPLATE: &str = "This example is {}.";

/// NLI-based zero-shot classifier used as the second opinion.
///
/// Each candidate label becomes a hypothesis paired with the review; the
/// entailment logits are softmaxed across the candidates (single-label mode).
pub struct ZeroShotClassifier {
    model: ModernBertForSequenceClassification,
    tokenizer: Tokenizer,
    device: Device,
    entailment_id: usize,
}

/// Resolved files for a zero-shot checkpoint, local or downloaded.
struct ModelFiles {
    config: PathBuf,
    tokenizer: PathBuf,
    weights: ModelWeights,
}

impl ZeroShotClassifier {
    /// `model` is either a local snapshot directory or a Hugging Face repo id.
    pub fn load(model: &str, device: Device, max_len: usize) -> Result<Self> {
        let files = resolve_files(model)?;
        let raw_config = std::fs::read_to_string(&files.config)
            .with_context(|| format!("failed to read {}", files.config.display()))?;
        let mut config: Config =
            serde_json::from_str(&raw_config).context("invalid ModernBERT config")?;
        let tables: LabelTables = serde_json::from_str(&raw_config)?;
        let entailment_id = entailment_index(&tables)?;
        patch_classifier_config(&mut config, &tables);

        let mut tokenizer = snapshot::load_tokenizer(&files.tokenizer)?;
        prepare_pair_tokenizer(&mut tokenizer, max_len)?;

        let vb = files.weights.var_builder(&device)?;
        let model_impl = ModernBertForSequenceClassification::load(vb, &config)?;

        info!(model, entailment_id, "backup zero-shot model loaded");

        Ok(Self {
            model: model_impl,
            tokenizer,
            device,
            entailment_id,
        })
    }

    /// Scores for every candidate, highest first; scores sum to 1.
    pub fn scores(&self, text: &str, candidate_labels: &[&str]) -> Result<Vec<(String, f32)>> {
        if candidate_labels.is_empty() {
            return Ok(Vec::new());
        }

        let hypotheses: Vec<String> = candidate_labels
            .iter()
            .map(|label| HYPOTHESIS_TEMPLATE.replace("{}", label))
            .collect();
        let pairs: Vec<(&str, &str)> = hypotheses.iter().map(|h| (text, h.as_str())).collect();
        let encodings = self
            .tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| anyhow!("Tokenizer encode error: {e}"))?;

        let batch = encodings.len();
        let seq_len = encodings.first().map(|e| e.len()).unwrap_or(0);
        let mut all_ids = Vec::with_capacity(batch * seq_len);
        let mut all_mask = Vec::with_capacity(batch * seq_len);
        for enc in &encodings {
            all_ids.extend_from_slice(enc.get_ids());
            all_mask.extend_from_slice(enc.get_attention_mask());
        }

        let input_ids = Tensor::from_vec(all_ids, (batch, seq_len), &self.device)?;
        let attention_mask = Tensor::from_vec(all_mask, (batch, seq_len), &self.device)?;
        let squashed = self.model.forward(&input_ids, &attention_mask)?;
        let entailment: Vec<f32> = squashed
            .i((.., self.entailment_id))?
            .to_dtype(DType::F32)?
            .to_vec1::<f32>()?
            .into_iter()
            .map(inverse_sigmoid)
            .collect();

        Ok(rank_by_entailment(candidate_labels, &entailment))
    }
}

impl Classifier for ZeroShotClassifier {
    fn name(&self) -> &str {
        "backup"
    }

    fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let ranked = self.scores(text, CANDIDATE_LABELS)?;
        let (label, score) = ranked
            .first()
            .ok_or_else(|| SentigateError::EmptyOutput(self.name().to_string()))?;
        debug!(?ranked, "backup prediction");
        let label: Label = label.parse()?;
        Ok(ClassificationResult::new(label, score.clamp(0.0, 1.0))?)
    }
}

fn resolve_files(model: &str) -> Result<ModelFiles> {
    let local = Path::new(model);
    if local.is_dir() {
        let weights = snapshot::find_model_weights(local)
            .ok_or_else(|| anyhow!("no model weights found under {}", local.display()))?;
        return Ok(ModelFiles {
            config: local.join("config.json"),
            tokenizer: local.join("tokenizer.json"),
            weights,
        });
    }

    let api = Api::new().context("failed to initialize Hugging Face API")?;
    let repo = api.repo(Repo::new(model.to_string(), RepoType::Model));
    let fetch = |file: &str| {
        repo.get(file)
            .with_context(|| format!("failed to fetch {file} from {model}"))
    };
    let weights = fetch("model.safetensors")
        .or_else(|_| fetch("pytorch_model.bin"))
        .map(ModelWeights::at)?;
    Ok(ModelFiles {
        config: fetch("config.json")?,
        tokenizer: fetch("tokenizer.json")?,
        weights,
    })
}

fn entailment_index(tables: &LabelTables) -> Result<usize> {
    if let Some(id) = tables
        .label2id
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case("entailment"))
        .map(|(_, id)| *id as usize)
    {
        return Ok(id);
    }
    tables
        .id2label
        .iter()
        .find(|(_, name)| name.eq_ignore_ascii_case("entailment"))
        .and_then(|(id, _)| id.parse::<usize>().ok())
        .ok_or_else(|| {
            anyhow!(
                "checkpoint has no 'entailment' class; labels: {}",
                tables.id2label.values().cloned().collect::<Vec<_>>().join(", ")
            )
        })
}

/// Candle only sizes the classifier head from `classifier_config`, which many
/// NLI checkpoints leave out.
fn patch_classifier_config(config: &mut Config, tables: &LabelTables) {
    let num_labels = tables.label2id.len().max(tables.id2label.len());
    let current = config
        .classifier_config
        .as_ref()
        .map(|c| c.id2label.len())
        .unwrap_or(0);
    if current == num_labels {
        return;
    }
    let id2label: HashMap<String, String> = (0..num_labels)
        .map(|i| {
            let name = tables
                .id2label
                .get(&i.to_string())
                .cloned()
                .unwrap_or_else(|| format!("label_{i}"));
            (i.to_string(), name)
        })
        .collect();
    let label2id = id2label
        .iter()
        .map(|(k, v)| (v.clone(), k.clone()))
        .collect();
    config.classifier_config = Some(ClassifierConfig {
        id2label,
        label2id,
        classifier_pooling: ClassifierPooling::default(),
    });
}

/// Review and hypothesis are encoded as one pair, padded to the longest in the
/// batch. Only the review is cut when the pair is too long.
fn prepare_pair_tokenizer(tokenizer: &mut Tokenizer, max_len: usize) -> Result<()> {
    let (pad_id, pad_token) = ["[PAD]", "<pad>"]
        .into_iter()
        .find_map(|token| tokenizer.token_to_id(token).map(|id| (id, token.to_string())))
        .unwrap_or_else(|| (0, "[PAD]".to_string()));
    tokenizer.with_padding(Some(PaddingParams {
        pad_id,
        pad_token,
        ..Default::default()
    }));
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_len,
            strategy: TruncationStrategy::OnlyFirst,
            ..Default::default()
        }))
        .map_err(|e| anyhow!("invalid truncation for max_len {max_len}: {e}"))?;
    Ok(())
}

/// Candle's sequence-classification head ends in a sigmoid; this recovers the logit.
fn inverse_sigmoid(p: f32) -> f32 {
    let p = p.clamp(1e-7, 1.0 - 1e-7);
    (p / (1.0 - p)).ln()
}

/// Softmax of the raw entailment logits across the candidates, highest first.
fn rank_by_entailment(labels: &[&str], entailment_logits: &[f32]) -> Vec<(String, f32)> {
    let max = entailment_logits
        .iter()
        .copied()
        .fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = entailment_logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();
    let mut ranked: Vec<(String, f32)> = labels
        .iter()
        .zip(exps)
        .map(|(label, e)| (label.to_string(), e / sum))
        .collect();
    ranked.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ranked
}
