use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use candle::{DType, Device, IndexOp, Module, Tensor};
use candle_nn::{Linear, VarBuilder};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{Config as RobertaConfig, XLMRobertaModel};
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info};

use super::snapshot::{self, LabelTables};
use super::{logits_argmax, ClassificationResult, Classifier, Label};

/// The fine-tuned sentiment model, loaded from a local snapshot directory.
pub struct SentimentClassifier {
    encoder: Encoder,
    head: Head,
    tokenizer: Tokenizer,
    device: Device,
    id2label: Vec<String>,
}

enum Encoder {
    Bert(BertModel),
    Roberta(XLMRobertaModel),
}

/// `BertForSequenceClassification` pools the CLS token before the classifier,
/// `RobertaForSequenceClassification` runs its own dense+tanh head instead.
enum Head {
    Pooled { pooler: Linear, classifier: Linear },
    Roberta { dense: Linear, out_proj: Linear },
}

impl SentimentClassifier {
    pub fn load(snapshot: impl Into<PathBuf>, device: Device, max_len: usize) -> Result<Self> {
        let snapshot = snapshot.into();
        let raw_config = snapshot::read_config_json(&snapshot)?;
        let tables: LabelTables = serde_json::from_str(&raw_config)
            .with_context(|| format!("failed to parse {}/config.json", snapshot.display()))?;
        let id2label = ordered_labels(&tables)?;

        let weights = snapshot::find_model_weights(&snapshot)
            .ok_or_else(|| anyhow!("no model weights found under {}", snapshot.display()))?;
        let vb = weights.var_builder(&device)?;

        let model_type = tables.model_type.as_deref().unwrap_or("bert");
        let num_labels = id2label.len();
        let (encoder, head, max_positions) = match model_type {
            "bert" => load_bert(&raw_config, &vb, num_labels)?,
            "roberta" | "xlm-roberta" => load_roberta(&raw_config, &vb, num_labels)?,
            other => bail!(
                "unsupported model_type '{other}' in {}; expected bert or roberta",
                snapshot.display()
            ),
        };

        let max_len = max_len.min(max_positions);
        let mut tokenizer = snapshot::load_tokenizer(&snapshot.join("tokenizer.json"))?;
        limit_length(&mut tokenizer, max_len)?;

        info!(
            snapshot = %snapshot.display(),
            model_type,
            num_labels,
            max_len,
            "primary sentiment model loaded"
        );

        Ok(Self {
            encoder,
            head,
            tokenizer,
            device,
            id2label,
        })
    }

    fn logits(&self, text: &str) -> Result<Vec<f32>> {
        let ids = encode_ids(&self.tokenizer, text)?;
        let seq_len = ids.len();

        let input = Tensor::new(ids.as_slice(), &self.device)?.unsqueeze(0)?;
        let mask = Tensor::ones((1, seq_len), DType::U32, &self.device)?;
        let token_type_ids = Tensor::zeros((1, seq_len), DType::U32, &self.device)?;

        let hidden = match &self.encoder {
            Encoder::Bert(model) => model.forward(&input, &token_type_ids, Some(&mask))?,
            Encoder::Roberta(model) => {
                model.forward(&input, &mask, &token_type_ids, None, None, None)?
            }
        };
        let cls = hidden.i((.., 0))?;

        let logits = match &self.head {
            Head::Pooled { pooler, classifier } => {
                classifier.forward(&pooler.forward(&cls)?.tanh()?)?
            }
            Head::Roberta { dense, out_proj } => out_proj.forward(&dense.forward(&cls)?.tanh()?)?,
        };
        let probs = candle_nn::ops::softmax_last_dim(&logits)?;
        Ok(probs.squeeze(0)?.to_dtype(DType::F32)?.to_vec1::<f32>()?)
    }
}

impl Classifier for SentimentClassifier {
    fn name(&self) -> &str {
        "primary"
    }

    fn classify(&self, text: &str) -> Result<ClassificationResult> {
        let probs = self.logits(text)?;
        let (idx, confidence) = logits_argmax(&probs)?;
        let raw_label = self
            .id2label
            .get(idx)
            .ok_or_else(|| anyhow!("predicted class {idx} has no label"))?;
        let label = Label::from_model_label(raw_label)?;
        debug!(raw_label = %raw_label, %label, confidence, "primary prediction");
        Ok(ClassificationResult::new(label, confidence.clamp(0.0, 1.0))?)
    }
}

/// Single sequences only, so padding is off; truncation keeps the closing special token.
fn limit_length(tokenizer: &mut Tokenizer, max_len: usize) -> Result<()> {
    tokenizer.with_padding(None);
    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length: max_len,
            ..Default::default()
        }))
        .map_err(|e| anyhow!("invalid truncation for max_len {max_len}: {e}"))?;
    Ok(())
}

fn encode_ids(tokenizer: &Tokenizer, text: &str) -> Result<Vec<u32>> {
    let enc = tokenizer
        .encode(text, true)
        .map_err(|e| anyhow!("Tokenizer encode error: {e}"))?;
    if enc.get_ids().is_empty() {
        bail!("tokenizer produced no tokens");
    }
    Ok(enc.get_ids().to_vec())
}

/// Labels indexed by class id; missing tables default to `LABEL_0`, `LABEL_1`.
fn ordered_labels(tables: &LabelTables) -> Result<Vec<String>> {
    if tables.id2label.is_empty() {
        return Ok(vec!["LABEL_0".into(), "LABEL_1".into()]);
    }
    let mut pairs = tables
        .id2label
        .iter()
        .map(|(id, label)| {
            id.parse::<usize>()
                .map(|id| (id, label.clone()))
                .map_err(|_| anyhow!("non-numeric id2label key '{id}'"))
        })
        .collect::<Result<Vec<_>>>()?;
    pairs.sort_by_key(|(id, _)| *id);
    for (expected, (id, _)) in pairs.iter().enumerate() {
        if *id != expected {
            bail!("id2label is not contiguous: missing class {expected}");
        }
    }
    let labels: Vec<String> = pairs.into_iter().map(|(_, label)| label).collect();
    for label in &labels {
        Label::from_model_label(label)
            .with_context(|| format!("checkpoint label '{label}' is not binary sentiment"))?;
    }
    Ok(labels)
}

fn load_bert(raw_config: &str, vb: &VarBuilder, num_labels: usize) -> Result<(Encoder, Head, usize)> {
    let config: BertConfig = serde_json::from_str(raw_config).context("invalid BERT config")?;
    let prefix = if vb.contains_tensor("bert.embeddings.word_embeddings.weight") {
        "bert"
    } else {
        ""
    };
    let base = if prefix.is_empty() { vb.clone() } else { vb.pp(prefix) };
    let model = BertModel::load(base.clone(), &config)?;
    let pooler = candle_nn::linear(config.hidden_size, config.hidden_size, base.pp("pooler.dense"))?;
    let classifier = candle_nn::linear(config.hidden_size, num_labels, vb.pp("classifier"))?;
    Ok((
        Encoder::Bert(model),
        Head::Pooled { pooler, classifier },
        config.max_position_embeddings,
    ))
}

fn load_roberta(
    raw_config: &str,
    vb: &VarBuilder,
    num_labels: usize,
) -> Result<(Encoder, Head, usize)> {
    let config: RobertaConfig = serde_json::from_str(raw_config).context("invalid RoBERTa config")?;
    let model = XLMRobertaModel::new(&config, vb.pp("roberta"))?;
    let dense = candle_nn::linear(config.hidden_size, config.hidden_size, vb.pp("classifier.dense"))?;
    let out_proj = candle_nn::linear(config.hidden_size, num_labels, vb.pp("classifier.out_proj"))?;
    // RoBERTa reserves the first two positions for padding offsets.
    let max_positions = config.max_position_embeddings.saturating_sub(2).max(16);
    Ok((
        Encoder::Roberta(model),
        Head::Roberta { dense, out_proj },
        max_positions,
    ))
}
