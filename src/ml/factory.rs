// ============================================================
// Layer 5 — Model Factory
// ============================================================
// Turns the component names from a training configuration into
// a wired Tree2Seq model. Names are checked against small
// registries up front so a typo fails before any shard is read,
// and the resolved configuration is persisted next to the
// checkpoints so an evaluation run can rebuild the exact same
// architecture without the training config.

use std::path::Path;

use burn::prelude::*;
use serde::{Deserialize, Serialize};

use crate::domain::error::Tree2SeqError;
use crate::domain::vocabulary::Vocabulary;
use crate::ml::attention::LuongConcatAttentionConfig;
use crate::ml::decoder::LabelDecoderConfig;
use crate::ml::embedding::FullTokenEmbeddingConfig;
use crate::ml::encoder::TreeLstmConfig;
use crate::ml::model::Tree2Seq;

pub const EMBEDDINGS: &[&str] = &["FullTokenEmbedding"];
pub const ENCODERS:   &[&str] = &["TreeLSTM"];
pub const DECODERS:   &[&str] = &["LinearDecoder", "LSTMDecoder", "LSTMAttentionDecoder"];
pub const ATTENTIONS: &[&str] = &["LuongConcatAttention"];

const LINEAR_DECODER:    &str = "LinearDecoder";
const ATTENTION_DECODER: &str = "LSTMAttentionDecoder";

/// A component choice from the configuration file. Only the
/// attention decoder carries a nested choice.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentSpec {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attention: Option<Box<ComponentSpec>>,
}

impl ComponentSpec {
    pub fn plain(name: &str) -> Self {
        ComponentSpec { name: name.to_string(), attention: None }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HiddenStates {
    pub embedding: usize,
    pub encoder:   usize,
    pub decoder:   usize,
}

/// Vocabulary sizes frozen into the saved configuration, so a
/// later run never needs the vocabulary file to size the model.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct VocabularySizes {
    pub tokens: usize,
    pub types:  usize,
    pub labels: usize,
}

impl From<&Vocabulary> for VocabularySizes {
    fn from(vocabulary: &Vocabulary) -> Self {
        VocabularySizes {
            tokens: vocabulary.token_count(),
            types:  vocabulary.type_count(),
            labels: vocabulary.label_count(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfiguration {
    pub embedding: ComponentSpec,
    pub encoder:   ComponentSpec,
    pub decoder:   ComponentSpec,
    pub hidden_states: HiddenStates,
    pub vocabulary:    VocabularySizes,
}

#[derive(Debug)]
pub struct ModelFactory {
    configuration:  ModelConfiguration,
    uses_attention: bool,
}

impl ModelFactory {
    pub fn new(
        embedding: ComponentSpec,
        encoder: ComponentSpec,
        decoder: ComponentSpec,
        hidden_states: HiddenStates,
        vocabulary: VocabularySizes,
    ) -> Result<Self, Tree2SeqError> {
        Self::from_configuration(ModelConfiguration {
            embedding,
            encoder,
            decoder,
            hidden_states,
            vocabulary,
        })
    }

    /// Validate a configuration (fresh or reloaded) and bind it.
    pub fn from_configuration(
        configuration: ModelConfiguration,
    ) -> Result<Self, Tree2SeqError> {
        validate_name("embedding", &configuration.embedding.name, EMBEDDINGS)?;
        validate_name("encoder", &configuration.encoder.name, ENCODERS)?;
        validate_name("decoder", &configuration.decoder.name, DECODERS)?;

        let uses_attention = configuration.decoder.name == ATTENTION_DECODER;
        match (&configuration.decoder.attention, uses_attention) {
            (Some(attention), true) => {
                validate_name("attention", &attention.name, ATTENTIONS)?
            }
            (None, true) => {
                return Err(Tree2SeqError::Configuration(format!(
                    "decoder '{ATTENTION_DECODER}' requires an attention component"
                )))
            }
            (Some(_), false) => {
                return Err(Tree2SeqError::Configuration(format!(
                    "decoder '{}' does not take an attention component",
                    configuration.decoder.name
                )))
            }
            (None, false) => {}
        }

        // The decoder is seeded straight from the encoder's root
        // states, so the two hidden sizes cannot differ.
        if configuration.hidden_states.encoder != configuration.hidden_states.decoder {
            return Err(Tree2SeqError::Configuration(format!(
                "encoder hidden size {} must match decoder hidden size {}",
                configuration.hidden_states.encoder, configuration.hidden_states.decoder
            )));
        }

        Ok(ModelFactory { configuration, uses_attention })
    }

    pub fn configuration(&self) -> &ModelConfiguration {
        &self.configuration
    }

    /// Persist the resolved configuration as JSON.
    pub fn save_configuration(&self, path: &Path) -> Result<(), Tree2SeqError> {
        let serialized =
            serde_json::to_string_pretty(&self.configuration).map_err(|e| {
                Tree2SeqError::Configuration(format!("cannot serialize model configuration: {e}"))
            })?;
        std::fs::write(path, serialized).map_err(|e| {
            Tree2SeqError::Configuration(format!(
                "cannot write model configuration '{}': {e}",
                path.display()
            ))
        })
    }

    pub fn construct_model<B: Backend>(&self, device: &B::Device) -> Tree2Seq<B> {
        let hidden = &self.configuration.hidden_states;
        let sizes = &self.configuration.vocabulary;

        let attention = self
            .uses_attention
            .then(|| LuongConcatAttentionConfig::new(hidden.decoder).init(device));
        let recurrent = self.configuration.decoder.name != LINEAR_DECODER;

        Tree2Seq {
            embedding: FullTokenEmbeddingConfig::new(sizes.tokens, sizes.types, hidden.embedding)
                .init(device),
            encoder: TreeLstmConfig::new(hidden.embedding, hidden.encoder).init(device),
            decoder: LabelDecoderConfig::new(sizes.labels, hidden.embedding, hidden.decoder)
                .with_recurrent(recurrent)
                .init(attention, device),
        }
    }
}

fn validate_name(
    kind: &'static str,
    name: &str,
    registry: &'static [&'static str],
) -> Result<(), Tree2SeqError> {
    if registry.contains(&name) {
        Ok(())
    } else {
        Err(Tree2SeqError::UnknownComponent {
            kind,
            name: name.to_string(),
            valid: registry.to_vec(),
        })
    }
}
