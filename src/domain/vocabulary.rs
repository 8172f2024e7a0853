// ============================================================
// Layer 3 — Vocabulary
// ============================================================
// Three mappings consumed once at startup: token → id,
// node-type → id, label → id. The file is produced by the data
// preparation pipeline; this core only reads it.
//
// The label map must carry the sequence-framing specials
// (<SOS>, <EOS>, <PAD>, <UNK>): the batcher wraps every label
// sequence as SOS … EOS PAD… and the loss ignores PAD, so a
// vocabulary without them cannot drive training at all — that
// is a Configuration error at load time, not a runtime surprise.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::error::Tree2SeqError;

pub const SOS: &str = "<SOS>";
pub const EOS: &str = "<EOS>";
pub const PAD: &str = "<PAD>";
pub const UNK: &str = "<UNK>";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vocabulary {
    pub token_to_id: HashMap<String, u32>,
    pub type_to_id:  HashMap<String, u32>,
    pub label_to_id: HashMap<String, u32>,
}

/// The special label ids the batcher needs to frame a sequence.
#[derive(Debug, Clone, Copy)]
pub struct LabelFraming {
    pub sos: u32,
    pub eos: u32,
    pub pad: u32,
}

impl Vocabulary {
    /// Read and validate a vocabulary JSON file.
    pub fn load(path: &Path) -> Result<Self, Tree2SeqError> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Tree2SeqError::Configuration(format!(
                "cannot read vocabulary '{}': {e}",
                path.display()
            ))
        })?;
        let vocabulary: Vocabulary = serde_json::from_str(&raw).map_err(|e| {
            Tree2SeqError::Configuration(format!(
                "malformed vocabulary '{}': {e}",
                path.display()
            ))
        })?;
        vocabulary.label_framing()?;
        Ok(vocabulary)
    }

    /// Resolve the framing specials from the label map.
    pub fn label_framing(&self) -> Result<LabelFraming, Tree2SeqError> {
        Ok(LabelFraming {
            sos: self.special_label(SOS)?,
            eos: self.special_label(EOS)?,
            pad: self.special_label(PAD)?,
        })
    }

    fn special_label(&self, name: &str) -> Result<u32, Tree2SeqError> {
        self.label_to_id.get(name).copied().ok_or_else(|| {
            Tree2SeqError::Configuration(format!(
                "label vocabulary is missing the special token '{name}'"
            ))
        })
    }

    pub fn token_count(&self) -> usize {
        self.token_to_id.len()
    }

    pub fn type_count(&self) -> usize {
        self.type_to_id.len()
    }

    pub fn label_count(&self) -> usize {
        self.label_to_id.len()
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;

    fn sample_vocabulary() -> Vocabulary {
        let specials = [(SOS, 0u32), (EOS, 1), (PAD, 2), (UNK, 3)];
        Vocabulary {
            token_to_id: HashMap::from([("x".to_string(), 0), ("y".to_string(), 1)]),
            type_to_id:  HashMap::from([("Block".to_string(), 0)]),
            label_to_id: specials
                .iter()
                .map(|&(name, id)| (name.to_string(), id))
                .chain([("get".to_string(), 4), ("value".to_string(), 5)])
                .collect(),
        }
    }

    #[test]
    fn test_label_framing_resolves_specials() {
        let framing = sample_vocabulary().label_framing().unwrap();
        assert_eq!(framing.sos, 0);
        assert_eq!(framing.eos, 1);
        assert_eq!(framing.pad, 2);
    }

    #[test]
    fn test_missing_special_is_a_configuration_error() {
        let mut vocabulary = sample_vocabulary();
        vocabulary.label_to_id.remove(PAD);
        let err = vocabulary.label_framing().unwrap_err();
        assert!(matches!(err, Tree2SeqError::Configuration(_)));
        assert!(err.to_string().contains(PAD));
    }
}
