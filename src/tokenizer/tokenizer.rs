use regex::Regex;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::config::TokenizerConfig;

/// Unicode word runs: letters, digits and connector punctuation.
const WORD_PATTERN: &str = r"\w+";

fn word_regex() -> &'static Regex {
    static WORDS: OnceLock<Regex> = OnceLock::new();
    WORDS.get_or_init(|| Regex::new(WORD_PATTERN).expect("word pattern is valid"))
}

/// Text tokenizer shared by index construction and query evaluation.
///
/// Both sides must tokenize through the same configuration, otherwise query
/// terms will not resolve against the vocabulary.
#[derive(Clone, Debug)]
pub struct Tokenizer {
    config: TokenizerConfig,
}

impl Default for Tokenizer {
    fn default() -> Self {
        Self::new(&TokenizerConfig::default())
    }
}

impl Tokenizer {
    /// Create a new tokenizer from configuration
    pub fn new(config: &TokenizerConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }

    pub fn config(&self) -> &TokenizerConfig {
        &self.config
    }

    /// Tokenize text into an ordered vector of terms
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let normalized = if self.config.lowercase {
            text.to_lowercase()
        } else {
            text.to_string()
        };

        word_regex()
            .find_iter(&normalized)
            .map(|m| m.as_str())
            .filter(|token| {
                let len = token.chars().count();
                len >= self.config.min_token_length && len <= self.config.max_token_length
            })
            .map(str::to_string)
            .collect()
    }

    /// Distinct terms in first-seen order, each with its in-document count
    pub fn counted_terms(&self, text: &str) -> Vec<(String, u32)> {
        let mut order: Vec<(String, u32)> = Vec::new();
        let mut slots: HashMap<String, usize> = HashMap::new();
        for token in self.tokenize(text) {
            match slots.get(&token) {
                Some(&slot) => order[slot].1 += 1,
                None => {
                    slots.insert(token.clone(), order.len());
                    order.push((token, 1));
                }
            }
        }
        order
    }
}
