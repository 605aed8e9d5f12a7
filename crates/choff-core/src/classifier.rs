//! Keyword-scoring classifier over the two CHOFF taxonomies.
//!
//! For each taxonomy the text is lower-cased and every label is scored by
//! how many of its keywords occur as substrings. The label with the
//! strictly highest score wins. Zero matches, or a tie for the top score,
//! fall back to the taxonomy's default label (`observation` for content,
//! `direct` for insight).
//!
//! Taxonomies are plain data built once at startup and shared by reference.

use std::collections::HashMap;

use crate::models::{Classification, ContentType, InsightType};

/// A fixed label set with the keyword substrings that vote for each label.
#[derive(Debug, Clone)]
pub struct Taxonomy<L> {
    default: L,
    entries: Vec<(L, Vec<String>)>,
}

impl<L: Copy + PartialEq> Taxonomy<L> {
    pub fn new(default: L, entries: Vec<(L, Vec<String>)>) -> Self {
        Self { default, entries }
    }

    pub fn default_label(&self) -> L {
        self.default
    }

    pub fn keywords(&self, label: L) -> &[String] {
        self.entries
            .iter()
            .find(|(l, _)| *l == label)
            .map(|(_, k)| k.as_slice())
            .unwrap_or(&[])
    }

    /// Replace the keywords of the labels present in `overrides`.
    /// Labels without an override keep their current keywords.
    pub fn with_overrides(mut self, overrides: &HashMap<L, Vec<String>>) -> Self
    where
        L: std::hash::Hash + Eq,
    {
        for (label, keywords) in overrides {
            let lowered: Vec<String> = keywords.iter().map(|k| k.to_lowercase()).collect();
            match self.entries.iter_mut().find(|(l, _)| l == label) {
                Some(entry) => entry.1 = lowered,
                None => self.entries.push((*label, lowered)),
            }
        }
        self
    }

    /// Pick the label for already lower-cased text.
    fn label_for(&self, lowered: &str) -> L {
        let mut best = self.default;
        let mut best_score = 0usize;
        let mut tied = false;

        for (label, keywords) in &self.entries {
            let score = keywords
                .iter()
                .filter(|k| lowered.contains(k.as_str()))
                .count();
            if score > best_score {
                best = *label;
                best_score = score;
                tied = false;
            } else if score == best_score && score > 0 {
                tied = true;
            }
        }

        if best_score == 0 || tied {
            self.default
        } else {
            best
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for Taxonomy<ContentType> {
    fn default() -> Self {
        Taxonomy::new(
            ContentType::Observation,
            vec![
                (
                    ContentType::Observation,
                    words(&["observe", "notice", "see", "witness", "watch"]),
                ),
                (
                    ContentType::Analysis,
                    words(&["analyze", "examine", "study", "investigate", "assess", "evaluate"]),
                ),
                (
                    ContentType::Theory,
                    words(&["theory", "theorize", "propose", "hypothesize", "suggest", "postulate"]),
                ),
                (
                    ContentType::Procedure,
                    words(&["step", "method", "process", "procedure", "approach"]),
                ),
                (
                    ContentType::CaseStudy,
                    words(&["example", "instance", "case", "scenario", "situation"]),
                ),
            ],
        )
    }
}

impl Default for Taxonomy<InsightType> {
    fn default() -> Self {
        Taxonomy::new(
            InsightType::Direct,
            vec![
                (
                    InsightType::Direct,
                    words(&["immediate", "obvious", "clear", "evident", "apparent"]),
                ),
                (
                    InsightType::Emergent,
                    words(&["pattern", "develop", "arise", "emerge", "evolve", "form"]),
                ),
                (
                    InsightType::Collective,
                    words(&["shared", "group", "common", "mutual", "collective"]),
                ),
                (
                    InsightType::Meta,
                    words(&["self", "recursive", "reflect", "meta", "about"]),
                ),
                (
                    InsightType::Practical,
                    words(&["implement", "apply", "use", "practice", "do"]),
                ),
            ],
        )
    }
}

/// Stateless classifier assigning a content type and an insight type.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    content: Taxonomy<ContentType>,
    insight: Taxonomy<InsightType>,
}

impl Classifier {
    pub fn new(content: Taxonomy<ContentType>, insight: Taxonomy<InsightType>) -> Self {
        Self { content, insight }
    }

    /// Classify `text`. Total: every input, including the empty string,
    /// yields one label from each taxonomy.
    pub fn classify(&self, text: &str) -> Classification {
        let lowered = text.to_lowercase();
        Classification {
            content_type: self.content.label_for(&lowered),
            insight_type: self.insight.label_for(&lowered),
        }
    }
}
