//! C3 — KeywordRanker: text → score vector, plus prefix autocomplete.

use crate::feature_store::FeatureStore;
use crate::query::Keyword;

/// `keyword x d'` projection matrix, bias vector, and PCA parameters that
/// turn a bag of known keyword rows into a final `d`-dim query vector.
pub struct KeywordRanker {
    keywords: Vec<Keyword>,
    /// `keyword_id -> row` in the `d'`-dim pre-projection space.
    rows: Vec<Vec<f32>>,
    bias: Vec<f32>,
    pca_mean: Vec<f32>,
    /// `d x d'` row-major PCA matrix.
    pca_matrix: Vec<Vec<f32>>,
    operator_token: String,
    /// lower-cased synset strings, index-aligned with `keywords`, to make
    /// autocomplete case-insensitive without re-lowering on every call.
    lower_synsets: Vec<Vec<String>>,
}

impl KeywordRanker {
    pub fn new(
        keywords: Vec<Keyword>,
        rows: Vec<Vec<f32>>,
        bias: Vec<f32>,
        pca_mean: Vec<f32>,
        pca_matrix: Vec<Vec<f32>>,
        operator_token: impl Into<String>,
    ) -> Self {
        let lower_synsets = keywords
            .iter()
            .map(|k| k.synset_strs.iter().map(|s| s.to_lowercase()).collect())
            .collect();
        Self {
            keywords,
            rows,
            bias,
            pca_mean,
            pca_matrix,
            operator_token: operator_token.into(),
            lower_synsets,
        }
    }

    fn find_keyword_id(&self, word: &str) -> Option<usize> {
        let word = word.to_lowercase();
        self.lower_synsets
            .iter()
            .position(|strs| strs.iter().any(|s| s == &word))
    }

    /// Splits on whitespace and the configurable operator token into a flat
    /// list of candidate words; unknown tokens are dropped.
    fn tokenize(&self, text: &str) -> Vec<usize> {
        text.split_whitespace()
            .flat_map(|piece| piece.split(self.operator_token.as_str()))
            .map(str::trim)
            .filter(|w| !w.is_empty())
            .filter_map(|w| self.find_keyword_id(w))
            .collect()
    }

    /// Produces the `d`-dim query vector for `text`, or `None` if no token
    /// resolved (the caller treats that as a no-op on the moment).
    pub fn embed(&self, text: &str) -> Option<Vec<f32>> {
        let ids = self.tokenize(text);
        if ids.is_empty() {
            return None;
        }

        let dprime = self.bias.len();
        let mut summed = vec![0.0f32; dprime];
        for id in ids {
            for (i, v) in self.rows[id].iter().enumerate() {
                summed[i] += v;
            }
        }
        for (i, b) in self.bias.iter().enumerate() {
            summed[i] += b;
        }
        for v in summed.iter_mut() {
            *v = v.tanh();
        }

        let centered: Vec<f32> = summed
            .iter()
            .zip(&self.pca_mean)
            .map(|(v, m)| v - m)
            .collect();

        let projected: Vec<f32> = self
            .pca_matrix
            .iter()
            .map(|row| row.iter().zip(&centered).map(|(a, b)| a * b).sum())
            .collect();

        let norm = projected.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm == 0.0 {
            Some(projected)
        } else {
            Some(projected.into_iter().map(|x| x / norm).collect())
        }
    }

    /// Scores every frame in `feature_store` against `text`'s embedding.
    /// Returns `None` (a no-op on this moment) if no token resolved.
    pub fn score(&self, feature_store: &FeatureStore, text: &str, out_inv_scores: &mut [f32]) -> bool {
        match self.embed(text) {
            Some(vec) => {
                feature_store.score_vs(feature_store.primary(), &vec, out_inv_scores);
                true
            }
            None => false,
        }
    }

    /// Case-insensitive prefix match against every synset string. Returns up
    /// to `k` distinct keyword IDs ordered by (a) shortest matching string
    /// length ascending, (b) keyword ID ascending.
    pub fn find(&self, prefix: &str, k: usize) -> Vec<u32> {
        if prefix.is_empty() || k == 0 {
            return Vec::new();
        }
        let prefix = prefix.to_lowercase();

        let mut matches: Vec<(usize, usize, u32)> = Vec::new(); // (min_len, keyword_index, id)
        for (idx, strs) in self.lower_synsets.iter().enumerate() {
            if let Some(min_len) = strs
                .iter()
                .filter(|s| s.starts_with(&prefix))
                .map(|s| s.len())
                .min()
            {
                matches.push((min_len, idx, self.keywords[idx].synset_id));
            }
        }

        matches.sort_by(|a, b| a.0.cmp(&b.0).then(a.2.cmp(&b.2)));
        matches.into_iter().take(k).map(|(_, _, id)| id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ranker() -> KeywordRanker {
        KeywordRanker::new(
            vec![
                Keyword { synset_id: 44, synset_strs: vec!["cat".into(), "kitten".into()] },
                Keyword { synset_id: 7, synset_strs: vec!["catalog".into()] },
                Keyword { synset_id: 99, synset_strs: vec!["dog".into()] },
            ],
            vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]],
            vec![0.0, 0.0],
            vec![0.0, 0.0],
            vec![vec![1.0, 0.0], vec![0.0, 1.0]],
            "+",
        )
    }

    #[test]
    fn unknown_query_yields_no_embedding() {
        assert!(ranker().embed("xyzzy").is_none());
    }

    #[test]
    fn known_query_embeds() {
        assert!(ranker().embed("cat").is_some());
    }

    #[test]
    fn operator_token_splits_groups() {
        let r = ranker();
        assert!(r.embed("cat+dog").is_some());
    }

    #[test]
    fn autocomplete_orders_by_length_then_id() {
        let r = ranker();
        let result = r.find("cat", 10);
        assert_eq!(result, vec![44, 7]);
    }

    #[test]
    fn autocomplete_empty_prefix_or_zero_count_is_empty() {
        let r = ranker();
        assert!(r.find("", 10).is_empty());
        assert!(r.find("cat", 0).is_empty());
    }

    #[test]
    fn autocomplete_no_match_is_empty() {
        assert!(ranker().find("iax", 10).is_empty());
    }
}
