//! Per-model price table for request cost estimation (spec §4.8), loaded
//! once at startup. Prices are USD per 1,000 tokens.

use std::collections::HashMap;

#[derive(Debug, Clone, Copy)]
pub struct ModelPrice {
    pub prompt_per_1k: f64,
    pub completion_per_1k: f64,
}

pub struct CostTable {
    prices: HashMap<String, ModelPrice>,
    /// Used for models absent from `prices` so an unrecognized model still
    /// produces a (conservative) non-zero estimate rather than silently
    /// under-billing.
    fallback: ModelPrice,
}

impl CostTable {
    pub fn new(prices: HashMap<String, ModelPrice>) -> Self {
        Self {
            prices,
            fallback: ModelPrice { prompt_per_1k: 0.01, completion_per_1k: 0.03 },
        }
    }

    pub fn estimate(&self, model: &str, prompt_tokens: i64, completion_tokens: i64) -> f64 {
        let price = self.prices.get(model).copied().unwrap_or(self.fallback);
        (prompt_tokens as f64 / 1000.0) * price.prompt_per_1k
            + (completion_tokens as f64 / 1000.0) * price.completion_per_1k
    }
}

impl Default for CostTable {
    fn default() -> Self {
        let mut prices = HashMap::new();
        prices.insert(
            "gpt-4o".to_string(),
            ModelPrice { prompt_per_1k: 0.0025, completion_per_1k: 0.01 },
        );
        prices.insert(
            "gpt-4o-mini".to_string(),
            ModelPrice { prompt_per_1k: 0.00015, completion_per_1k: 0.0006 },
        );
        prices.insert(
            "claude-3-5-sonnet".to_string(),
            ModelPrice { prompt_per_1k: 0.003, completion_per_1k: 0.015 },
        );
        prices.insert(
            "claude-3-5-haiku".to_string(),
            ModelPrice { prompt_per_1k: 0.0008, completion_per_1k: 0.004 },
        );
        prices.insert(
            "text-embedding-3-small".to_string(),
            ModelPrice { prompt_per_1k: 0.00002, completion_per_1k: 0.0 },
        );
        prices.insert(
            "text-embedding-3-large".to_string(),
            ModelPrice { prompt_per_1k: 0.00013, completion_per_1k: 0.0 },
        );
        Self::new(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_model_uses_its_own_price() {
        let table = CostTable::default();
        let cost = table.estimate("gpt-4o-mini", 1000, 500);
        assert!((cost - (0.00015 + 0.0003)).abs() < 1e-9);
    }

    #[test]
    fn unknown_model_uses_fallback_price() {
        let table = CostTable::default();
        let cost = table.estimate("some-new-model", 1000, 0);
        assert!(cost > 0.0);
    }
}
