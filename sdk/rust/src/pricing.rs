//! Model price table and cost calculation
//!
//! Prices are cents per one million tokens. Lookups try the exact model name
//! first, then the alias table. Unknown models have no cost.

use std::collections::HashMap;
use std::sync::LazyLock;

const TOKENS_PER_UNIT: f64 = 1_000_000.0;

/// Per-model token pricing in cents per 1M tokens
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelPricing {
    pub input_cents_per_1m: f64,
    pub output_cents_per_1m: f64,
}

impl ModelPricing {
    const fn new(input_cents_per_1m: f64, output_cents_per_1m: f64) -> Self {
        Self {
            input_cents_per_1m,
            output_cents_per_1m,
        }
    }

    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        let input = input_tokens as f64 * self.input_cents_per_1m / TOKENS_PER_UNIT;
        let output = output_tokens as f64 * self.output_cents_per_1m / TOKENS_PER_UNIT;
        input + output
    }
}

/// How a model name resolved against the table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchType {
    Exact,
    Alias,
    NotFound,
}

// Last updated January 2025
const MODEL_PRICES: &[(&str, ModelPricing)] = &[
    // OpenAI
    ("gpt-4o", ModelPricing::new(250.0, 1000.0)),
    ("gpt-4o-mini", ModelPricing::new(15.0, 60.0)),
    ("gpt-4-turbo", ModelPricing::new(1000.0, 3000.0)),
    ("gpt-3.5-turbo", ModelPricing::new(50.0, 150.0)),
    // Anthropic
    ("claude-3-5-sonnet-20241022", ModelPricing::new(300.0, 1500.0)),
    ("claude-3-5-sonnet-latest", ModelPricing::new(300.0, 1500.0)),
    ("claude-3-5-haiku-20241022", ModelPricing::new(80.0, 400.0)),
    ("claude-3-5-haiku-latest", ModelPricing::new(80.0, 400.0)),
    ("claude-3-opus-20240229", ModelPricing::new(1500.0, 7500.0)),
    ("claude-3-opus-latest", ModelPricing::new(1500.0, 7500.0)),
];

const MODEL_ALIASES: &[(&str, &str)] = &[
    ("gpt-4o-2024-11-20", "gpt-4o"),
    ("gpt-4o-2024-08-06", "gpt-4o"),
    ("gpt-4o-2024-05-13", "gpt-4o"),
    ("gpt-4o-mini-2024-07-18", "gpt-4o-mini"),
    ("gpt-4-turbo-2024-04-09", "gpt-4-turbo"),
    ("gpt-4-turbo-preview", "gpt-4-turbo"),
    ("gpt-3.5-turbo-0125", "gpt-3.5-turbo"),
    ("gpt-3.5-turbo-1106", "gpt-3.5-turbo"),
    ("claude-3-5-sonnet", "claude-3-5-sonnet-20241022"),
    ("claude-3.5-sonnet", "claude-3-5-sonnet-20241022"),
    ("claude-3-5-haiku", "claude-3-5-haiku-20241022"),
    ("claude-3.5-haiku", "claude-3-5-haiku-20241022"),
    ("claude-3-opus", "claude-3-opus-20240229"),
];

struct PriceTable {
    prices: HashMap<&'static str, ModelPricing>,
    aliases: HashMap<&'static str, &'static str>,
}

static PRICE_TABLE: LazyLock<PriceTable> = LazyLock::new(|| PriceTable {
    prices: MODEL_PRICES.iter().copied().collect(),
    aliases: MODEL_ALIASES.iter().copied().collect(),
});

/// Resolve a model name to its pricing
pub fn lookup(model: &str) -> (Option<ModelPricing>, MatchType) {
    let table = &*PRICE_TABLE;

    if let Some(pricing) = table.prices.get(model) {
        return (Some(*pricing), MatchType::Exact);
    }

    if let Some(canonical) = table.aliases.get(model)
        && let Some(pricing) = table.prices.get(canonical)
    {
        return (Some(*pricing), MatchType::Alias);
    }

    (None, MatchType::NotFound)
}

/// Cost of a call in cents, or `None` when the model has no pricing
pub fn calculate_cost(model: &str, input_tokens: u64, output_tokens: u64) -> Option<f64> {
    lookup(model)
        .0
        .map(|pricing| pricing.cost(input_tokens, output_tokens))
}

pub fn has_pricing(model: &str) -> bool {
    lookup(model).0.is_some()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_close(actual: Option<f64>, expected: f64) {
        let actual = actual.expect("expected a cost");
        assert!(
            (actual - expected).abs() < 1e-9,
            "expected {expected}, got {actual}"
        );
    }

    #[test]
    fn test_exact_match() {
        assert_eq!(calculate_cost("gpt-4o", 1000, 500), Some(0.75));
        assert_eq!(calculate_cost("gpt-4-turbo", 1000, 1000), Some(4.0));
        assert_eq!(calculate_cost("gpt-3.5-turbo", 1_000_000, 1_000_000), Some(200.0));
        assert_close(calculate_cost("gpt-4o-mini", 10_000, 5_000), 0.45);
        assert_close(calculate_cost("claude-3-5-sonnet-20241022", 2000, 1000), 2.1);
        assert_close(calculate_cost("claude-3-opus-20240229", 1000, 500), 5.25);
    }

    #[test]
    fn test_alias_match() {
        let (pricing, match_type) = lookup("gpt-4o-2024-11-20");
        assert_eq!(match_type, MatchType::Alias);
        assert_eq!(pricing, lookup("gpt-4o").0);
        assert_eq!(calculate_cost("gpt-4o-2024-11-20", 1000, 500), Some(0.75));
        assert_close(calculate_cost("claude-3.5-haiku", 5000, 2500), 1.4);
    }

    #[test]
    fn test_unknown_model() {
        assert_eq!(lookup("llama-3-70b"), (None, MatchType::NotFound));
        assert_eq!(calculate_cost("llama-3-70b", 100, 100), None);
        assert!(!has_pricing("llama-3-70b"));
        assert!(has_pricing("claude-3-opus"));
    }

    #[test]
    fn test_zero_tokens_cost_nothing() {
        assert_eq!(calculate_cost("gpt-4o", 0, 0), Some(0.0));
    }

    #[test]
    fn test_every_alias_resolves() {
        for (alias, _) in MODEL_ALIASES {
            assert!(has_pricing(alias), "alias {alias} has no target");
        }
    }
}
