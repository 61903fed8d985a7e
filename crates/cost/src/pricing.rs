use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use serde::Serialize;

/// Price of a model in USD per one million tokens.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct Price {
    /// Price of one million input tokens.
    pub input_per_1m: f64,
    /// Price of one million output tokens.
    pub output_per_1m: f64,
}

impl Price {
    /// Creates a price.
    #[inline]
    pub const fn new(input_per_1m: f64, output_per_1m: f64) -> Self {
        Self {
            input_per_1m,
            output_per_1m,
        }
    }

    /// Computes the cost of a call in USD.
    #[inline]
    pub fn cost(&self, input_tokens: u64, output_tokens: u64) -> f64 {
        (input_tokens as f64 / 1_000_000.0) * self.input_per_1m
            + (output_tokens as f64 / 1_000_000.0) * self.output_per_1m
    }

    fn average(&self) -> f64 {
        (self.input_per_1m + self.output_per_1m) / 2.0
    }
}

/// A model capability and price profile.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelTier {
    /// Fast and inexpensive.
    Cheap,
    /// The default for most work.
    Balanced,
    /// Most capable and most expensive.
    Premium,
}

/// Static facts about the model behind a tier.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct TierProfile {
    /// Model identifier understood by the provider.
    pub model_id: &'static str,
    /// Price of the model.
    pub price: Price,
    /// Largest output the model supports.
    pub max_tokens: u32,
    /// Context window of the model.
    pub context_window: u32,
}

const CHEAP: TierProfile = TierProfile {
    model_id: "claude-3-5-haiku-20241022",
    price: Price::new(0.25, 1.25),
    max_tokens: 8192,
    context_window: 200_000,
};

const BALANCED: TierProfile = TierProfile {
    model_id: "claude-sonnet-4-5",
    price: Price::new(3.0, 15.0),
    max_tokens: 8192,
    context_window: 200_000,
};

const PREMIUM: TierProfile = TierProfile {
    model_id: "claude-3-opus-20240229",
    price: Price::new(15.0, 75.0),
    max_tokens: 4096,
    context_window: 200_000,
};

impl ModelTier {
    /// Every tier, cheapest first.
    pub const ALL: [ModelTier; 3] = [Self::Cheap, Self::Balanced, Self::Premium];

    /// Returns the profile of this tier.
    #[inline]
    pub fn profile(self) -> &'static TierProfile {
        match self {
            Self::Cheap => &CHEAP,
            Self::Balanced => &BALANCED,
            Self::Premium => &PREMIUM,
        }
    }

    /// Returns the model identifier of this tier.
    #[inline]
    pub fn model_id(self) -> &'static str {
        self.profile().model_id
    }

    /// Percentage saved by this tier against the balanced tier, judged by
    /// the average of input and output prices. Negative when the tier is
    /// more expensive.
    pub fn savings_vs_balanced(self) -> f64 {
        let balanced = BALANCED.price.average();
        let this = self.profile().price.average();
        (balanced - this) / balanced * 100.0
    }
}

impl Display for ModelTier {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cheap => "cheap",
            Self::Balanced => "balanced",
            Self::Premium => "premium",
        })
    }
}

/// Maps model identifiers to prices.
///
/// Unknown models are charged with the fallback price, which is the
/// balanced tier's unless changed.
#[derive(Clone, Debug)]
pub struct PriceTable {
    prices: HashMap<String, Price>,
    fallback: Price,
}

impl Default for PriceTable {
    fn default() -> Self {
        let mut prices: HashMap<String, Price> = ModelTier::ALL
            .iter()
            .map(|tier| (tier.model_id().to_owned(), tier.profile().price))
            .collect();
        // Short aliases used in configuration files.
        prices.insert("claude-sonnet-3-5".to_owned(), BALANCED.price);
        prices.insert("claude-haiku".to_owned(), CHEAP.price);
        Self {
            prices,
            fallback: BALANCED.price,
        }
    }
}

impl PriceTable {
    /// Adds or replaces the price of a model.
    #[inline]
    pub fn with_price<M: Into<String>>(mut self, model: M, price: Price) -> Self {
        self.prices.insert(model.into(), price);
        self
    }

    /// Sets the price charged for unknown models.
    #[inline]
    pub fn with_fallback(mut self, price: Price) -> Self {
        self.fallback = price;
        self
    }

    /// Returns the price of a model.
    #[inline]
    pub fn price_of(&self, model: &str) -> Price {
        self.prices.get(model).copied().unwrap_or(self.fallback)
    }

    /// Computes the cost of a call in USD.
    #[inline]
    pub fn cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        self.price_of(model).cost(input_tokens, output_tokens)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_cost() {
        let price = ModelTier::Balanced.profile().price;
        let cost = price.cost(1_000_000, 1_000_000);
        assert!((cost - 18.0).abs() < 1e-9);
        assert!((price.cost(1000, 0) - 0.003).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_model_uses_fallback() {
        let table = PriceTable::default();
        assert_eq!(table.price_of("some-new-model"), BALANCED.price);
        assert_eq!(table.price_of("claude-haiku"), CHEAP.price);

        let table = table.with_fallback(Price::new(1.0, 1.0));
        assert!((table.cost("mystery", 500_000, 500_000) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_cheap_tier_savings() {
        let savings = ModelTier::Cheap.savings_vs_balanced();
        assert!((savings - 91.666_666).abs() < 1e-3);
        assert_eq!(ModelTier::Balanced.savings_vs_balanced(), 0.0);
        assert!(ModelTier::Premium.savings_vs_balanced() < 0.0);
    }
}
