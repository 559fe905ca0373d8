//! Usage-cost estimation
//!
//! Maps model identifiers to per-million-token USD prices. The table is an
//! immutable value injected at construction; updates require a deploy. Cost
//! is never stored alongside usage rows - it is recomputed on read so that
//! price-table corrections retroactively affect historical reports.

use serde::Serialize;

use crate::types::UsageLogRecord;

/// Per-million-token USD prices for one model identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelPrice {
    pub model: &'static str,
    pub input_per_million: f64,
    pub output_per_million: f64,
}

/// Built-in price table. Entries match the provider's published
/// per-million-token rates at the time of the last deploy.
const BUILTIN_PRICES: &[ModelPrice] = &[
    ModelPrice {
        model: "gpt-4o-mini",
        input_per_million: 0.15,
        output_per_million: 0.60,
    },
    ModelPrice {
        model: "gpt-4o",
        input_per_million: 2.50,
        output_per_million: 10.00,
    },
    ModelPrice {
        model: "gpt-4.1-mini",
        input_per_million: 0.40,
        output_per_million: 1.60,
    },
    ModelPrice {
        model: "gpt-4.1-nano",
        input_per_million: 0.10,
        output_per_million: 0.40,
    },
    ModelPrice {
        model: "gpt-4.1",
        input_per_million: 2.00,
        output_per_million: 8.00,
    },
    ModelPrice {
        model: "gpt-5-mini",
        input_per_million: 0.25,
        output_per_million: 2.00,
    },
    ModelPrice {
        model: "gpt-5-nano",
        input_per_million: 0.05,
        output_per_million: 0.40,
    },
    ModelPrice {
        model: "gpt-5",
        input_per_million: 1.25,
        output_per_million: 10.00,
    },
    ModelPrice {
        model: "o3-mini",
        input_per_million: 1.10,
        output_per_million: 4.40,
    },
];

/// Immutable pricing table consulted for cost estimation and display.
#[derive(Debug, Clone, Serialize)]
pub struct PricingTable {
    entries: Vec<ModelPrice>,
}

impl Default for PricingTable {
    fn default() -> Self {
        Self {
            entries: BUILTIN_PRICES.to_vec(),
        }
    }
}

impl PricingTable {
    pub fn new(entries: Vec<ModelPrice>) -> Self {
        Self { entries }
    }

    /// Full table for read-only display.
    pub fn entries(&self) -> &[ModelPrice] {
        &self.entries
    }

    /// Price entry for a model identifier.
    ///
    /// Lookup order: exact case-insensitive match, then the longest table
    /// key that is a case-insensitive prefix of `model` (handles dated
    /// suffixes like `-2025-08-07`). `None` when nothing matches.
    pub fn price_for(&self, model: &str) -> Option<&ModelPrice> {
        let lower = model.to_ascii_lowercase();

        if let Some(exact) = self
            .entries
            .iter()
            .find(|p| p.model.eq_ignore_ascii_case(&lower))
        {
            return Some(exact);
        }

        self.entries
            .iter()
            .filter(|p| lower.starts_with(&p.model.to_ascii_lowercase()))
            .max_by_key(|p| p.model.len())
    }

    /// Estimated USD cost of one call. An unknown model is not an error;
    /// its cost is 0.
    pub fn compute_cost(&self, model: &str, input_tokens: u64, output_tokens: u64) -> f64 {
        match self.price_for(model) {
            Some(price) => {
                (input_tokens as f64 * price.input_per_million
                    + output_tokens as f64 * price.output_per_million)
                    / 1_000_000.0
            }
            None => 0.0,
        }
    }

    /// Recomputed cost of one stored usage row.
    pub fn cost_of(&self, record: &UsageLogRecord) -> f64 {
        self.compute_cost(&record.model, record.input_tokens, record.output_tokens)
    }

    /// Aggregate a set of usage rows into a cost report. Cost comes from
    /// this table, not from anything persisted with the rows.
    pub fn summarize<'a, I>(&self, records: I) -> UsageReport
    where
        I: IntoIterator<Item = &'a UsageLogRecord>,
    {
        let mut report = UsageReport::default();
        for record in records {
            report.call_count += 1;
            if record.success {
                report.success_count += 1;
            }
            report.total_input_tokens += record.input_tokens;
            report.total_output_tokens += record.output_tokens;
            report.total_cost_usd += self.cost_of(record);
        }
        report
    }
}

/// Aggregated usage and recomputed cost over a set of usage rows.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct UsageReport {
    pub call_count: usize,
    pub success_count: usize,
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    pub total_cost_usd: f64,
}
