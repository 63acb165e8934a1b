//! # Finsight
//!
//! A library for turning a raw snapshot of accounts and transactions into
//! derived financial metrics, and for packing those metrics into a bounded
//! context object that can be handed to a text-generation service.
//!
//! ## Core Concepts
//!
//! - **Canonical Transaction**: Upstream records arrive in several shapes; the
//!   [`classifier`] normalizes them into one [`Transaction`] type
//! - **Aggregation**: Grouped sums, percentage shares and ordering live in [`aggregation`]
//! - **Insights**: Expense ranking, small recurring expenses, savings potential,
//!   income sources and the six-month trend ([`insights`]); credit utilization
//!   and debt payoff ordering ([`debt`])
//! - **Advisory Context**: A size-capped summary for an LLM ([`context`], [`advisor`])
//!
//! Every computation is a pure function of its input snapshot.
//!
//! ## Example
//!
//! ```rust,ignore
//! use finsight::*;
//! use chrono::NaiveDate;
//!
//! let batch = classify_batch(&raw_records);
//! let engine = InsightsEngine::new(
//!     InsightsConfig::default().with_now(NaiveDate::from_ymd_opt(2025, 10, 18).unwrap()),
//! )?;
//!
//! let metrics = engine.compute(&batch.transactions, &accounts);
//! println!("Potential savings: {:.2}", metrics.potential_savings());
//!
//! let context = ContextBudgeter::default().assemble(Some(&batch.transactions), &metrics)?;
//! ```

pub mod advisor;
pub mod aggregation;
pub mod classifier;
pub mod context;
pub mod debt;
pub mod error;
pub mod insights;
pub mod schema;
pub mod utils;

pub use advisor::{render_prompt, AdvisoryAnswer, Advisor, TextGenerator};
pub use aggregation::{
    filter_by_account, group_sum, group_sum_with, limit, list_transactions, parse_limit,
    percentage_breakdown, sort_by_date_desc, sorted_by_date_desc, TransactionPage,
};
pub use classifier::{classify, classify_batch, classify_value, ClassifiedBatch, RawTransaction};
pub use context::{AdvisoryContext, AdvisoryRequest, ContextBudgeter};
pub use debt::{
    aggregate_utilization, credit_utilization, debt_summary, net_worth, payoff_priority,
    rank_debts, CreditUtilization, DebtAccount, DebtSummary,
};
pub use error::{InsightsError, Result};
pub use insights::{
    expense_insights, income_breakdown, income_trend, monthly_income, savings_potential,
    six_month_trend, small_recurring_expenses, CategoryTotal, ExpenseInsights, IncomeSource,
    MonthBucket, SavingsPotential,
};
pub use schema::*;

use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::utils::month_label;

/// Everything derived from one snapshot. Built fresh per request and never
/// mutated; recompute from a new snapshot to refresh.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregatedMetrics {
    /// Signed totals per category across all transactions.
    pub by_category: BTreeMap<Category, f64>,
    /// Signed totals per `MM-YY` month.
    pub by_month: BTreeMap<String, f64>,
    pub income_sources: Vec<IncomeSource>,
    pub expenses: ExpenseInsights,
    pub savings: SavingsPotential,
    pub trend: Vec<MonthBucket>,
    pub income_trend: Vec<MonthBucket>,
    pub credit: Vec<CreditUtilization>,
    pub debt: DebtSummary,
    pub net_worth: f64,
    pub monthly_income: f64,
    pub monthly_expenses: f64,
}

impl AggregatedMetrics {
    pub fn potential_savings(&self) -> f64 {
        self.savings.potential_savings
    }

    pub fn top_categories(&self) -> &[CategoryTotal] {
        &self.expenses.top_categories
    }
}

pub struct InsightsEngine {
    config: InsightsConfig,
}

impl InsightsEngine {
    pub fn new(config: InsightsConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &InsightsConfig {
        &self.config
    }

    pub fn compute(&self, transactions: &[Transaction], accounts: &[Account]) -> AggregatedMetrics {
        let now = self.config.reference_date();

        info!(
            "Computing insights for {} transactions across {} accounts",
            transactions.len(),
            accounts.len()
        );
        debug!(
            "Reference date {}, top categories {}, small expense threshold {:.2}",
            now, self.config.top_categories, self.config.small_expense_threshold
        );

        let expenses = expense_insights(transactions, self.config.top_categories);
        let savings = savings_potential(transactions, self.config.small_expense_threshold);

        AggregatedMetrics {
            by_category: group_sum(transactions, |txn| txn.category),
            by_month: group_sum(transactions, |txn| month_label(txn.date)),
            income_sources: income_breakdown(transactions),
            trend: six_month_trend(transactions, now),
            income_trend: income_trend(transactions, now),
            credit: debt::credit_utilizations(accounts),
            debt: debt_summary(accounts),
            net_worth: net_worth(accounts),
            monthly_income: monthly_income(transactions),
            monthly_expenses: expenses.total_expenses,
            expenses,
            savings,
        }
    }

    /// Classifies loosely-shaped records first. Malformed records are
    /// normalized with defaults and counted, never dropped.
    pub fn compute_from_values(
        &self,
        records: &[Value],
        accounts: &[Account],
    ) -> (AggregatedMetrics, ClassifiedBatch) {
        let batch = classify_batch(records);
        if batch.malformed > 0 {
            info!(
                "{} of {} transactions needed fallback values",
                batch.malformed,
                batch.transactions.len()
            );
        }
        let metrics = self.compute(&batch.transactions, accounts);
        (metrics, batch)
    }
}

/// Computes metrics with the default configuration (trend window ending today).
pub fn compute_metrics(transactions: &[Transaction], accounts: &[Account]) -> AggregatedMetrics {
    let engine = InsightsEngine {
        config: InsightsConfig::default(),
    };
    engine.compute(transactions, accounts)
}
