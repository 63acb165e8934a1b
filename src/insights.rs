use chrono::NaiveDate;
use log::debug;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::aggregation::{group_sum_with, percentage_breakdown, stable_sum};
use crate::schema::{Category, Transaction};
use crate::utils::{format_month_label, months_between, trailing_months};

/// Number of buckets in the trend view.
pub const TREND_MONTHS: u32 = 6;

/// Source label for income transactions that carry no subcategory.
pub const UNSPECIFIED_SOURCE: &str = "Other";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CategoryTotal {
    pub category: Category,
    #[schemars(description = "Absolute amount spent in the category")]
    pub amount: f64,
    #[schemars(description = "Share of total expenses, 0-100")]
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseInsights {
    /// Every expense category, largest first.
    pub categories: Vec<CategoryTotal>,
    pub top_categories: Vec<CategoryTotal>,
    pub total_expenses: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct SavingsPotential {
    pub small_recurring_expenses: Vec<Transaction>,
    #[schemars(description = "Combined magnitude of the small recurring expenses")]
    pub potential_savings: f64,
    pub threshold: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct IncomeSource {
    pub source: String,
    pub amount: f64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct MonthBucket {
    #[schemars(description = "MM-YY label")]
    pub month: String,
    pub amount: f64,
}

fn by_amount_desc(a: &CategoryTotal, b: &CategoryTotal) -> Ordering {
    b.amount
        .total_cmp(&a.amount)
        .then_with(|| a.category.cmp(&b.category))
}

/// Ranks debit spending by category and keeps the `top_n` largest.
pub fn expense_insights(transactions: &[Transaction], top_n: usize) -> ExpenseInsights {
    let debits: Vec<Transaction> = transactions
        .iter()
        .filter(|txn| txn.is_debit())
        .cloned()
        .collect();

    let totals = group_sum_with(&debits, |txn| txn.category, |txn| txn.amount.abs());
    let shares = percentage_breakdown(&totals);

    let mut categories: Vec<CategoryTotal> = totals
        .iter()
        .map(|(category, amount)| CategoryTotal {
            category: *category,
            amount: *amount,
            percentage: shares.get(category).copied().unwrap_or(0.0),
        })
        .collect();
    categories.sort_by(by_amount_desc);

    let total_expenses = stable_sum(debits.iter().map(|txn| txn.amount.abs()));
    let top_categories = categories.iter().take(top_n).cloned().collect();

    debug!(
        "Expense insights: {} debits across {} categories, total {:.2}",
        debits.len(),
        categories.len(),
        total_expenses
    );

    ExpenseInsights {
        categories,
        top_categories,
        total_expenses,
    }
}

/// Transactions flagged recurring whose magnitude is strictly below `threshold`,
/// largest first, then most recent, then by id.
///
/// The upstream recurrence flag is trusted as-is; no periodicity is inferred
/// from dates. Direction is not checked either: a recurring credit under the
/// threshold (cashback, a small refund) qualifies and adds its magnitude to
/// [`SavingsPotential::potential_savings`]. Callers that want outflows only
/// can filter with [`Transaction::is_debit`] first.
pub fn small_recurring_expenses(transactions: &[Transaction], threshold: f64) -> Vec<Transaction> {
    let mut small: Vec<Transaction> = transactions
        .iter()
        .filter(|txn| txn.is_recurring && txn.amount.abs() < threshold)
        .cloned()
        .collect();
    small.sort_by(|a, b| {
        b.amount
            .abs()
            .total_cmp(&a.amount.abs())
            .then_with(|| b.date.cmp(&a.date))
            .then_with(|| a.id.cmp(&b.id))
            .then_with(|| a.account_id.cmp(&b.account_id))
    });
    small
}

pub fn savings_potential(transactions: &[Transaction], threshold: f64) -> SavingsPotential {
    let small_recurring_expenses = small_recurring_expenses(transactions, threshold);
    let potential_savings = stable_sum(small_recurring_expenses.iter().map(|txn| txn.amount.abs()));

    SavingsPotential {
        small_recurring_expenses,
        potential_savings,
        threshold,
    }
}

pub fn income_transactions(transactions: &[Transaction]) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|txn| txn.is_income())
        .cloned()
        .collect()
}

pub fn monthly_income(transactions: &[Transaction]) -> f64 {
    stable_sum(
        transactions
            .iter()
            .filter(|txn| txn.is_income())
            .map(|txn| txn.amount),
    )
}

/// Income grouped by subcategory, largest source first. Empty when there is
/// no income.
pub fn income_breakdown(transactions: &[Transaction]) -> Vec<IncomeSource> {
    let income = income_transactions(transactions);
    let totals = group_sum_with(
        &income,
        |txn| {
            txn.subcategory
                .clone()
                .unwrap_or_else(|| UNSPECIFIED_SOURCE.to_string())
        },
        |txn| txn.amount,
    );
    let shares = percentage_breakdown(&totals);

    let mut sources: Vec<IncomeSource> = totals
        .into_iter()
        .map(|(source, amount)| {
            let percentage = shares.get(&source).copied().unwrap_or(0.0);
            IncomeSource {
                source,
                amount,
                percentage,
            }
        })
        .collect();
    sources.sort_by(|a, b| {
        b.amount
            .total_cmp(&a.amount)
            .then_with(|| a.source.cmp(&b.source))
    });
    sources
}

/// Signed totals for the month of `now` and the five months before it,
/// oldest first. Months without activity are present with 0. Transactions
/// dated after `now`, even within its month, are left out.
pub fn six_month_trend(transactions: &[Transaction], now: NaiveDate) -> Vec<MonthBucket> {
    let months = trailing_months(now, TREND_MONTHS);
    let last = TREND_MONTHS as i32 - 1;

    let mut buckets: Vec<Vec<f64>> = vec![Vec::new(); months.len()];
    for txn in transactions.iter().filter(|txn| txn.date <= now) {
        let offset = months_between(txn.date, now);
        if (0..=last).contains(&offset) {
            buckets[(last - offset) as usize].push(txn.amount);
        }
    }

    months
        .into_iter()
        .zip(buckets)
        .map(|((year, month), amounts)| MonthBucket {
            month: format_month_label(year, month),
            amount: stable_sum(amounts),
        })
        .collect()
}

pub fn income_trend(transactions: &[Transaction], now: NaiveDate) -> Vec<MonthBucket> {
    six_month_trend(&income_transactions(transactions), now)
}
