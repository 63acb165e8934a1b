use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::schema::{Transaction, DEFAULT_TRANSACTION_SAMPLE};

/// Sums signed amounts per key. Keys absent from the input never appear.
pub fn group_sum<K, F>(transactions: &[Transaction], key_fn: F) -> BTreeMap<K, f64>
where
    K: Ord,
    F: Fn(&Transaction) -> K,
{
    group_sum_with(transactions, key_fn, |txn| txn.amount)
}

pub fn group_sum_with<K, F, V>(
    transactions: &[Transaction],
    key_fn: F,
    value_fn: V,
) -> BTreeMap<K, f64>
where
    K: Ord,
    F: Fn(&Transaction) -> K,
    V: Fn(&Transaction) -> f64,
{
    let mut groups: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for txn in transactions {
        groups.entry(key_fn(txn)).or_default().push(value_fn(txn));
    }
    groups
        .into_iter()
        .map(|(key, values)| (key, stable_sum(values)))
        .collect()
}

/// Sum that does not depend on input order, so permuted snapshots produce
/// bit-identical totals.
pub fn stable_sum<I>(values: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    let mut values: Vec<f64> = values.into_iter().collect();
    values.sort_by(|a, b| a.total_cmp(b));
    values.into_iter().fold(0.0, |acc, value| acc + value)
}

/// Each key's share of the grand total, in percent. A zero total yields 0
/// for every key.
pub fn percentage_breakdown<K>(groups: &BTreeMap<K, f64>) -> BTreeMap<K, f64>
where
    K: Ord + Clone,
{
    let total = stable_sum(groups.values().copied());
    groups
        .iter()
        .map(|(key, amount)| (key.clone(), percentage_of(*amount, total)))
        .collect()
}

pub fn percentage_of(amount: f64, total: f64) -> f64 {
    if total == 0.0 || !total.is_finite() {
        0.0
    } else {
        amount / total * 100.0
    }
}

/// Newest first. Transactions sharing a date keep their input order.
pub fn sort_by_date_desc(transactions: &mut [Transaction]) {
    transactions.sort_by(|a, b| b.date.cmp(&a.date));
}

pub fn sorted_by_date_desc(transactions: &[Transaction]) -> Vec<Transaction> {
    let mut sorted = transactions.to_vec();
    sort_by_date_desc(&mut sorted);
    sorted
}

pub fn filter_by_account(transactions: &[Transaction], account_id: &str) -> Vec<Transaction> {
    transactions
        .iter()
        .filter(|txn| txn.account_id == account_id)
        .cloned()
        .collect()
}

pub fn limit(mut transactions: Vec<Transaction>, max: usize) -> Vec<Transaction> {
    transactions.truncate(max);
    transactions
}

/// Reads a result limit from request text. Missing or unreadable text means
/// the default; negative values clamp to zero.
pub fn parse_limit(raw: Option<&str>) -> usize {
    let Some(text) = raw else {
        return DEFAULT_TRANSACTION_SAMPLE;
    };
    match text.trim().parse::<i64>() {
        Ok(value) => usize::try_from(value.max(0)).unwrap_or(usize::MAX),
        Err(_) => DEFAULT_TRANSACTION_SAMPLE,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionPage {
    pub transactions: Vec<Transaction>,
    /// Matching transactions before the limit was applied.
    pub total: usize,
}

/// Account filter, newest-first ordering, then the limit.
pub fn list_transactions(
    transactions: &[Transaction],
    account_id: Option<&str>,
    max: usize,
) -> TransactionPage {
    let mut selected = match account_id {
        Some(id) => filter_by_account(transactions, id),
        None => transactions.to_vec(),
    };
    sort_by_date_desc(&mut selected);

    let total = selected.len();
    debug!(
        "Listing {} of {} transactions (account filter: {:?})",
        total.min(max),
        total,
        account_id
    );

    TransactionPage {
        transactions: limit(selected, max),
        total,
    }
}
