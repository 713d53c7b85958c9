use std::{fmt::Display, str::FromStr};

use cod_common::Cents;
use serde::{Deserialize, Serialize};

/// How a declared submission amount is spread over the collections it covers.
///
/// The declared amount is what the courier actually handed over, so it may differ from the sum of the collected
/// amounts (rounding, partial handovers). The per-row share becomes each collection's `submitted_amount`, which is the
/// amount reconciliation later compares against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionAllocation {
    /// Equal shares regardless of the individual amounts. Leftover cents go to the earliest collections.
    #[default]
    Even,
    /// Shares in proportion to each collection's amount. Leftover cents go to the largest collections.
    Proportional,
}

impl Display for SubmissionAllocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Even => f.write_str("even"),
            Self::Proportional => f.write_str("proportional"),
        }
    }
}

impl FromStr for SubmissionAllocation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "even" => Ok(Self::Even),
            "proportional" => Ok(Self::Proportional),
            other => Err(format!("'{other}' is not a submission allocation. Use 'even' or 'proportional'")),
        }
    }
}

/// Splits `total` over rows with the given `amounts`. The result has one entry per row, in the same order, and always
/// sums to exactly `total`. `amounts` must be in collection order (earliest first).
pub fn allocate_submission(total: Cents, amounts: &[Cents], policy: SubmissionAllocation) -> Vec<Cents> {
    if amounts.is_empty() {
        return Vec::new();
    }
    let collected: i128 = amounts.iter().map(|a| i128::from(a.value())).sum();
    match policy {
        SubmissionAllocation::Proportional if collected > 0 => proportional(total, amounts, collected),
        _ => even(total, amounts.len()),
    }
}

#[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
fn even(total: Cents, rows: usize) -> Vec<Cents> {
    let n = rows as i64;
    let base = total.value().div_euclid(n);
    let remainder = total.value().rem_euclid(n) as usize;
    (0..rows).map(|i| Cents::from(if i < remainder { base + 1 } else { base })).collect()
}

#[allow(clippy::cast_possible_truncation)]
fn proportional(total: Cents, amounts: &[Cents], collected: i128) -> Vec<Cents> {
    let total_wide = i128::from(total.value());
    let mut shares = amounts
        .iter()
        .map(|a| (total_wide * i128::from(a.value())).div_euclid(collected) as i64)
        .collect::<Vec<i64>>();
    let mut leftover = total.value() - shares.iter().sum::<i64>();
    let mut by_size = (0..amounts.len()).collect::<Vec<usize>>();
    // Stable sort keeps the earlier row first among equal amounts
    by_size.sort_by(|a, b| amounts[*b].cmp(&amounts[*a]));
    let mut i = 0;
    while leftover > 0 {
        shares[by_size[i % by_size.len()]] += 1;
        leftover -= 1;
        i += 1;
    }
    shares.into_iter().map(Cents::from).collect()
}
