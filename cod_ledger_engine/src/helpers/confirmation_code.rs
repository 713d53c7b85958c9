use chrono::Duration;
use rand::Rng;

pub const CONFIRMATION_CODE_DIGITS: usize = 6;

/// Lifetime and resend allowance of delivery-confirmation codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmationCodePolicy {
    pub ttl: Duration,
    pub max_resends: i64,
}

impl Default for ConfirmationCodePolicy {
    fn default() -> Self {
        Self { ttl: Duration::hours(4), max_resends: 3 }
    }
}

/// A uniformly random six-digit code. Leading zeros are kept.
pub fn generate_confirmation_code() -> String {
    let n = rand::thread_rng().gen_range(0..1_000_000u32);
    format!("{n:0width$}", width = CONFIRMATION_CODE_DIGITS)
}
