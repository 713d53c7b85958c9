mod allocation;
mod confirmation_code;
mod retry;

pub use allocation::{allocate_submission, SubmissionAllocation};
pub use confirmation_code::{generate_confirmation_code, ConfirmationCodePolicy, CONFIRMATION_CODE_DIGITS};
pub use retry::{with_retries, RetryPolicy};
