use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::Duration;

pub const CODE_LENGTH: usize = 5;
const CODE_MIN: u32 = 10_000;
const CODE_SPAN: u32 = 90_000;

pub fn code_ttl() -> Duration {
    Duration::minutes(15)
}

/// Uniform 5-digit code in 10000..=99999.
pub fn generate_code() -> String {
    // Rejection sampling keeps the distribution uniform.
    let limit = u32::MAX - (u32::MAX % CODE_SPAN);
    loop {
        let n = OsRng.next_u32();
        if n < limit {
            return (CODE_MIN + n % CODE_SPAN).to_string();
        }
    }
}

/// Strips everything but ASCII digits. `None` unless exactly five remain.
pub fn normalize_code(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    (digits.len() == CODE_LENGTH).then_some(digits)
}

/// `RF` followed by seven random digits.
pub fn generate_referral_code() -> String {
    format!("RF{:07}", OsRng.next_u32() % 10_000_000)
}
