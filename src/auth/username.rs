use anyhow::Result;
use rand::{thread_rng, Rng};
use sqlx::SqlitePool;

use crate::db;

const MAX_USERNAME_LEN: usize = 32;

/// Username candidate derived from the local part of an email address.
///
/// Keeps ASCII letters, digits, `.`, `_` and `-`; falls back to `user`.
#[must_use]
pub fn username_base(email: &str) -> String {
    let local = email.split('@').next().unwrap_or_default();
    let base: String = local
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
        .take(MAX_USERNAME_LEN)
        .collect::<String>()
        .to_lowercase();

    if base.is_empty() {
        "user".to_string()
    } else {
        base
    }
}

/// Generate a username that is not taken yet.
///
/// Tries the bare base first, then `base2`, `base3`, ... and finally a random suffix.
pub async fn generate_unique_username(pool: &SqlitePool, email: &str) -> Result<String> {
    let base = username_base(email);

    if !db::username_exists(pool, &base).await? {
        return Ok(base);
    }

    for n in 2..=100 {
        let candidate = format!("{base}{n}");
        if !db::username_exists(pool, &candidate).await? {
            return Ok(candidate);
        }
    }

    // Fallback: random suffix
    loop {
        let suffix: u32 = thread_rng().gen_range(1000..100_000);
        let candidate = format!("{base}{suffix}");
        if !db::username_exists(pool, &candidate).await? {
            return Ok(candidate);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_base() {
        assert_eq!(username_base("Priya.Sharma@college.edu"), "priya.sharma");
        assert_eq!(username_base("a+b@x.io"), "ab");
        assert_eq!(username_base("@x.io"), "user");
        assert_eq!(username_base(&format!("{}@x.io", "a".repeat(50))).len(), 32);
    }
}
