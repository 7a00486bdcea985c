//! Username normalization and uniqueness resolution
//!
//! Shared by sign-in reconciliation and profile renames so the handle rules
//! live in exactly one place. Uniqueness probing goes through the
//! [`UsernameStore`] port and must share the transaction of the account
//! write that follows it.

use async_trait::async_trait;
use sqlx::{Sqlite, Transaction};
use uuid::Uuid;

use super::error::ApiError;

pub const MAX_USERNAME_LEN: usize = 30;

/// Numeric-suffix probes before falling back to a random suffix
const MAX_NUMERIC_ATTEMPTS: u32 = 200;

/// Uniqueness check port. `exclude` scopes the check away from the account
/// being renamed.
#[async_trait]
pub trait UsernameStore {
    async fn is_taken(&mut self, username: &str, exclude: Option<Uuid>)
        -> Result<bool, ApiError>;
}

/// Store backed by the `users` table, borrowing the caller's transaction.
pub struct TxUsernameStore<'a, 'c> {
    pub tx: &'a mut Transaction<'c, Sqlite>,
}

#[async_trait]
impl UsernameStore for TxUsernameStore<'_, '_> {
    async fn is_taken(
        &mut self,
        username: &str,
        exclude: Option<Uuid>,
    ) -> Result<bool, ApiError> {
        let row: Option<(i64,)> = match exclude {
            Some(id) => {
                sqlx::query_as("SELECT 1 FROM users WHERE username = ? AND id != ?")
                    .bind(username)
                    .bind(id)
                    .fetch_optional(&mut **self.tx)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT 1 FROM users WHERE username = ?")
                    .bind(username)
                    .fetch_optional(&mut **self.tx)
                    .await?
            }
        };
        Ok(row.is_some())
    }
}

/// Normalize a raw handle: lowercase, collapse runs of characters outside
/// `[a-z0-9]` to a single underscore, strip leading/trailing underscores,
/// truncate to 30 characters. Blank input normalizes to the empty string.
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_separator = false;
    for c in raw.trim().chars() {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() || c.is_ascii_digit() {
            if pending_separator && !out.is_empty() {
                out.push('_');
            }
            out.push(c);
            pending_separator = false;
        } else {
            pending_separator = true;
        }
    }
    out.truncate(MAX_USERNAME_LEN);
    while out.ends_with('_') {
        out.pop();
    }
    out
}

/// Resolve a normalized base to a handle that is untaken at call time.
///
/// Probes `base`, `base1`, `base2`, ... re-truncating each attempt; after
/// 200 misses switches to random 6-character suffixes and accepts the first
/// untaken candidate. The residual collision window is closed by the unique
/// index on `users.username`, not by further retries.
pub async fn resolve_unique<S>(
    store: &mut S,
    base: &str,
    exclude: Option<Uuid>,
) -> Result<String, ApiError>
where
    S: UsernameStore + Send,
{
    let base = if base.is_empty() { "user" } else { base };
    let mut candidate = base.to_string();
    let mut attempt: u32 = 0;
    loop {
        if !store.is_taken(&candidate, exclude).await? {
            return Ok(candidate);
        }
        attempt += 1;
        candidate = if attempt > MAX_NUMERIC_ATTEMPTS {
            random_fallback(base)
        } else {
            let mut next = format!("{}{}", base, attempt);
            next.truncate(MAX_USERNAME_LEN);
            next
        };
    }
}

fn random_fallback(base: &str) -> String {
    // leave room for "_" plus the 6-character suffix
    let mut stem = base.to_string();
    stem.truncate(MAX_USERNAME_LEN - 7);
    while stem.ends_with('_') {
        stem.pop();
    }
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}_{}", stem, &suffix[..6])
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    struct FakeStore {
        taken: HashMap<String, Uuid>,
    }

    impl FakeStore {
        fn new() -> Self {
            Self {
                taken: HashMap::new(),
            }
        }

        fn insert(&mut self, username: &str) -> Uuid {
            let id = Uuid::new_v4();
            self.taken.insert(username.to_string(), id);
            id
        }
    }

    #[async_trait]
    impl UsernameStore for FakeStore {
        async fn is_taken(
            &mut self,
            username: &str,
            exclude: Option<Uuid>,
        ) -> Result<bool, ApiError> {
            Ok(match self.taken.get(username) {
                Some(owner) => exclude != Some(*owner),
                None => false,
            })
        }
    }

    fn assert_well_formed(handle: &str) {
        assert!(!handle.is_empty());
        assert!(handle.len() <= MAX_USERNAME_LEN);
        assert!(!handle.starts_with('_'));
        assert!(!handle.ends_with('_'));
        assert!(handle
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'));
    }

    #[test]
    fn normalize_lowercases_and_collapses_runs() {
        assert_eq!(normalize("Ann!!"), "ann");
        assert_eq!(normalize("  John--Doe  "), "john_doe");
        assert_eq!(normalize("a..b..c"), "a_b_c");
        assert_eq!(normalize("__weird__"), "weird");
    }

    #[test]
    fn normalize_blank_input_is_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize("   "), "");
        assert_eq!(normalize("!!!"), "");
    }

    #[test]
    fn normalize_truncates_without_trailing_underscore() {
        let long = "a".repeat(40);
        assert_eq!(normalize(&long).len(), MAX_USERNAME_LEN);

        // character 30 lands on a separator run
        let tricky = format!("{}--{}", "a".repeat(29), "b".repeat(10));
        let result = normalize(&tricky);
        assert_well_formed(&result);
    }

    #[tokio::test]
    async fn resolve_returns_base_when_free() {
        let mut store = FakeStore::new();
        let handle = resolve_unique(&mut store, "ann", None).await.unwrap();
        assert_eq!(handle, "ann");
    }

    #[tokio::test]
    async fn resolve_appends_numeric_suffix() {
        let mut store = FakeStore::new();
        store.insert("ann");
        assert_eq!(resolve_unique(&mut store, "ann", None).await.unwrap(), "ann1");

        store.insert("ann1");
        assert_eq!(resolve_unique(&mut store, "ann", None).await.unwrap(), "ann2");
    }

    #[tokio::test]
    async fn resolve_falls_back_to_user_for_empty_base() {
        let mut store = FakeStore::new();
        assert_eq!(resolve_unique(&mut store, "", None).await.unwrap(), "user");
    }

    #[tokio::test]
    async fn resolve_skips_exclusion_owner() {
        let mut store = FakeStore::new();
        let owner = store.insert("ann");
        let handle = resolve_unique(&mut store, "ann", Some(owner)).await.unwrap();
        assert_eq!(handle, "ann");
    }

    #[tokio::test]
    async fn resolve_uses_random_suffix_after_exhausting_numeric_probes() {
        let mut store = FakeStore::new();
        store.insert("bob");
        for n in 1..=200 {
            store.insert(&format!("bob{}", n));
        }
        let handle = resolve_unique(&mut store, "bob", None).await.unwrap();
        assert!(handle.starts_with("bob_"));
        assert_eq!(handle.len(), "bob_".len() + 6);
        assert_well_formed(&handle);
        assert!(!store.taken.contains_key(&handle));
    }

    #[tokio::test]
    async fn resolve_differs_after_first_handle_is_persisted() {
        let mut store = FakeStore::new();
        let first = resolve_unique(&mut store, "carol", None).await.unwrap();
        store.insert(&first);
        let second = resolve_unique(&mut store, "carol", None).await.unwrap();
        assert_ne!(first, second);
    }
}
