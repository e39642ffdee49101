//! Cursor pagination types for transfer searches.
//!
//! The upstream hands back an opaque cursor with every page; an empty
//! cursor means the search is exhausted.

use std::fmt;

/// Opaque cursor for pagination.
///
/// The cursor value is implementation-specific and should be treated
/// as an opaque token by clients.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Cursor {
    pub value: String,
}

impl Cursor {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
        }
    }

    /// Convert an upstream cursor into the next position, `None` once exhausted.
    pub fn next(value: &str) -> Option<Self> {
        if value.is_empty() {
            None
        } else {
            Some(Self::new(value))
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

/// Ordering direction for searches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    /// Oldest first.
    Asc,
    /// Newest first.
    #[default]
    Desc,
}

/// Search predicate and paging parameters for a transfer search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferQuery {
    /// Account whose transfers are searched.
    pub account: String,
    /// Token contract emitting the actions.
    pub contract: String,
    /// Action name (e.g. `transfer`).
    pub action: String,
    /// Page size.
    pub limit: u32,
    pub order: OrderDirection,
    /// Upper block bound (inclusive).
    pub to_block: Option<u64>,
}

impl TransferQuery {
    pub fn new(account: impl Into<String>, contract: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            account: account.into(),
            contract: contract.into(),
            action: action.into(),
            limit: 100,
            order: OrderDirection::Desc,
            to_block: None,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_to_block(mut self, to_block: Option<u64>) -> Self {
        self.to_block = to_block;
        self
    }

    /// Search expression in the indexer query language.
    pub fn search_string(&self) -> String {
        format!(
            "receiver:{} account:{} action:{}",
            self.account, self.contract, self.action
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_cursor_ends_pagination() {
        assert_eq!(Cursor::next(""), None);
        assert_eq!(Cursor::next("abc"), Some(Cursor::new("abc")));
    }

    #[test]
    fn query_defaults_and_search_string() {
        let query = TransferQuery::new("alice", "eosio.token", "transfer").with_to_block(Some(42));
        assert_eq!(query.limit, 100);
        assert_eq!(query.order, OrderDirection::Desc);
        assert_eq!(query.to_block, Some(42));
        assert_eq!(
            query.search_string(),
            "receiver:alice account:eosio.token action:transfer"
        );
    }
}
