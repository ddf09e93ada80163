//! Access-token providers.
//!
//! Token refresh is someone else's job; a provider just hands out a bearer
//! token for an account.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::{CalendarError, Result};

/// Supplies bearer tokens per calendar account.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn access_token(&self, account: &str) -> Result<String>;
}

/// Fixed tokens, typically loaded from the environment.
#[derive(Debug, Clone, Default)]
pub struct StaticTokenProvider {
    tokens: HashMap<String, String>,
}

impl StaticTokenProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(mut self, account: impl Into<String>, token: impl Into<String>) -> Self {
        self.tokens.insert(account.into(), token.into());
        self
    }

    /// Parse `account=token` pairs separated by commas.
    ///
    /// Malformed pairs are skipped.
    pub fn parse(spec: &str) -> Self {
        let tokens = spec
            .split(',')
            .filter_map(|pair| pair.split_once('='))
            .map(|(account, token)| (account.trim().to_string(), token.trim().to_string()))
            .filter(|(account, token)| !account.is_empty() && !token.is_empty())
            .collect();
        Self { tokens }
    }

    /// Accounts that have a token.
    pub fn accounts(&self) -> Vec<String> {
        let mut accounts: Vec<String> = self.tokens.keys().cloned().collect();
        accounts.sort();
        accounts
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self, account: &str) -> Result<String> {
        self.tokens
            .get(account)
            .cloned()
            .ok_or_else(|| CalendarError::MissingToken(account.to_string()))
    }
}
