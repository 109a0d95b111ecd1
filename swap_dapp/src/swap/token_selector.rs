use std::sync::Arc;

use error_stack::report;
use serde::Serialize;
use swap_models::constants::tokens::{Token, TokenRegistry};

use crate::error::{DappResult, Error};

pub const EXTENDED_OPTIONS: &str = "extendedOptions";
pub const FEWER_OPTIONS: &str = "fewerOptions";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectorOption {
    pub value: String,
    pub label: String,
    pub logo_uri: Option<String>,
}

impl SelectorOption {
    fn token(token: &Token) -> Self {
        Self {
            value: token.key(),
            label: token.symbol.clone(),
            logo_uri: Some(token.logo_uri.clone()),
        }
    }

    fn sentinel(value: &str, label: &str) -> Self {
        Self {
            value: value.to_string(),
            label: label.to_string(),
            logo_uri: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// A sentinel flipped the visible list; no token changed.
    Toggled { expanded: bool },
    Token(String),
}

/// Drop-down of tokens: the primary list, optionally followed by the
/// extended list, closed by one sentinel that toggles between the two.
#[derive(Debug, Clone)]
pub struct TokenSelector {
    registry: Arc<TokenRegistry>,
    expanded: bool,
}

impl TokenSelector {
    pub fn new(registry: Arc<TokenRegistry>) -> Self {
        Self {
            registry,
            expanded: false,
        }
    }

    pub fn is_expanded(&self) -> bool {
        self.expanded
    }

    pub fn options(&self) -> Vec<SelectorOption> {
        let mut options: Vec<SelectorOption> = self
            .registry
            .primary()
            .iter()
            .map(SelectorOption::token)
            .collect();

        if self.expanded {
            options.extend(self.registry.extended().iter().map(SelectorOption::token));
            options.push(SelectorOption::sentinel(FEWER_OPTIONS, "fewer options"));
        } else {
            options.push(SelectorOption::sentinel(EXTENDED_OPTIONS, "more options"));
        }
        options
    }

    /// Handles a raw option value. Sentinels only toggle the list; a real
    /// token invokes `on_token` with its lowercase symbol.
    pub fn select<F>(&mut self, value: &str, on_token: F) -> DappResult<Selection>
    where
        F: FnOnce(&str),
    {
        match value {
            EXTENDED_OPTIONS => {
                self.expanded = true;
                Ok(Selection::Toggled { expanded: true })
            }
            FEWER_OPTIONS => {
                self.expanded = false;
                Ok(Selection::Toggled { expanded: false })
            }
            _ => {
                let token = self
                    .registry
                    .get(value)
                    .ok_or_else(|| report!(Error::TokenNotFound(value.to_string())))?;
                let symbol = token.key();
                on_token(&symbol);
                Ok(Selection::Token(symbol))
            }
        }
    }
}
