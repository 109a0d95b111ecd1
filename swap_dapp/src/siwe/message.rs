//! EIP-4361 "Sign-In with Ethereum" messages.
//!
//! https://eips.ethereum.org/EIPS/eip-4361

use std::{fmt, str::FromStr};

use chrono::{DateTime, FixedOffset, Utc};
use error_stack::{Report, ResultExt as _, report};
use swap_models::constants::chains::is_evm_address;

use crate::error::Error;

const HEADER_SUFFIX: &str = " wants you to sign in with your Ethereum account:";
const SUPPORTED_VERSION: &str = "1";
const MIN_NONCE_LEN: usize = 8;

const URI_TAG: &str = "URI: ";
const VERSION_TAG: &str = "Version: ";
const CHAIN_ID_TAG: &str = "Chain ID: ";
const NONCE_TAG: &str = "Nonce: ";
const ISSUED_AT_TAG: &str = "Issued At: ";
const EXPIRATION_TIME_TAG: &str = "Expiration Time: ";
const NOT_BEFORE_TAG: &str = "Not Before: ";
const REQUEST_ID_TAG: &str = "Request ID: ";
const RESOURCES_TAG: &str = "Resources:";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SiweMessage {
    /// Authority requesting the sign-in, without any scheme
    pub domain: String,
    pub scheme: Option<String>,
    pub address: String,
    pub statement: Option<String>,
    pub uri: String,
    pub version: String,
    pub chain_id: u64,
    pub nonce: String,
    pub issued_at: DateTime<FixedOffset>,
    pub expiration_time: Option<DateTime<FixedOffset>>,
    pub not_before: Option<DateTime<FixedOffset>>,
    pub request_id: Option<String>,
    pub resources: Vec<String>,
}

impl SiweMessage {
    /// Inside `[not_before, expiration_time)`, bounds being optional.
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if let Some(expiration_time) = self.expiration_time {
            if now >= expiration_time {
                return false;
            }
        }
        if let Some(not_before) = self.not_before {
            if now < not_before {
                return false;
            }
        }
        true
    }
}

fn message_error(reason: impl Into<String>) -> Report<Error> {
    report!(Error::SiweMessage(reason.into()))
}

fn parse_timestamp(tag: &str, value: &str) -> Result<DateTime<FixedOffset>, Report<Error>> {
    DateTime::parse_from_rfc3339(value)
        .change_context(Error::SiweMessage(format!("Invalid {}", tag.trim_end_matches(": "))))
        .attach_printable_lazy(|| value.to_string())
}

struct Lines<'a> {
    lines: Vec<&'a str>,
    position: usize,
}

impl<'a> Lines<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.lines.get(self.position).copied()
    }

    fn next_line(&mut self) -> Option<&'a str> {
        let line = self.peek();
        if line.is_some() {
            self.position += 1;
        }
        line
    }

    fn required(&mut self, tag: &str) -> Result<&'a str, Report<Error>> {
        self.optional(tag)
            .ok_or_else(|| message_error(format!("Missing \"{}\"", tag.trim_end())))
    }

    fn optional(&mut self, tag: &str) -> Option<&'a str> {
        let value = self.peek()?.strip_prefix(tag)?;
        self.position += 1;
        Some(value)
    }
}

impl FromStr for SiweMessage {
    type Err = Report<Error>;

    fn from_str(message: &str) -> Result<Self, Self::Err> {
        let mut lines = Lines {
            lines: message.split('\n').map(|line| line.trim_end_matches('\r')).collect(),
            position: 0,
        };

        let header = lines.next_line().unwrap_or_default();
        let authority = header
            .strip_suffix(HEADER_SUFFIX)
            .ok_or_else(|| message_error("Invalid header line"))?;
        let (scheme, domain) = match authority.split_once("://") {
            Some((scheme, domain)) => (Some(scheme.to_string()), domain.to_string()),
            None => (None, authority.to_string()),
        };
        if domain.is_empty() {
            return Err(message_error("Empty domain"));
        }

        let address = lines
            .next_line()
            .filter(|address| is_evm_address(address))
            .ok_or_else(|| message_error("Invalid address line"))?
            .to_string();

        let mut statement_lines = Vec::new();
        while let Some(line) = lines.peek() {
            if line.starts_with(URI_TAG) {
                break;
            }
            if !line.is_empty() {
                statement_lines.push(line);
            }
            lines.next_line();
        }
        let statement = (!statement_lines.is_empty()).then(|| statement_lines.join("\n"));

        let uri = lines.required(URI_TAG)?.to_string();
        let version = lines.required(VERSION_TAG)?.to_string();
        if version != SUPPORTED_VERSION {
            return Err(message_error(format!("Unsupported version {version}")));
        }
        let chain_id = lines
            .required(CHAIN_ID_TAG)?
            .parse::<u64>()
            .change_context(Error::SiweMessage("Invalid Chain ID".to_string()))?;
        let nonce = lines.required(NONCE_TAG)?.to_string();
        if nonce.len() < MIN_NONCE_LEN || !nonce.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(message_error("Nonce must be at least 8 alphanumeric characters"));
        }
        let issued_at = parse_timestamp(ISSUED_AT_TAG, lines.required(ISSUED_AT_TAG)?)?;
        let expiration_time = lines
            .optional(EXPIRATION_TIME_TAG)
            .map(|value| parse_timestamp(EXPIRATION_TIME_TAG, value))
            .transpose()?;
        let not_before = lines
            .optional(NOT_BEFORE_TAG)
            .map(|value| parse_timestamp(NOT_BEFORE_TAG, value))
            .transpose()?;
        let request_id = lines.optional(REQUEST_ID_TAG).map(ToString::to_string);

        let mut resources = Vec::new();
        if lines.optional(RESOURCES_TAG).is_some() {
            while let Some(resource) = lines.peek().and_then(|line| line.strip_prefix("- ")) {
                resources.push(resource.to_string());
                lines.next_line();
            }
        }

        if let Some(extra) = lines.lines[lines.position..]
            .iter()
            .find(|line| !line.is_empty())
        {
            return Err(message_error(format!("Unexpected line \"{extra}\"")));
        }

        Ok(Self {
            domain,
            scheme,
            address,
            statement,
            uri,
            version,
            chain_id,
            nonce,
            issued_at,
            expiration_time,
            not_before,
            request_id,
            resources,
        })
    }
}

impl fmt::Display for SiweMessage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if let Some(scheme) = &self.scheme {
            write!(f, "{scheme}://")?;
        }
        writeln!(f, "{}{HEADER_SUFFIX}", self.domain)?;
        writeln!(f, "{}", self.address)?;
        writeln!(f)?;
        if let Some(statement) = &self.statement {
            writeln!(f, "{statement}")?;
            writeln!(f)?;
        }
        writeln!(f, "{URI_TAG}{}", self.uri)?;
        writeln!(f, "{VERSION_TAG}{}", self.version)?;
        writeln!(f, "{CHAIN_ID_TAG}{}", self.chain_id)?;
        writeln!(f, "{NONCE_TAG}{}", self.nonce)?;
        write!(f, "{ISSUED_AT_TAG}{}", self.issued_at.to_rfc3339())?;
        if let Some(expiration_time) = self.expiration_time {
            write!(f, "\n{EXPIRATION_TIME_TAG}{}", expiration_time.to_rfc3339())?;
        }
        if let Some(not_before) = self.not_before {
            write!(f, "\n{NOT_BEFORE_TAG}{}", not_before.to_rfc3339())?;
        }
        if let Some(request_id) = &self.request_id {
            write!(f, "\n{REQUEST_ID_TAG}{request_id}")?;
        }
        if !self.resources.is_empty() {
            write!(f, "\n{RESOURCES_TAG}")?;
            for resource in &self.resources {
                write!(f, "\n- {resource}")?;
            }
        }
        Ok(())
    }
}
