use std::fmt::{Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Logical operation an adapter can serve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    TokenMetadata,
    SecurityScan,
    MarketData,
    ContractSource,
}

impl Operation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TokenMetadata => "token_metadata",
            Self::SecurityScan => "security_scan",
            Self::MarketData => "market_data",
            Self::ContractSource => "contract_source",
        }
    }
}

impl Display for Operation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operation {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "token_metadata" | "metadata" => Ok(Self::TokenMetadata),
            "security_scan" | "security" => Ok(Self::SecurityScan),
            "market_data" | "market" => Ok(Self::MarketData),
            "contract_source" | "source" => Ok(Self::ContractSource),
            other => Err(ValidationError::InvalidOperation {
                value: other.to_owned(),
            }),
        }
    }
}

/// Operations served by one adapter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationSet {
    pub token_metadata: bool,
    pub security_scan: bool,
    pub market_data: bool,
    pub contract_source: bool,
}

impl Default for OperationSet {
    fn default() -> Self {
        Self::all()
    }
}

impl OperationSet {
    pub const fn new(
        token_metadata: bool,
        security_scan: bool,
        market_data: bool,
        contract_source: bool,
    ) -> Self {
        Self {
            token_metadata,
            security_scan,
            market_data,
            contract_source,
        }
    }

    pub const fn all() -> Self {
        Self::new(true, true, true, true)
    }

    pub const fn none() -> Self {
        Self::new(false, false, false, false)
    }

    pub const fn only(operation: Operation) -> Self {
        Self::none().with(operation)
    }

    pub const fn with(mut self, operation: Operation) -> Self {
        match operation {
            Operation::TokenMetadata => self.token_metadata = true,
            Operation::SecurityScan => self.security_scan = true,
            Operation::MarketData => self.market_data = true,
            Operation::ContractSource => self.contract_source = true,
        }
        self
    }

    pub const fn supports(self, operation: Operation) -> bool {
        match operation {
            Operation::TokenMetadata => self.token_metadata,
            Operation::SecurityScan => self.security_scan,
            Operation::MarketData => self.market_data,
            Operation::ContractSource => self.contract_source,
        }
    }
}

impl FromIterator<Operation> for OperationSet {
    fn from_iter<I: IntoIterator<Item = Operation>>(iter: I) -> Self {
        iter.into_iter().fold(Self::none(), Self::with)
    }
}
