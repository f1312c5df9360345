//! Transaction context supplied with an explicit evaluation. Every field is
//! optional on the wire so partially-filled transactions deserialize.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionType {
    Transfer,
    Payment,
    Deposit,
    Withdrawal,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TransactionType {
    pub fn code(self) -> f64 {
        match self {
            TransactionType::Transfer => 1.0,
            TransactionType::Payment => 2.0,
            TransactionType::Deposit => 3.0,
            TransactionType::Withdrawal => 4.0,
            TransactionType::Unknown => 0.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TransactionType::Transfer => "transfer",
            TransactionType::Payment => "payment",
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
    Blocked,
    #[default]
    #[serde(other)]
    Unknown,
}

impl TransactionStatus {
    pub fn code(self) -> f64 {
        match self {
            TransactionStatus::Pending => 1.0,
            TransactionStatus::Completed => 2.0,
            TransactionStatus::Failed => 3.0,
            TransactionStatus::Blocked => 4.0,
            TransactionStatus::Unknown => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionLocation {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub city: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub amount: f64,
    #[serde(default)]
    pub account: String,
    #[serde(default)]
    pub account_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    #[serde(default, rename = "type")]
    pub tx_type: TransactionType,
    #[serde(default)]
    pub status: TransactionStatus,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<TransactionLocation>,
}

impl Transaction {
    pub fn new(id: impl Into<String>, amount: f64, tx_type: TransactionType) -> Self {
        Self {
            id: id.into(),
            amount,
            account: String::new(),
            account_name: String::new(),
            note: None,
            tx_type,
            status: TransactionStatus::Pending,
            timestamp: Utc::now(),
            location: None,
        }
    }

    pub fn with_location(mut self, latitude: f64, longitude: f64) -> Self {
        self.location = Some(TransactionLocation {
            latitude,
            longitude,
            city: None,
        });
        self
    }
}
