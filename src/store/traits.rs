//! `RecipientStore` trait for async lookup of senior citizens to notify.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::error::DatabaseError;
use crate::sms::Recipient;

/// Registration status of a senior citizen record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SeniorStatus {
    #[default]
    Active,
    Inactive,
    Deceased,
}

impl SeniorStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
            Self::Deceased => "deceased",
        }
    }
}

/// A senior citizen record to insert.
#[derive(Debug, Clone, Default)]
pub struct NewSenior {
    pub first_name: String,
    pub last_name: String,
    pub barangay: String,
    pub contact_number: Option<String>,
    pub emergency_contact_number: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub status: SeniorStatus,
}

/// A senior whose birthday falls on the queried date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Celebrant {
    pub recipient: Recipient,
    /// Age reached on the queried date.
    pub age: u32,
}

/// Backend-agnostic recipient lookup.
#[async_trait]
pub trait RecipientStore: Send + Sync {
    /// Register a senior citizen. Returns the generated id.
    async fn insert_senior(&self, senior: &NewSenior) -> Result<String, DatabaseError>;

    /// Phone recipients for every active senior, optionally limited to one barangay.
    ///
    /// The emergency contact number wins over the primary contact number;
    /// seniors with neither are skipped.
    async fn active_recipients(
        &self,
        barangay: Option<&str>,
    ) -> Result<Vec<Recipient>, DatabaseError>;

    /// Active seniors whose birth month and day match `date`.
    async fn birthday_celebrants(
        &self,
        date: NaiveDate,
        barangay: Option<&str>,
    ) -> Result<Vec<Celebrant>, DatabaseError>;
}

/// Choose the number to text: emergency contact first, then primary.
pub fn preferred_number(contact: Option<&str>, emergency: Option<&str>) -> Option<String> {
    fn usable(n: Option<&str>) -> Option<&str> {
        n.map(str::trim).filter(|n| !n.is_empty())
    }
    usable(emergency)
        .or_else(|| usable(contact))
        .map(str::to_string)
}
