/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ClientError;

/// Numeric user identifier as issued by the Bookstore API
pub type UserId = i64;

/// Roles a user account can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Role {
    #[serde(rename = "ROLE_MANAGER")]
    Manager,
    #[serde(rename = "ROLE_STAFF")]
    Staff,
    #[serde(rename = "ROLE_USER")]
    User,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Manager, Role::Staff, Role::User];

    /// Wire representation (`ROLE_MANAGER`, ...)
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Manager => "ROLE_MANAGER",
            Role::Staff => "ROLE_STAFF",
            Role::User => "ROLE_USER",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Role::Manager => "Manager",
            Role::Staff => "Staff",
            Role::User => "User",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ClientError;

    /// Accepts `ROLE_MANAGER`, `MANAGER` or `manager`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let short = upper.strip_prefix("ROLE_").unwrap_or(&upper);
        match short {
            "MANAGER" => Ok(Role::Manager),
            "STAFF" => Ok(Role::Staff),
            "USER" => Ok(Role::User),
            _ => Err(ClientError::invalid_input(format!("Unknown role '{}'", s))),
        }
    }
}

/// Fine-grained permissions granted per role
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Permission {
    UploadCsv,
    CreateAccount,
    UpdateAccount,
    AddBookInstance,
    AddBookData,
    AddInformation,
    RemoveAccount,
    RemoveBook,
    RemoveInformation,
    UpdateCoupon,
    RemoveCoupon,
    CreateCoupon,
    ViewCoupon,
    GenerateReport,
}

impl Permission {
    pub const ALL: [Permission; 14] = [
        Permission::UploadCsv,
        Permission::CreateAccount,
        Permission::UpdateAccount,
        Permission::AddBookInstance,
        Permission::AddBookData,
        Permission::AddInformation,
        Permission::RemoveAccount,
        Permission::RemoveBook,
        Permission::RemoveInformation,
        Permission::UpdateCoupon,
        Permission::RemoveCoupon,
        Permission::CreateCoupon,
        Permission::ViewCoupon,
        Permission::GenerateReport,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::UploadCsv => "UPLOAD_CSV",
            Permission::CreateAccount => "CREATE_ACCOUNT",
            Permission::UpdateAccount => "UPDATE_ACCOUNT",
            Permission::AddBookInstance => "ADD_BOOK_INSTANCE",
            Permission::AddBookData => "ADD_BOOK_DATA",
            Permission::AddInformation => "ADD_INFORMATION",
            Permission::RemoveAccount => "REMOVE_ACCOUNT",
            Permission::RemoveBook => "REMOVE_BOOK",
            Permission::RemoveInformation => "REMOVE_INFORMATION",
            Permission::UpdateCoupon => "UPDATE_COUPON",
            Permission::RemoveCoupon => "REMOVE_COUPON",
            Permission::CreateCoupon => "CREATE_COUPON",
            Permission::ViewCoupon => "VIEW_COUPON",
            Permission::GenerateReport => "GENERATE_REPORT",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Permission::UploadCsv => "Upload CSV",
            Permission::CreateAccount => "Create account",
            Permission::UpdateAccount => "Update account",
            Permission::AddBookInstance => "Add book instance",
            Permission::AddBookData => "Add book data",
            Permission::AddInformation => "Add information",
            Permission::RemoveAccount => "Remove account",
            Permission::RemoveBook => "Remove book",
            Permission::RemoveInformation => "Remove information",
            Permission::UpdateCoupon => "Update coupon",
            Permission::RemoveCoupon => "Remove coupon",
            Permission::CreateCoupon => "Create coupon",
            Permission::ViewCoupon => "View coupon",
            Permission::GenerateReport => "Generate report",
        }
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Permission {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_uppercase().replace('-', "_");
        Permission::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == wanted)
            .ok_or_else(|| ClientError::invalid_input(format!("Unknown permission '{}'", s)))
    }
}
