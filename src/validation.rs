// Pre-flight validation of caller-supplied identifiers and dates

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::error::ClientError;

// Tenant ids are lowercase slugs: letter first, 3-63 chars
static TENANT_ID_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z][a-z0-9-]{2,62}$").unwrap());

/// Validate a tenant id (`acme-prod`)
pub fn validate_tenant_id(tenant_id: &str) -> Result<(), ClientError> {
    if TENANT_ID_PATTERN.is_match(tenant_id) && !tenant_id.ends_with('-') {
        Ok(())
    } else {
        Err(ClientError::Validation(format!(
            "invalid tenant id '{}': expected 3-63 lowercase letters, digits or hyphens, starting with a letter",
            tenant_id
        )))
    }
}

/// Validate an instance id (hyphenated UUID)
pub fn validate_instance_id(instance_id: &str) -> Result<(), ClientError> {
    validate_uuid("instance id", instance_id)
}

/// Validate any UUID-shaped resource id (snapshots, keys)
pub fn validate_uuid(kind: &str, value: &str) -> Result<(), ClientError> {
    // Uuid::parse_str also accepts simple and braced forms; the API only uses hyphenated
    match Uuid::parse_str(value) {
        Ok(_) if value.len() == 36 => Ok(()),
        _ => Err(ClientError::Validation(format!(
            "invalid {} '{}': expected a hyphenated UUID",
            kind, value
        ))),
    }
}

/// Validate a calendar date in `YYYY-MM-DD` form
pub fn validate_date(date: &str) -> Result<NaiveDate, ClientError> {
    if date.len() != 10 {
        return Err(invalid_date(date));
    }

    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid_date(date))
}

fn invalid_date(date: &str) -> ClientError {
    ClientError::Validation(format!("invalid date '{}': expected YYYY-MM-DD", date))
}
