//! Remote profile record.
//!
//! The remote service keeps every step's facts in one flat record, with its
//! own field names and single-value dates. Only the step data mapper in the
//! infrastructure layer translates between this shape and [`StepData`].
//!
//! [`StepData`]: crate::step::StepData

use serde::{Deserialize, Serialize};

/// A family member as the remote service stores it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteRelative {
    pub name: Option<String>,
    pub relation: Option<String>,
    pub contact_number: Option<String>,
    pub cnic: Option<String>,
}

/// A personal reference as the remote service stores it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteReference {
    pub name: Option<String>,
    pub relation: Option<String>,
    pub contact_number: Option<String>,
    pub address: Option<String>,
}

/// The remote profile record.
///
/// Dates are ISO-8601 strings (`YYYY-MM-DD`, optionally with a time part).
/// Unknown fields sent by the service are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RemoteProfile {
    // Step 1
    pub full_name: Option<String>,
    pub father_name: Option<String>,
    pub date_of_birth: Option<String>,
    pub gender: Option<String>,
    pub marital_status: Option<String>,
    pub phone_number: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,

    // Step 2
    pub family_relatives: Option<Vec<RemoteRelative>>,

    // Step 3
    pub employment_type: Option<String>,
    pub employer_name: Option<String>,
    pub designation: Option<String>,
    pub salary: Option<f64>,
    pub years_employed: Option<u32>,
    pub office_address: Option<String>,

    // Step 4
    pub id_number: Option<String>,
    pub id_issue_date: Option<String>,
    pub id_expiry_date: Option<String>,

    // Step 5
    pub personal_references: Option<Vec<RemoteReference>>,

    // Step 6
    pub bank_name: Option<String>,
    pub account_title: Option<String>,
    pub iban: Option<String>,

    // Status metadata
    pub activation_status: Option<String>,
    pub current_step: Option<i64>,
}

/// Body of the profile-fetch endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileEnvelope {
    #[serde(default)]
    pub profile: Option<RemoteProfile>,
}
