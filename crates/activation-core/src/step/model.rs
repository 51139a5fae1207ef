//! Per-step data shapes.
//!
//! Every shape is what a step form edits and what the local cache persists.
//! None of them can hold a file: document attachments travel separately as
//! [`LocalFile`](crate::document::LocalFile) values.
//!
//! Each shape documents its presence rule: the single field that decides
//! whether a remote profile "has" this step.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::id::WizardStep;
use crate::error::Result;

/// A date as the forms edit it: three independent text inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DateParts {
    pub day: String,
    pub month: String,
    pub year: String,
}

impl DateParts {
    /// Splits a calendar date into zero-padded parts.
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            day: format!("{:02}", date.day()),
            month: format!("{:02}", date.month()),
            year: format!("{:04}", date.year()),
        }
    }

    /// Composes the parts into a calendar date.
    ///
    /// Returns `None` when any part is missing, non-numeric, or the
    /// combination is not a real date (e.g. 31 February).
    pub fn to_date(&self) -> Option<NaiveDate> {
        let day = self.day.trim().parse::<u32>().ok()?;
        let month = self.month.trim().parse::<u32>().ok()?;
        let year = self.year.trim().parse::<i32>().ok()?;
        NaiveDate::from_ymd_opt(year, month, day)
    }

    pub fn is_empty(&self) -> bool {
        self.day.trim().is_empty() && self.month.trim().is_empty() && self.year.trim().is_empty()
    }
}

/// Step 1. Present when `full_name` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PersonalInfo {
    pub full_name: String,
    pub father_name: String,
    pub date_of_birth: DateParts,
    pub gender: String,
    pub marital_status: String,
    pub phone_number: String,
    pub email: String,
    pub address: String,
    pub city: String,
}

impl PersonalInfo {
    pub fn is_populated(&self) -> bool {
        !self.full_name.trim().is_empty()
    }
}

/// A family member listed on step 2.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Relative {
    pub name: String,
    pub relationship: String,
    pub phone_number: String,
    pub id_number: String,
}

/// Step 2. Present when at least one relative has a name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FamilyInfo {
    pub family_relatives: Vec<Relative>,
}

impl FamilyInfo {
    pub fn is_populated(&self) -> bool {
        self.family_relatives
            .iter()
            .any(|r| !r.name.trim().is_empty())
    }
}

/// Step 3. Present when `employer_name` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EmploymentInfo {
    pub employment_type: String,
    pub employer_name: String,
    pub job_title: String,
    pub monthly_income: String,
    pub years_employed: String,
    pub office_address: String,
}

impl EmploymentInfo {
    pub fn is_populated(&self) -> bool {
        !self.employer_name.trim().is_empty()
    }
}

/// Step 4, scalar fields only. Present when `id_number` is non-empty.
///
/// The document images bound on this step are never part of this shape.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct IdentityInfo {
    pub id_number: String,
    pub id_issue_date: DateParts,
    pub id_expiry_date: DateParts,
}

impl IdentityInfo {
    pub fn is_populated(&self) -> bool {
        !self.id_number.trim().is_empty()
    }
}

/// A personal reference listed on step 5.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Reference {
    pub name: String,
    pub relationship: String,
    pub phone_number: String,
    pub address: String,
}

/// Step 6. Present when `iban` is non-empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BankDetails {
    pub bank_name: String,
    pub account_title: String,
    pub iban: String,
}

impl BankDetails {
    pub fn is_populated(&self) -> bool {
        !self.iban.trim().is_empty()
    }
}

/// The data saved for one step.
///
/// Serializes as the bare inner shape; step 5 is a JSON array. Decoding needs
/// the step number, see [`StepData::from_json`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum StepData {
    Personal(PersonalInfo),
    Family(FamilyInfo),
    Employment(EmploymentInfo),
    Identity(IdentityInfo),
    /// Step 5. Present when at least one reference has a name.
    References(Vec<Reference>),
    Bank(BankDetails),
}

impl StepData {
    /// The step this data belongs to.
    pub fn step(&self) -> WizardStep {
        match self {
            StepData::Personal(_) => WizardStep::Personal,
            StepData::Family(_) => WizardStep::Family,
            StepData::Employment(_) => WizardStep::Employment,
            StepData::Identity(_) => WizardStep::Identity,
            StepData::References(_) => WizardStep::References,
            StepData::Bank(_) => WizardStep::Bank,
        }
    }

    /// Applies the step's presence rule.
    pub fn is_populated(&self) -> bool {
        match self {
            StepData::Personal(p) => p.is_populated(),
            StepData::Family(f) => f.is_populated(),
            StepData::Employment(e) => e.is_populated(),
            StepData::Identity(i) => i.is_populated(),
            StepData::References(refs) => refs.iter().any(|r| !r.name.trim().is_empty()),
            StepData::Bank(b) => b.is_populated(),
        }
    }

    /// Decodes the JSON shape stored for `step`.
    pub fn from_json(step: WizardStep, value: Value) -> Result<Self> {
        let data = match step {
            WizardStep::Personal => StepData::Personal(serde_json::from_value(value)?),
            WizardStep::Family => StepData::Family(serde_json::from_value(value)?),
            WizardStep::Employment => StepData::Employment(serde_json::from_value(value)?),
            WizardStep::Identity => StepData::Identity(serde_json::from_value(value)?),
            WizardStep::References => StepData::References(serde_json::from_value(value)?),
            WizardStep::Bank => StepData::Bank(serde_json::from_value(value)?),
        };
        Ok(data)
    }

    pub fn to_json(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }
}
