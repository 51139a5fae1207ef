//! Step data mapper.
//!
//! The only place where the remote profile record and the six step shapes
//! are allowed to differ. Handles date composition/decomposition, field
//! renaming and defaulting in both directions. Pure functions, no I/O.

use std::collections::BTreeMap;

use activation_core::error::Result;
use activation_core::profile::{RemoteProfile, RemoteReference, RemoteRelative};
use activation_core::remote::StepUpdate;
use activation_core::step::{
    BankDetails, DateParts, EmploymentInfo, FamilyInfo, IdentityInfo, PersonalInfo, Reference,
    Relative, StepData, WizardState, WizardStep,
};
use chrono::NaiveDate;
use serde_json::Value;

/// Bidirectional translation between [`RemoteProfile`] and [`StepData`].
pub struct StepDataMapper;

impl StepDataMapper {
    /// Builds the wizard state a remote profile describes.
    ///
    /// Only steps passing their presence rule are included; the current step
    /// comes from the profile, clamped to 1..6 and defaulting to the first step.
    pub fn profile_to_state(profile: &RemoteProfile) -> WizardState {
        WizardState {
            steps: Self::profile_to_steps(profile),
            current_step: WizardStep::from_stored(profile.current_step),
        }
    }

    /// Extracts every present step from a remote profile.
    pub fn profile_to_steps(profile: &RemoteProfile) -> BTreeMap<WizardStep, StepData> {
        WizardStep::ALL
            .into_iter()
            .map(|step| Self::step_from_profile(step, profile))
            .filter(StepData::is_populated)
            .map(|data| (data.step(), data))
            .collect()
    }

    /// Extracts one step's shape from a remote profile, defaulting every
    /// missing field to empty.
    pub fn step_from_profile(step: WizardStep, profile: &RemoteProfile) -> StepData {
        match step {
            WizardStep::Personal => StepData::Personal(PersonalInfo {
                full_name: text(&profile.full_name),
                father_name: text(&profile.father_name),
                date_of_birth: date_parts(&profile.date_of_birth),
                gender: text(&profile.gender),
                marital_status: text(&profile.marital_status),
                phone_number: text(&profile.phone_number),
                email: text(&profile.email),
                address: text(&profile.address),
                city: text(&profile.city),
            }),
            WizardStep::Family => StepData::Family(FamilyInfo {
                family_relatives: profile
                    .family_relatives
                    .iter()
                    .flatten()
                    .map(|r| Relative {
                        name: text(&r.name),
                        relationship: text(&r.relation),
                        phone_number: text(&r.contact_number),
                        id_number: text(&r.cnic),
                    })
                    .collect(),
            }),
            WizardStep::Employment => StepData::Employment(EmploymentInfo {
                employment_type: text(&profile.employment_type),
                employer_name: text(&profile.employer_name),
                job_title: text(&profile.designation),
                monthly_income: profile.salary.map(format_amount).unwrap_or_default(),
                years_employed: profile
                    .years_employed
                    .map(|y| y.to_string())
                    .unwrap_or_default(),
                office_address: text(&profile.office_address),
            }),
            WizardStep::Identity => StepData::Identity(IdentityInfo {
                id_number: text(&profile.id_number),
                id_issue_date: date_parts(&profile.id_issue_date),
                id_expiry_date: date_parts(&profile.id_expiry_date),
            }),
            WizardStep::References => StepData::References(
                profile
                    .personal_references
                    .iter()
                    .flatten()
                    .map(|r| Reference {
                        name: text(&r.name),
                        relationship: text(&r.relation),
                        phone_number: text(&r.contact_number),
                        address: text(&r.address),
                    })
                    .collect(),
            ),
            WizardStep::Bank => StepData::Bank(BankDetails {
                bank_name: text(&profile.bank_name),
                account_title: text(&profile.account_title),
                iban: text(&profile.iban),
            }),
        }
    }

    /// Translates one step's data into the partial profile update sent to the
    /// remote service.
    ///
    /// The update carries only this step's fields, in remote naming, with
    /// dates composed into single values. Blank fields are omitted so they do
    /// not overwrite what the service already holds.
    pub fn step_to_update(data: &StepData) -> Result<StepUpdate> {
        let partial = match data {
            StepData::Personal(p) => RemoteProfile {
                full_name: non_empty(&p.full_name),
                father_name: non_empty(&p.father_name),
                date_of_birth: compose_date(&p.date_of_birth),
                gender: non_empty(&p.gender),
                marital_status: non_empty(&p.marital_status),
                phone_number: non_empty(&p.phone_number),
                email: non_empty(&p.email),
                address: non_empty(&p.address),
                city: non_empty(&p.city),
                ..Default::default()
            },
            StepData::Family(f) => RemoteProfile {
                family_relatives: Some(
                    f.family_relatives
                        .iter()
                        .map(|r| RemoteRelative {
                            name: non_empty(&r.name),
                            relation: non_empty(&r.relationship),
                            contact_number: non_empty(&r.phone_number),
                            cnic: non_empty(&r.id_number),
                        })
                        .collect(),
                ),
                ..Default::default()
            },
            StepData::Employment(e) => RemoteProfile {
                employment_type: non_empty(&e.employment_type),
                employer_name: non_empty(&e.employer_name),
                designation: non_empty(&e.job_title),
                salary: parse_amount(&e.monthly_income),
                years_employed: e.years_employed.trim().parse().ok(),
                office_address: non_empty(&e.office_address),
                ..Default::default()
            },
            StepData::Identity(i) => RemoteProfile {
                id_number: non_empty(&i.id_number),
                id_issue_date: compose_date(&i.id_issue_date),
                id_expiry_date: compose_date(&i.id_expiry_date),
                ..Default::default()
            },
            StepData::References(refs) => RemoteProfile {
                personal_references: Some(
                    refs.iter()
                        .map(|r| RemoteReference {
                            name: non_empty(&r.name),
                            relation: non_empty(&r.relationship),
                            contact_number: non_empty(&r.phone_number),
                            address: non_empty(&r.address),
                        })
                        .collect(),
                ),
                ..Default::default()
            },
            StepData::Bank(b) => RemoteProfile {
                bank_name: non_empty(&b.bank_name),
                account_title: non_empty(&b.account_title),
                iban: non_empty(&b.iban),
                ..Default::default()
            },
        };

        Ok(StepUpdate {
            step: data.step().index(),
            data: strip_nulls(serde_json::to_value(partial)?),
        })
    }
}

// ============================================================================
// Field helpers
// ============================================================================

fn text(value: &Option<String>) -> String {
    value.as_deref().map(str::trim).unwrap_or_default().to_string()
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Parses the date part of an ISO-8601 date or datetime.
fn parse_remote_date(value: &str) -> Option<NaiveDate> {
    let date_part = value.trim().get(..10)?;
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn date_parts(value: &Option<String>) -> DateParts {
    value
        .as_deref()
        .and_then(parse_remote_date)
        .map(DateParts::from_date)
        .unwrap_or_default()
}

fn compose_date(parts: &DateParts) -> Option<String> {
    parts.to_date().map(|d| d.format("%Y-%m-%d").to_string())
}

/// Accepts thousands separators, e.g. `"85,000"`.
fn parse_amount(value: &str) -> Option<f64> {
    let cleaned: String = value.chars().filter(|c| *c != ',' && !c.is_whitespace()).collect();
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

fn format_amount(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{:.0}", value)
    } else {
        value.to_string()
    }
}

fn strip_nulls(value: Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.into_iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k, strip_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.into_iter().map(strip_nulls).collect()),
        other => other,
    }
}
