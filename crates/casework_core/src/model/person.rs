//! Person (registry entry) domain model.
//!
//! # Responsibility
//! - Define the registry record and its registration/patch inputs.
//! - Normalize national ids and derive age from birth date.
//!
//! # Invariants
//! - `national_id` is always stored in the `000.000.000-00` form.
//! - `age` is recomputed from `birth_date` whenever a value is built.
//! - `id` and `registered_on` never change after registration.
//!
//! Uniqueness of `national_id` across the collection is enforced by
//! `PersonService`, not here.

use crate::model::record::{optional_text, text, FieldMatch, FieldValue, Record};
use chrono::{Datelike, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static NON_DIGIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\D").expect("valid non-digit regex"));
static NATIONAL_ID_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{3})(\d{3})(\d{3})(\d{2})$").expect("valid national id regex"));

pub type PersonId = String;

pub const FIELD_ID: &str = "id";
pub const FIELD_FULL_NAME: &str = "nomeCompleto";
pub const FIELD_NATIONAL_ID: &str = "cpf";
pub const FIELD_BIRTH_DATE: &str = "dataNascimento";
pub const FIELD_AGE: &str = "idade";
pub const FIELD_SEX: &str = "sexo";
pub const FIELD_PHONES: &str = "telefones";
pub const FIELD_ADDRESS: &str = "enderecoCompleto";
pub const FIELD_GUARDIAN_NAME: &str = "responsavelLegalNome";
pub const FIELD_GUARDIAN_NATIONAL_ID: &str = "responsavelLegalCpf";
pub const FIELD_REGISTERED_ON: &str = "dataCadastro";

/// Registered sex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Sex {
    #[serde(rename = "M")]
    Male,
    #[serde(rename = "F")]
    Female,
    #[serde(rename = "O", alias = "Outro")]
    Other,
}

impl Sex {
    /// External code (`M`, `F`, `O`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "M",
            Self::Female => "F",
            Self::Other => "O",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "M" => Some(Self::Male),
            "F" => Some(Self::Female),
            "O" | "Outro" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Registry entry for one served person.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    pub id: PersonId,
    #[serde(rename = "nomeCompleto")]
    pub full_name: String,
    #[serde(rename = "cpf")]
    pub national_id: String,
    #[serde(rename = "dataNascimento")]
    pub birth_date: NaiveDate,
    #[serde(rename = "idade")]
    pub age: u32,
    #[serde(rename = "sexo")]
    pub sex: Sex,
    #[serde(rename = "telefones")]
    pub phones: String,
    #[serde(rename = "enderecoCompleto")]
    pub address: String,
    #[serde(rename = "responsavelLegalNome")]
    pub guardian_name: Option<String>,
    #[serde(rename = "responsavelLegalCpf")]
    pub guardian_national_id: Option<String>,
    #[serde(rename = "dataCadastro")]
    pub registered_on: NaiveDate,
}

/// Registration input. Required fields are optional here so missing values
/// surface as validation errors instead of decode failures.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewPerson {
    #[serde(rename = "nomeCompleto")]
    pub full_name: String,
    #[serde(rename = "cpf")]
    pub national_id: String,
    #[serde(rename = "dataNascimento")]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "sexo")]
    pub sex: Option<Sex>,
    #[serde(rename = "telefones")]
    pub phones: String,
    #[serde(rename = "enderecoCompleto")]
    pub address: String,
    #[serde(rename = "responsavelLegalNome")]
    pub guardian_name: Option<String>,
    #[serde(rename = "responsavelLegalCpf")]
    pub guardian_national_id: Option<String>,
}

/// Partial update. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PersonPatch {
    #[serde(rename = "nomeCompleto")]
    pub full_name: Option<String>,
    #[serde(rename = "cpf")]
    pub national_id: Option<String>,
    #[serde(rename = "dataNascimento")]
    pub birth_date: Option<NaiveDate>,
    #[serde(rename = "sexo")]
    pub sex: Option<Sex>,
    #[serde(rename = "telefones")]
    pub phones: Option<String>,
    #[serde(rename = "enderecoCompleto")]
    pub address: Option<String>,
    #[serde(rename = "responsavelLegalNome")]
    pub guardian_name: Option<String>,
    #[serde(rename = "responsavelLegalCpf")]
    pub guardian_national_id: Option<String>,
}

/// Person validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PersonValidationError {
    MissingField(&'static str),
    InvalidNationalId(String),
    BirthDateInFuture(NaiveDate),
}

impl Display for PersonValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field is missing: {field}"),
            Self::InvalidNationalId(value) => {
                write!(f, "national id must contain exactly 11 digits, got `{value}`")
            }
            Self::BirthDateInFuture(date) => write!(f, "birth date {date} is in the future"),
        }
    }
}

impl Error for PersonValidationError {}

impl Person {
    /// Builds a registry entry from registration input.
    ///
    /// `today` drives both `age` and `registered_on`.
    pub fn register(
        id: impl Into<PersonId>,
        input: NewPerson,
        today: NaiveDate,
    ) -> Result<Self, PersonValidationError> {
        let full_name = required_text(input.full_name, FIELD_FULL_NAME)?;
        if input.national_id.trim().is_empty() {
            return Err(PersonValidationError::MissingField(FIELD_NATIONAL_ID));
        }
        let national_id = normalize_national_id(&input.national_id)?;
        let birth_date = input
            .birth_date
            .ok_or(PersonValidationError::MissingField(FIELD_BIRTH_DATE))?;
        let sex = input
            .sex
            .ok_or(PersonValidationError::MissingField(FIELD_SEX))?;

        let person = Self {
            id: id.into(),
            full_name,
            national_id,
            birth_date,
            age: age_on(birth_date, today),
            sex,
            phones: input.phones.trim().to_string(),
            address: input.address.trim().to_string(),
            guardian_name: non_blank(input.guardian_name),
            guardian_national_id: normalize_optional_national_id(input.guardian_national_id)?,
            registered_on: today,
        };
        person.validate(today)?;
        Ok(person)
    }

    /// Returns a replacement value with `patch` applied.
    ///
    /// `id` and `registered_on` are preserved; `age` is recomputed.
    pub fn patched(
        &self,
        patch: PersonPatch,
        today: NaiveDate,
    ) -> Result<Self, PersonValidationError> {
        let mut next = self.clone();
        if let Some(full_name) = patch.full_name {
            next.full_name = required_text(full_name, FIELD_FULL_NAME)?;
        }
        if let Some(national_id) = patch.national_id {
            next.national_id = normalize_national_id(&national_id)?;
        }
        if let Some(birth_date) = patch.birth_date {
            next.birth_date = birth_date;
        }
        if let Some(sex) = patch.sex {
            next.sex = sex;
        }
        if let Some(phones) = patch.phones {
            next.phones = phones.trim().to_string();
        }
        if let Some(address) = patch.address {
            next.address = address.trim().to_string();
        }
        if patch.guardian_name.is_some() {
            next.guardian_name = non_blank(patch.guardian_name);
        }
        if patch.guardian_national_id.is_some() {
            next.guardian_national_id =
                normalize_optional_national_id(patch.guardian_national_id)?;
        }
        next.age = age_on(next.birth_date, today);
        next.validate(today)?;
        Ok(next)
    }

    /// Checks field-level invariants.
    pub fn validate(&self, today: NaiveDate) -> Result<(), PersonValidationError> {
        if self.full_name.trim().is_empty() {
            return Err(PersonValidationError::MissingField(FIELD_FULL_NAME));
        }
        if normalize_national_id(&self.national_id)? != self.national_id {
            return Err(PersonValidationError::InvalidNationalId(
                self.national_id.clone(),
            ));
        }
        if self.birth_date > today {
            return Err(PersonValidationError::BirthDateInFuture(self.birth_date));
        }
        Ok(())
    }
}

impl Record for Person {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            FIELD_ID => text(&self.id),
            FIELD_FULL_NAME => text(&self.full_name),
            FIELD_NATIONAL_ID => text(&self.national_id),
            FIELD_BIRTH_DATE => Some(FieldValue::Date(self.birth_date)),
            FIELD_AGE => Some(FieldValue::Integer(i64::from(self.age))),
            FIELD_SEX => text(self.sex.as_str()),
            FIELD_PHONES => text(&self.phones),
            FIELD_ADDRESS => text(&self.address),
            FIELD_GUARDIAN_NAME => optional_text(self.guardian_name.as_ref()),
            FIELD_GUARDIAN_NATIONAL_ID => optional_text(self.guardian_national_id.as_ref()),
            FIELD_REGISTERED_ON => Some(FieldValue::Date(self.registered_on)),
            _ => None,
        }
    }

    fn field_match(name: &str) -> FieldMatch {
        match name {
            FIELD_FULL_NAME | FIELD_ADDRESS | FIELD_GUARDIAN_NAME => FieldMatch::CaseInsensitive,
            _ => FieldMatch::Exact,
        }
    }
}

/// Whole years between `birth_date` and `today`.
///
/// One year is subtracted while this year's birthday is still ahead.
/// Birth dates after `today` yield `0`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> u32 {
    let mut years = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        years -= 1;
    }
    u32::try_from(years).unwrap_or(0)
}

/// Renders any input with exactly 11 digits as `000.000.000-00`.
pub fn normalize_national_id(raw: &str) -> Result<String, PersonValidationError> {
    let digits = NON_DIGIT_RE.replace_all(raw, "");
    if !NATIONAL_ID_RE.is_match(&digits) {
        return Err(PersonValidationError::InvalidNationalId(raw.to_string()));
    }
    Ok(NATIONAL_ID_RE.replace(&digits, "$1.$2.$3-$4").into_owned())
}

fn normalize_optional_national_id(
    raw: Option<String>,
) -> Result<Option<String>, PersonValidationError> {
    match non_blank(raw) {
        Some(value) => normalize_national_id(&value).map(Some),
        None => Ok(None),
    }
}

fn required_text(value: String, field: &'static str) -> Result<String, PersonValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(PersonValidationError::MissingField(field));
    }
    Ok(trimmed.to_string())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{age_on, normalize_national_id, NewPerson, Person, PersonPatch, Sex};
    use chrono::NaiveDate;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn input() -> NewPerson {
        NewPerson {
            full_name: "  Maria Silva Santos ".to_string(),
            national_id: "12345678900".to_string(),
            birth_date: Some(day(1978, 5, 15)),
            sex: Some(Sex::Female),
            guardian_name: Some("   ".to_string()),
            ..NewPerson::default()
        }
    }

    #[test]
    fn age_drops_a_year_before_the_birthday() {
        assert_eq!(age_on(day(1978, 5, 15), day(2024, 5, 14)), 45);
        assert_eq!(age_on(day(1978, 5, 15), day(2024, 5, 15)), 46);
        assert_eq!(age_on(day(2030, 1, 1), day(2024, 1, 1)), 0);
    }

    #[test]
    fn national_id_is_masked_from_digits() {
        assert_eq!(
            normalize_national_id("123.456.789-00").expect("masked input"),
            "123.456.789-00"
        );
        assert_eq!(
            normalize_national_id("987 654 321 00").expect("spaced input"),
            "987.654.321-00"
        );
        assert!(normalize_national_id("1234").is_err());
    }

    #[test]
    fn register_normalizes_and_derives_fields() {
        let person = Person::register("p-1", input(), day(2024, 1, 15)).expect("valid input");
        assert_eq!(person.full_name, "Maria Silva Santos");
        assert_eq!(person.national_id, "123.456.789-00");
        assert_eq!(person.age, 45);
        assert_eq!(person.guardian_name, None);
        assert_eq!(person.registered_on, day(2024, 1, 15));
    }

    #[test]
    fn register_requires_sex_and_birth_date() {
        let mut missing_sex = input();
        missing_sex.sex = None;
        let err = Person::register("p-1", missing_sex, day(2024, 1, 15)).expect_err("no sex");
        assert_eq!(err.to_string(), "required field is missing: sexo");

        let mut future = input();
        future.birth_date = Some(day(2025, 1, 1));
        assert!(Person::register("p-1", future, day(2024, 1, 15)).is_err());
    }

    #[test]
    fn patch_keeps_identity_and_recomputes_age() {
        let person = Person::register("p-1", input(), day(2024, 1, 15)).expect("valid input");
        let patched = person
            .patched(
                PersonPatch {
                    birth_date: Some(day(1990, 1, 1)),
                    ..PersonPatch::default()
                },
                day(2024, 6, 1),
            )
            .expect("valid patch");
        assert_eq!(patched.id, "p-1");
        assert_eq!(patched.registered_on, day(2024, 1, 15));
        assert_eq!(patched.age, 34);
    }

    #[test]
    fn serde_uses_external_field_names() {
        let person = Person::register("p-1", input(), day(2024, 1, 15)).expect("valid input");
        let json = serde_json::to_value(&person).expect("serializable");
        assert_eq!(json["nomeCompleto"], "Maria Silva Santos");
        assert_eq!(json["sexo"], "F");
        assert_eq!(json["dataNascimento"], "1978-05-15");
    }
}
