//! Attendance (service record) domain model.
//!
//! # Responsibility
//! - Define the attendance record, its closed enumerations and the
//!   submission/patch inputs.
//!
//! # Invariants
//! - `id` and `created_at` never change after submission.
//! - `person_id` is a weak reference; no cascade is implied.
//! - `mode_other` is set iff `mode == AttendanceMode::Other`.
//! - `services` holds no duplicates.

use crate::model::person::PersonId;
use crate::model::record::{iso_date, optional_text, text, FieldMatch, FieldValue, Record};
use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type AttendanceId = String;

pub const FIELD_ID: &str = "id";
pub const FIELD_PERSON_ID: &str = "userId";
pub const FIELD_PERSON_NAME: &str = "userName";
pub const FIELD_PERSON_NATIONAL_ID: &str = "userCpf";
pub const FIELD_DATE: &str = "dataAtendimento";
pub const FIELD_KIND: &str = "tipoAtendimento";
pub const FIELD_MODE: &str = "formaAtendimento";
pub const FIELD_MODE_OTHER: &str = "formaAtendimentoOutros";
pub const FIELD_TECHNICIAN: &str = "tecnicoResponsavel";
pub const FIELD_DEMAND: &str = "demandaApresentada";
pub const FIELD_SERVICES: &str = "servicoBeneficio";
pub const FIELD_REFERRALS: &str = "encaminhamentosRealizados";
pub const FIELD_OBSERVATIONS: &str = "observacoesTecnico";
pub const FIELD_SOCIAL_OPINION: &str = "parecerSocial";
pub const FIELD_OUTCOME: &str = "resultado";
pub const FIELD_CREATED_AT: &str = "dataCriacao";

/// Bucket label shared by every free-text service tag.
pub const OTHER_SERVICE_LABEL: &str = "Outros";

/// Attendance kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceKind {
    #[serde(rename = "Inicial")]
    Initial,
    #[serde(rename = "Retorno")]
    Return,
    #[serde(rename = "Encaminhamento")]
    Referral,
    #[serde(rename = "Acompanhamento")]
    FollowUp,
}

impl AttendanceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Initial => "Inicial",
            Self::Return => "Retorno",
            Self::Referral => "Encaminhamento",
            Self::FollowUp => "Acompanhamento",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Inicial" => Some(Self::Initial),
            "Retorno" => Some(Self::Return),
            "Encaminhamento" => Some(Self::Referral),
            "Acompanhamento" => Some(Self::FollowUp),
            _ => None,
        }
    }
}

/// How the attendance took place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttendanceMode {
    #[serde(rename = "Presencial")]
    InPerson,
    #[serde(rename = "Telefônico", alias = "Telefonico")]
    Phone,
    #[serde(rename = "Domiciliar")]
    HomeVisit,
    #[serde(rename = "Videoconferência", alias = "Videoconferencia")]
    Video,
    #[serde(rename = "Outros")]
    Other,
}

impl AttendanceMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::InPerson => "Presencial",
            Self::Phone => "Telefônico",
            Self::HomeVisit => "Domiciliar",
            Self::Video => "Videoconferência",
            Self::Other => "Outros",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Presencial" => Some(Self::InPerson),
            "Telefônico" | "Telefonico" => Some(Self::Phone),
            "Domiciliar" => Some(Self::HomeVisit),
            "Videoconferência" | "Videoconferencia" => Some(Self::Video),
            "Outros" => Some(Self::Other),
            _ => None,
        }
    }
}

/// Decision recorded for the attendance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Outcome {
    #[serde(rename = "APROVADO", alias = "DEFERIDO")]
    Approved,
    #[default]
    #[serde(rename = "PENDENTE")]
    Pending,
    #[serde(rename = "NEGADO", alias = "INDEFERIDO")]
    Denied,
}

impl Outcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approved => "APROVADO",
            Self::Pending => "PENDENTE",
            Self::Denied => "NEGADO",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "APROVADO" | "DEFERIDO" => Some(Self::Approved),
            "PENDENTE" => Some(Self::Pending),
            "NEGADO" | "INDEFERIDO" => Some(Self::Denied),
            _ => None,
        }
    }
}

/// Requested service or benefit.
///
/// Serialized as its display label; unknown labels decode to `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ServiceTag {
    ContinuousBenefit,
    SingleRegistry,
    MunicipalAid,
    AutismCard,
    SocialAssistanceReferral,
    HealthSecurityJusticeReferral,
    Other(String),
}

const SERVICE_LABELS: &[(&str, ServiceTag)] = &[
    (
        "BPC – Benefício de Prestação Continuada",
        ServiceTag::ContinuousBenefit,
    ),
    ("Cadastro Único / Atualização", ServiceTag::SingleRegistry),
    ("Auxílio Municipal – AME", ServiceTag::MunicipalAid),
    ("CPTEA", ServiceTag::AutismCard),
    (
        "Encaminhamento para CRAS / CREAS",
        ServiceTag::SocialAssistanceReferral,
    ),
    (
        "Encaminhamento para saúde / INSS / Justiça",
        ServiceTag::HealthSecurityJusticeReferral,
    ),
];

impl ServiceTag {
    /// Display label; the free text for `Other`.
    pub fn label(&self) -> &str {
        match self {
            Self::Other(text) => text.as_str(),
            known => SERVICE_LABELS
                .iter()
                .find(|(_, tag)| tag == known)
                .map_or(OTHER_SERVICE_LABEL, |(label, _)| *label),
        }
    }

    /// Report bucket key; every `Other` tag shares one bucket.
    pub fn bucket_label(&self) -> &str {
        match self {
            Self::Other(_) => OTHER_SERVICE_LABEL,
            known => known.label(),
        }
    }

    /// Maps a label to a known tag, or wraps it as `Other`.
    pub fn from_label(label: &str) -> Self {
        let trimmed = label.trim();
        SERVICE_LABELS
            .iter()
            .find(|(known, _)| *known == trimmed)
            .map_or_else(|| Self::Other(trimmed.to_string()), |(_, tag)| tag.clone())
    }

    /// Whether the tag belongs to the closed set.
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }

    /// All labels of the closed set, in form order.
    pub fn known_labels() -> impl Iterator<Item = &'static str> {
        SERVICE_LABELS.iter().map(|(label, _)| *label)
    }
}

impl From<String> for ServiceTag {
    fn from(value: String) -> Self {
        Self::from_label(&value)
    }
}

impl From<ServiceTag> for String {
    fn from(value: ServiceTag) -> Self {
        value.label().to_string()
    }
}

/// One attendance of a person by a technician.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttendanceRecord {
    pub id: AttendanceId,
    #[serde(rename = "userId")]
    pub person_id: PersonId,
    #[serde(rename = "userName")]
    pub person_name: String,
    #[serde(rename = "userCpf")]
    pub person_national_id: String,
    #[serde(rename = "dataAtendimento")]
    pub date: NaiveDate,
    #[serde(rename = "tipoAtendimento")]
    pub kind: AttendanceKind,
    #[serde(rename = "formaAtendimento")]
    pub mode: AttendanceMode,
    #[serde(rename = "formaAtendimentoOutros")]
    pub mode_other: Option<String>,
    #[serde(rename = "tecnicoResponsavel")]
    pub technician: String,
    #[serde(rename = "demandaApresentada")]
    pub demand: String,
    #[serde(rename = "servicoBeneficio")]
    pub services: Vec<ServiceTag>,
    #[serde(rename = "encaminhamentosRealizados")]
    pub referrals: String,
    #[serde(rename = "observacoesTecnico")]
    pub observations: String,
    #[serde(rename = "parecerSocial")]
    pub social_opinion: String,
    #[serde(rename = "resultado")]
    pub outcome: Outcome,
    #[serde(rename = "dataCriacao")]
    pub created_at: DateTime<Utc>,
}

/// Submission input.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct NewAttendance {
    #[serde(rename = "userId")]
    pub person_id: String,
    #[serde(rename = "dataAtendimento")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "tipoAtendimento")]
    pub kind: Option<AttendanceKind>,
    #[serde(rename = "formaAtendimento")]
    pub mode: Option<AttendanceMode>,
    #[serde(rename = "formaAtendimentoOutros")]
    pub mode_other: Option<String>,
    /// Defaults to the submitting operator when absent.
    #[serde(rename = "tecnicoResponsavel")]
    pub technician: Option<String>,
    #[serde(rename = "demandaApresentada")]
    pub demand: String,
    #[serde(rename = "servicoBeneficio")]
    pub services: Vec<ServiceTag>,
    #[serde(rename = "encaminhamentosRealizados")]
    pub referrals: String,
    #[serde(rename = "observacoesTecnico")]
    pub observations: String,
    #[serde(rename = "parecerSocial")]
    pub social_opinion: String,
    #[serde(rename = "resultado")]
    pub outcome: Option<Outcome>,
}

/// Partial update. `None` keeps the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct AttendancePatch {
    #[serde(rename = "dataAtendimento")]
    pub date: Option<NaiveDate>,
    #[serde(rename = "tipoAtendimento")]
    pub kind: Option<AttendanceKind>,
    #[serde(rename = "formaAtendimento")]
    pub mode: Option<AttendanceMode>,
    #[serde(rename = "formaAtendimentoOutros")]
    pub mode_other: Option<String>,
    #[serde(rename = "tecnicoResponsavel")]
    pub technician: Option<String>,
    #[serde(rename = "demandaApresentada")]
    pub demand: Option<String>,
    #[serde(rename = "servicoBeneficio")]
    pub services: Option<Vec<ServiceTag>>,
    #[serde(rename = "encaminhamentosRealizados")]
    pub referrals: Option<String>,
    #[serde(rename = "observacoesTecnico")]
    pub observations: Option<String>,
    #[serde(rename = "parecerSocial")]
    pub social_opinion: Option<String>,
    #[serde(rename = "resultado")]
    pub outcome: Option<Outcome>,
}

/// Attendance validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttendanceValidationError {
    MissingField(&'static str),
    /// Mode `Outros` needs a description.
    MissingModeDetail,
    /// An `Other` service tag with blank text.
    BlankService,
}

impl Display for AttendanceValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingField(field) => write!(f, "required field is missing: {field}"),
            Self::MissingModeDetail => write!(
                f,
                "{FIELD_MODE_OTHER} is required when {FIELD_MODE} is `Outros`"
            ),
            Self::BlankService => write!(f, "service entries cannot be blank"),
        }
    }
}

impl Error for AttendanceValidationError {}

/// Person fields copied onto the attendance at submission time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersonSnapshot {
    pub id: PersonId,
    pub name: String,
    pub national_id: String,
}

impl AttendanceRecord {
    /// Builds a record from submission input.
    ///
    /// `default_technician` fills an absent or blank technician.
    pub fn submit(
        id: impl Into<AttendanceId>,
        person: PersonSnapshot,
        input: NewAttendance,
        default_technician: &str,
        created_at: DateTime<Utc>,
    ) -> Result<Self, AttendanceValidationError> {
        let date = input
            .date
            .ok_or(AttendanceValidationError::MissingField(FIELD_DATE))?;
        let kind = input
            .kind
            .ok_or(AttendanceValidationError::MissingField(FIELD_KIND))?;
        let mode = input
            .mode
            .ok_or(AttendanceValidationError::MissingField(FIELD_MODE))?;
        let technician = non_blank(input.technician)
            .unwrap_or_else(|| default_technician.trim().to_string());

        let record = Self {
            id: id.into(),
            person_id: person.id,
            person_name: person.name,
            person_national_id: person.national_id,
            date,
            kind,
            mode,
            mode_other: mode_detail(mode, input.mode_other),
            technician,
            demand: input.demand.trim().to_string(),
            services: dedup_services(input.services),
            referrals: input.referrals,
            observations: input.observations,
            social_opinion: input.social_opinion,
            outcome: input.outcome.unwrap_or_default(),
            created_at,
        };
        record.validate()?;
        Ok(record)
    }

    /// Returns a replacement value with `patch` applied.
    ///
    /// Identity, person snapshot and `created_at` are preserved.
    pub fn patched(&self, patch: AttendancePatch) -> Result<Self, AttendanceValidationError> {
        let mut next = self.clone();
        if let Some(date) = patch.date {
            next.date = date;
        }
        if let Some(kind) = patch.kind {
            next.kind = kind;
        }
        if let Some(mode) = patch.mode {
            next.mode = mode;
        }
        let detail = patch.mode_other.or_else(|| next.mode_other.take());
        next.mode_other = mode_detail(next.mode, detail);
        if let Some(technician) = non_blank(patch.technician) {
            next.technician = technician;
        }
        if let Some(demand) = patch.demand {
            next.demand = demand.trim().to_string();
        }
        if let Some(services) = patch.services {
            next.services = dedup_services(services);
        }
        if let Some(referrals) = patch.referrals {
            next.referrals = referrals;
        }
        if let Some(observations) = patch.observations {
            next.observations = observations;
        }
        if let Some(social_opinion) = patch.social_opinion {
            next.social_opinion = social_opinion;
        }
        if let Some(outcome) = patch.outcome {
            next.outcome = outcome;
        }
        next.validate()?;
        Ok(next)
    }

    /// Checks field-level invariants.
    pub fn validate(&self) -> Result<(), AttendanceValidationError> {
        if self.person_id.trim().is_empty() {
            return Err(AttendanceValidationError::MissingField(FIELD_PERSON_ID));
        }
        if self.technician.trim().is_empty() {
            return Err(AttendanceValidationError::MissingField(FIELD_TECHNICIAN));
        }
        if self.mode == AttendanceMode::Other && self.mode_other.is_none() {
            return Err(AttendanceValidationError::MissingModeDetail);
        }
        if self.services.iter().any(|tag| tag.label().trim().is_empty()) {
            return Err(AttendanceValidationError::BlankService);
        }
        Ok(())
    }
}

impl Record for AttendanceRecord {
    fn record_id(&self) -> &str {
        &self.id
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        match name {
            FIELD_ID => text(&self.id),
            FIELD_PERSON_ID => text(&self.person_id),
            FIELD_PERSON_NAME => text(&self.person_name),
            FIELD_PERSON_NATIONAL_ID => text(&self.person_national_id),
            FIELD_DATE => Some(FieldValue::Date(self.date)),
            FIELD_KIND => text(self.kind.as_str()),
            FIELD_MODE => text(self.mode.as_str()),
            FIELD_MODE_OTHER => optional_text(self.mode_other.as_ref()),
            FIELD_TECHNICIAN => text(&self.technician),
            FIELD_DEMAND => text(&self.demand),
            FIELD_SERVICES => Some(FieldValue::List(
                self.services
                    .iter()
                    .map(|tag| tag.label().to_string())
                    .collect(),
            )),
            FIELD_REFERRALS => text(&self.referrals),
            FIELD_OBSERVATIONS => text(&self.observations),
            FIELD_SOCIAL_OPINION => text(&self.social_opinion),
            FIELD_OUTCOME => text(self.outcome.as_str()),
            FIELD_CREATED_AT => text(
                self.created_at
                    .to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            _ => None,
        }
    }

    fn field_match(name: &str) -> FieldMatch {
        match name {
            FIELD_PERSON_NAME | FIELD_TECHNICIAN | FIELD_MODE_OTHER | FIELD_DEMAND
            | FIELD_REFERRALS | FIELD_OBSERVATIONS | FIELD_SOCIAL_OPINION => {
                FieldMatch::CaseInsensitive
            }
            _ => FieldMatch::Exact,
        }
    }
}

/// `YYYY-MM` month key of an attendance date.
pub fn month_key(date: NaiveDate) -> String {
    iso_date(date).chars().take(7).collect()
}

fn mode_detail(mode: AttendanceMode, detail: Option<String>) -> Option<String> {
    if mode == AttendanceMode::Other {
        non_blank(detail)
    } else {
        None
    }
}

fn dedup_services(services: Vec<ServiceTag>) -> Vec<ServiceTag> {
    let mut unique: Vec<ServiceTag> = Vec::with_capacity(services.len());
    for tag in services {
        if !unique.contains(&tag) {
            unique.push(tag);
        }
    }
    unique
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[cfg(test)]
mod tests {
    use super::{
        month_key, AttendanceKind, AttendanceMode, AttendancePatch, AttendanceRecord,
        AttendanceValidationError, NewAttendance, Outcome, PersonSnapshot, ServiceTag,
    };
    use chrono::{NaiveDate, TimeZone, Utc};

    fn snapshot() -> PersonSnapshot {
        PersonSnapshot {
            id: "1".to_string(),
            name: "Maria Silva Santos".to_string(),
            national_id: "123.456.789-00".to_string(),
        }
    }

    fn input() -> NewAttendance {
        NewAttendance {
            person_id: "1".to_string(),
            date: NaiveDate::from_ymd_opt(2024, 1, 15),
            kind: Some(AttendanceKind::Initial),
            mode: Some(AttendanceMode::InPerson),
            services: vec![
                ServiceTag::ContinuousBenefit,
                ServiceTag::from_label("BPC – Benefício de Prestação Continuada"),
                ServiceTag::Other("Cesta básica".to_string()),
            ],
            ..NewAttendance::default()
        }
    }

    fn submit(input: NewAttendance) -> Result<AttendanceRecord, AttendanceValidationError> {
        let created_at = Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap();
        AttendanceRecord::submit("a-1", snapshot(), input, "Ana Paula Silva", created_at)
    }

    #[test]
    fn submit_applies_defaults_and_dedups_services() {
        let record = submit(input()).unwrap();
        assert_eq!(record.technician, "Ana Paula Silva");
        assert_eq!(record.outcome, Outcome::Pending);
        assert_eq!(record.services.len(), 2);
        assert_eq!(record.person_name, "Maria Silva Santos");
    }

    #[test]
    fn other_mode_requires_detail() {
        let mut other = input();
        other.mode = Some(AttendanceMode::Other);
        assert_eq!(
            submit(other.clone()).unwrap_err(),
            AttendanceValidationError::MissingModeDetail
        );

        other.mode_other = Some("Visita à escola".to_string());
        assert_eq!(
            submit(other).unwrap().mode_other.as_deref(),
            Some("Visita à escola")
        );
    }

    #[test]
    fn patch_preserves_identity_and_creation_time() {
        let record = submit(input()).unwrap();
        let patched = record
            .patched(AttendancePatch {
                outcome: Some(Outcome::Approved),
                mode: Some(AttendanceMode::Phone),
                ..AttendancePatch::default()
            })
            .unwrap();
        assert_eq!(patched.id, record.id);
        assert_eq!(patched.created_at, record.created_at);
        assert_eq!(patched.outcome, Outcome::Approved);
        assert_eq!(patched.mode_other, None);
    }

    #[test]
    fn service_tags_round_trip_through_labels() {
        assert_eq!(ServiceTag::from_label("CPTEA"), ServiceTag::AutismCard);
        assert_eq!(
            ServiceTag::from_label(" Cesta básica "),
            ServiceTag::Other("Cesta básica".to_string())
        );
        assert_eq!(ServiceTag::Other("x".to_string()).bucket_label(), "Outros");
        assert_eq!(ServiceTag::known_labels().count(), 6);
    }

    #[test]
    fn outcome_accepts_form_aliases() {
        let parsed: Outcome = serde_json::from_str("\"DEFERIDO\"").unwrap();
        assert_eq!(parsed, Outcome::Approved);
        assert_eq!(Outcome::parse("INDEFERIDO"), Some(Outcome::Denied));
        assert_eq!(serde_json::to_string(&Outcome::Denied).unwrap(), "\"NEGADO\"");
    }

    #[test]
    fn month_key_takes_year_and_month() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(month_key(date), "2024-03");
    }
}
