//! Dashboard report kinds and their builders.
//!
//! Attendance-based reports only see attendances inside the requested
//! period; person-based figures always cover the whole registry.

use crate::model::attendance::{
    month_key, AttendanceKind, AttendanceMode, AttendanceRecord, Outcome, FIELD_DATE,
};
use crate::model::person::{Person, Sex};
use crate::query::pipeline::{matching, QueryConfig, QueryError, QueryResult, RangeBounds};
use crate::report::aggregator::{age_bracket, count_by, count_where, mean};
use serde::Serialize;
use std::collections::BTreeMap;

/// Report selected by the `tipo` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportKind {
    #[default]
    General,
    Monthly,
    Services,
    Technicians,
    Demographic,
}

impl ReportKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::General => "geral",
            Self::Monthly => "mensal",
            Self::Services => "servicos",
            Self::Technicians => "tecnicos",
            Self::Demographic => "demografico",
        }
    }

    /// Parses `tipo`; an absent value selects `geral`.
    pub fn from_param(value: Option<&str>) -> QueryResult<Self> {
        match value {
            None | Some("geral") => Ok(Self::General),
            Some("mensal") => Ok(Self::Monthly),
            Some("servicos") => Ok(Self::Services),
            Some("tecnicos") => Ok(Self::Technicians),
            Some("demografico") => Ok(Self::Demographic),
            Some(other) => Err(QueryError::InvalidConfiguration(format!(
                "unknown report kind `{other}`"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SexCounts {
    pub masculino: u64,
    pub feminino: u64,
    pub outro: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct KindCounts {
    pub inicial: u64,
    pub retorno: u64,
    pub encaminhamento: u64,
    pub acompanhamento: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModeCounts {
    pub presencial: u64,
    pub telefonico: u64,
    pub domiciliar: u64,
    pub videoconferencia: u64,
    pub outros: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneralReport {
    pub total_usuarios: u64,
    pub total_atendimentos: u64,
    pub atendimentos_aprovados: u64,
    pub atendimentos_pendentes: u64,
    pub atendimentos_negados: u64,
    pub usuarios_por_sexo: SexCounts,
    pub atendimentos_por_tipo: KindCounts,
    pub atendimentos_por_forma: ModeCounts,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyReport {
    pub atendimentos_por_mes: BTreeMap<String, u64>,
    pub total_periodo: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServicesReport {
    pub servicos_beneficios: BTreeMap<String, u64>,
    pub total_atendimentos: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TechniciansReport {
    pub atendimentos_por_tecnico: BTreeMap<String, u64>,
    pub total_atendimentos: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DemographicReport {
    pub faixas_etarias: BTreeMap<String, u64>,
    pub total_usuarios: u64,
    /// `null` when the registry is empty.
    pub idade_media: Option<f64>,
}

/// One built report; serializes as the bare report object.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Report {
    General(GeneralReport),
    Monthly(MonthlyReport),
    Services(ServicesReport),
    Technicians(TechniciansReport),
    Demographic(DemographicReport),
}

/// Builds `kind` over the given snapshots.
///
/// `period` restricts attendances by `dataAtendimento` (inclusive).
pub fn build_report(
    kind: ReportKind,
    persons: &[Person],
    attendances: &[AttendanceRecord],
    period: Option<&RangeBounds>,
) -> Report {
    let in_period = attendances_in_period(attendances, period);
    let attendances = in_period.as_slice();

    match kind {
        ReportKind::General => Report::General(general(persons, attendances)),
        ReportKind::Monthly => {
            let counts = count_by(attendances, |record| [month_key(record.date)]);
            Report::Monthly(MonthlyReport {
                atendimentos_por_mes: counts.buckets,
                total_periodo: counts.total,
            })
        }
        ReportKind::Services => {
            let counts = count_by(attendances, |record| {
                record
                    .services
                    .iter()
                    .map(|tag| tag.bucket_label().to_string())
                    .collect::<Vec<String>>()
            });
            Report::Services(ServicesReport {
                servicos_beneficios: counts.buckets,
                total_atendimentos: counts.total,
            })
        }
        ReportKind::Technicians => {
            let counts = count_by(attendances, |record| [record.technician.clone()]);
            Report::Technicians(TechniciansReport {
                atendimentos_por_tecnico: counts.buckets,
                total_atendimentos: counts.total,
            })
        }
        ReportKind::Demographic => {
            let counts = count_by(persons, |person| [age_bracket(person.age).to_string()]);
            Report::Demographic(DemographicReport {
                faixas_etarias: counts.buckets,
                total_usuarios: counts.total,
                idade_media: mean(persons.iter().map(|person| f64::from(person.age))),
            })
        }
    }
}

fn attendances_in_period(
    attendances: &[AttendanceRecord],
    period: Option<&RangeBounds>,
) -> Vec<AttendanceRecord> {
    match period {
        Some(bounds) if !bounds.is_open() => {
            let config =
                QueryConfig::new().filter_range(FIELD_DATE, bounds.min.clone(), bounds.max.clone());
            matching(attendances, &config)
        }
        _ => attendances.to_vec(),
    }
}

fn general(persons: &[Person], attendances: &[AttendanceRecord]) -> GeneralReport {
    let with_outcome = |outcome: Outcome| count_where(attendances, |record| record.outcome == outcome);
    let with_kind = |kind: AttendanceKind| count_where(attendances, |record| record.kind == kind);
    let with_mode = |mode: AttendanceMode| count_where(attendances, |record| record.mode == mode);
    let with_sex = |sex: Sex| count_where(persons, |person| person.sex == sex);

    GeneralReport {
        total_usuarios: persons.len() as u64,
        total_atendimentos: attendances.len() as u64,
        atendimentos_aprovados: with_outcome(Outcome::Approved),
        atendimentos_pendentes: with_outcome(Outcome::Pending),
        atendimentos_negados: with_outcome(Outcome::Denied),
        usuarios_por_sexo: SexCounts {
            masculino: with_sex(Sex::Male),
            feminino: with_sex(Sex::Female),
            outro: with_sex(Sex::Other),
        },
        atendimentos_por_tipo: KindCounts {
            inicial: with_kind(AttendanceKind::Initial),
            retorno: with_kind(AttendanceKind::Return),
            encaminhamento: with_kind(AttendanceKind::Referral),
            acompanhamento: with_kind(AttendanceKind::FollowUp),
        },
        atendimentos_por_forma: ModeCounts {
            presencial: with_mode(AttendanceMode::InPerson),
            telefonico: with_mode(AttendanceMode::Phone),
            domiciliar: with_mode(AttendanceMode::HomeVisit),
            videoconferencia: with_mode(AttendanceMode::Video),
            outros: with_mode(AttendanceMode::Other),
        },
    }
}
