use casework_core::model::attendance::{AttendanceRecord, ServiceTag};
use casework_core::query::{attendance_period, QueryError, RangeBounds, RequestParams};
use casework_core::report::{build_report, Report, ReportKind};
use casework_core::seed::{demo_attendances, demo_people};
use casework_core::service::{ReportService, ServiceError};
use casework_core::{MemoryStore, Person};
use chrono::NaiveDate;
use serde_json::json;

fn fixtures() -> (Vec<Person>, Vec<AttendanceRecord>) {
    let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    (demo_people(today).unwrap(), demo_attendances().unwrap())
}

#[test]
fn general_report_counts_outcomes_sexes_and_modes() {
    let (persons, attendances) = fixtures();
    let Report::General(report) = build_report(ReportKind::General, &persons, &attendances, None)
    else {
        panic!("expected general report");
    };

    assert_eq!(report.total_usuarios, 3);
    assert_eq!(report.total_atendimentos, 3);
    assert_eq!(report.atendimentos_aprovados, 2);
    assert_eq!(report.atendimentos_pendentes, 1);
    assert_eq!(report.atendimentos_negados, 0);
    assert_eq!(report.usuarios_por_sexo.feminino, 2);
    assert_eq!(report.usuarios_por_sexo.masculino, 1);
    assert_eq!(report.atendimentos_por_tipo.inicial, 2);
    assert_eq!(report.atendimentos_por_forma.telefonico, 1);
}

#[test]
fn demographic_report_buckets_ages_and_averages() {
    let (persons, attendances) = fixtures();
    let report = build_report(ReportKind::Demographic, &persons, &attendances, None);

    assert_eq!(
        serde_json::to_value(&report).unwrap(),
        json!({
            "faixasEtarias": { "30-44": 2, "45-59": 1 },
            "totalUsuarios": 3,
            "idadeMedia": 38.0
        })
    );
}

#[test]
fn demographic_mean_is_null_for_an_empty_registry() {
    let report = build_report(ReportKind::Demographic, &[], &[], None);
    assert_eq!(serde_json::to_value(&report).unwrap()["idadeMedia"], json!(null));
}

fn services_report(attendances: &[AttendanceRecord]) -> (u64, u64) {
    let Report::Services(report) = build_report(ReportKind::Services, &[], attendances, None)
    else {
        panic!("expected services report");
    };
    let hits: u64 = report.servicos_beneficios.values().sum();
    (hits, report.total_atendimentos)
}

#[test]
fn single_tag_records_sum_to_the_record_total() {
    let (_, attendances) = fixtures();
    assert!(attendances.iter().all(|record| record.services.len() == 1));

    assert_eq!(services_report(&attendances), (3, 3));
}

#[test]
fn multi_tag_records_push_service_hits_past_the_record_total() {
    let (_, mut attendances) = fixtures();
    attendances[0].services = vec![ServiceTag::ContinuousBenefit, ServiceTag::AutismCard];

    let (hits, total) = services_report(&attendances);
    assert_eq!(total, 3);
    assert_eq!(hits, 4);
    assert!(hits > total);
}

#[test]
fn each_free_text_tag_counts_under_outros() {
    let (persons, mut attendances) = fixtures();
    attendances[0].services = vec![
        ServiceTag::ContinuousBenefit,
        ServiceTag::Other("Cesta básica".to_string()),
        ServiceTag::Other("Transporte".to_string()),
    ];

    let Report::Services(report) =
        build_report(ReportKind::Services, &persons, &attendances, None)
    else {
        panic!("expected services report");
    };

    assert_eq!(report.total_atendimentos, 3);
    assert_eq!(report.servicos_beneficios.get("Outros"), Some(&2));
    assert_eq!(
        report
            .servicos_beneficios
            .get("BPC – Benefício de Prestação Continuada"),
        Some(&1)
    );
    let hits: u64 = report.servicos_beneficios.values().sum();
    assert_eq!(hits, 5);
}

#[test]
fn reports_reject_malformed_period_bounds() {
    let (persons, attendances) = fixtures();
    let service = ReportService::new(
        MemoryStore::with_records(persons),
        MemoryStore::with_records(attendances),
    );

    for (key, value) in [("dataInicio", "2024-1-9"), ("dataFim", "banana")] {
        let params: RequestParams = [
            ("tipo".to_string(), "mensal".to_string()),
            (key.to_string(), value.to_string()),
        ]
        .into_iter()
        .collect();
        assert!(matches!(
            attendance_period(&params),
            Err(QueryError::InvalidConfiguration(_))
        ));
        assert!(matches!(
            service.report(&params),
            Err(ServiceError::InvalidConfiguration(message)) if message.contains(key)
        ));
    }
}

#[test]
fn monthly_and_technician_reports_respect_the_period() {
    let (persons, attendances) = fixtures();
    let period = RangeBounds {
        min: Some("2024-01-09".to_string()),
        max: None,
    };

    let Report::Monthly(monthly) =
        build_report(ReportKind::Monthly, &persons, &attendances, Some(&period))
    else {
        panic!("expected monthly report");
    };
    assert_eq!(monthly.total_periodo, 2);
    assert_eq!(monthly.atendimentos_por_mes.get("2024-01"), Some(&2));

    let Report::Technicians(technicians) =
        build_report(ReportKind::Technicians, &persons, &attendances, Some(&period))
    else {
        panic!("expected technicians report");
    };
    assert_eq!(technicians.total_atendimentos, 2);
    assert!(!technicians
        .atendimentos_por_tecnico
        .contains_key("Maria José Lima"));
}

#[test]
fn general_report_serializes_with_external_keys() {
    let (persons, attendances) = fixtures();
    let value =
        serde_json::to_value(build_report(ReportKind::General, &persons, &attendances, None))
            .unwrap();
    assert_eq!(value["atendimentosAprovados"], 2);
    assert_eq!(value["usuariosPorSexo"]["feminino"], 2);
    assert_eq!(value["atendimentosPorForma"]["presencial"], 2);
}
