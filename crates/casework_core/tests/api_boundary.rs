use casework_core::api::{ApiError, CaseworkApi, MemoryCaseworkApi};
use casework_core::clock::FixedClock;
use casework_core::seed::seed_demo;
use casework_core::store::{PutOutcome, StoreError, StoreResult};
use casework_core::{
    AttendanceRecord, CoreConfig, MemoryStore, NewAttendance, NewPerson, Person, PersonPatch,
    RecordStore, RequestParams, Sex,
};
use chrono::NaiveDate;
use serde_json::json;
use std::sync::Arc;

fn clock(day: u32) -> Arc<FixedClock> {
    Arc::new(FixedClock::on_date(2024, 1, day).unwrap())
}

fn seeded_api() -> MemoryCaseworkApi {
    let persons = Arc::new(MemoryStore::new());
    let attendances = Arc::new(MemoryStore::new());
    let today = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
    seed_demo(&persons, &attendances, today).unwrap();
    CaseworkApi::new(persons, attendances, &CoreConfig::default(), clock(15)).unwrap()
}

fn token(api: &MemoryCaseworkApi) -> String {
    api.login("admin", "admin123").unwrap().data.token
}

fn params(pairs: &[(&str, &str)]) -> RequestParams {
    pairs
        .iter()
        .map(|(key, value)| (key.to_string(), value.to_string()))
        .collect()
}

#[test]
fn protected_operations_require_a_valid_token() {
    let api = seeded_api();
    let params = RequestParams::new();

    assert_eq!(
        api.list_persons(None, &params).unwrap_err(),
        ApiError::Unauthorized
    );
    assert_eq!(
        api.report(Some("garbage"), &params).unwrap_err(),
        ApiError::Unauthorized
    );
    assert_eq!(ApiError::Unauthorized.status_code(), 401);
    assert_eq!(
        serde_json::to_value(ApiError::Unauthorized.envelope()).unwrap(),
        json!({ "success": false, "error": "Não autorizado" })
    );
}

#[test]
fn login_rejects_wrong_and_missing_credentials() {
    let api = seeded_api();
    assert_eq!(
        api.login("admin", "wrong").unwrap_err(),
        ApiError::Unauthorized
    );
    assert_eq!(api.login("", "").unwrap_err().status_code(), 400);
    assert_eq!(
        api.login("", "").unwrap_err(),
        ApiError::Validation("Username e password são obrigatórios".to_string())
    );
}

#[test]
fn expired_token_is_denied() {
    let persons = Arc::new(MemoryStore::<Person>::new());
    let attendances = Arc::new(MemoryStore::<AttendanceRecord>::new());
    let config = CoreConfig::default();
    let early = CaseworkApi::new(persons.clone(), attendances.clone(), &config, clock(1)).unwrap();
    let late = CaseworkApi::new(persons, attendances, &config, clock(31)).unwrap();

    let session = early.login("admin", "admin123").unwrap().data;
    assert!(early.me(Some(&session.token)).is_ok());
    assert_eq!(
        late.me(Some(&session.token)).unwrap_err(),
        ApiError::Unauthorized
    );
}

#[test]
fn me_returns_the_operator_profile() {
    let api = seeded_api();
    let token = token(&api);
    let me = api.me(Some(&token)).unwrap().data;
    assert_eq!(me.username, "admin");
    assert_eq!(me.name, "Administrador");
}

#[test]
fn person_listing_envelope_carries_pagination() {
    let api = seeded_api();
    let token = token(&api);
    let listing = api
        .list_persons(Some(&token), &params(&[("limit", "2")]))
        .unwrap();

    let value = serde_json::to_value(&listing).unwrap();
    assert_eq!(value["success"], true);
    assert_eq!(value["data"].as_array().unwrap().len(), 2);
    assert_eq!(
        value["pagination"],
        json!({ "page": 1, "limit": 2, "total": 3, "totalPages": 2 })
    );
}

#[test]
fn duplicate_registration_is_a_conflict() {
    let api = seeded_api();
    let token = token(&api);
    let err = api
        .register_person(
            Some(&token),
            NewPerson {
                full_name: "Maria S. Santos".to_string(),
                national_id: "12345678900".to_string(),
                birth_date: NaiveDate::from_ymd_opt(1978, 5, 15),
                sex: Some(Sex::Female),
                ..NewPerson::default()
            },
        )
        .unwrap_err();
    assert_eq!(err.status_code(), 409);
    assert_eq!(
        serde_json::to_value(err.envelope()).unwrap(),
        json!({ "success": false, "error": "CPF já cadastrado no sistema" })
    );
}

#[test]
fn invalid_registration_is_rejected_in_portuguese() {
    let api = seeded_api();
    let token = token(&api);
    let err = api
        .register_person(Some(&token), NewPerson::default())
        .unwrap_err();
    assert_eq!(err, ApiError::Validation("Dados inválidos".to_string()));
    assert_eq!(err.status_code(), 400);
}

#[test]
fn mutations_carry_a_confirmation_message() {
    let api = seeded_api();
    let token = token(&api);

    let updated = api
        .update_person(
            Some(&token),
            "3",
            PersonPatch {
                phones: Some("(11) 70000-0000".to_string()),
                ..PersonPatch::default()
            },
        )
        .unwrap();
    assert_eq!(updated.message.as_deref(), Some("Usuário atualizado com sucesso"));

    let submitted = api
        .submit_attendance(
            Some(&token),
            serde_json::from_value::<NewAttendance>(json!({
                "userId": "3",
                "dataAtendimento": "2024-01-15",
                "tipoAtendimento": "Retorno",
                "formaAtendimento": "Presencial",
                "servicoBeneficio": ["CPTEA"]
            }))
            .unwrap(),
        )
        .unwrap();
    assert_eq!(submitted.data.technician, "Administrador");
    assert_eq!(
        submitted.message.as_deref(),
        Some("Atendimento registrado com sucesso")
    );

    let fetched = api.get_attendance(Some(&token), &submitted.data.id).unwrap();
    assert_eq!(fetched.message, None);
    let value = serde_json::to_value(&fetched).unwrap();
    assert!(value.get("message").is_none());
}

#[test]
fn missing_records_are_not_found() {
    let api = seeded_api();
    let token = token(&api);
    assert_eq!(
        api.get_person(Some(&token), "404").unwrap_err().status_code(),
        404
    );
    assert_eq!(
        api.delete_attendance(Some(&token), "404")
            .unwrap_err()
            .status_code(),
        404
    );
    assert_eq!(
        api.get_person(Some(&token), "404").unwrap_err().to_string(),
        "Usuário não encontrado"
    );
    assert_eq!(
        api.get_attendance(Some(&token), "404")
            .unwrap_err()
            .to_string(),
        "Atendimento não encontrado"
    );
    let orphan = NewAttendance {
        person_id: "404".to_string(),
        ..NewAttendance::default()
    };
    assert_eq!(
        api.submit_attendance(Some(&token), orphan)
            .unwrap_err()
            .status_code(),
        404
    );
}

#[test]
fn report_selection_and_unknown_kind() {
    let api = seeded_api();
    let token = token(&api);

    let report = api
        .report(Some(&token), &params(&[("tipo", "demografico")]))
        .unwrap();
    assert_eq!(
        serde_json::to_value(&report.data).unwrap()["faixasEtarias"],
        json!({ "30-44": 2, "45-59": 1 })
    );

    let err = api
        .report(Some(&token), &params(&[("tipo", "anual")]))
        .unwrap_err();
    assert!(matches!(err, ApiError::InvalidConfiguration(_)));
    assert_eq!(err.status_code(), 400);
}

#[derive(Clone, Copy)]
enum Broken {
    Unavailable,
    Panics,
}

impl RecordStore<Person> for Broken {
    fn get(&self, _id: &str) -> StoreResult<Option<Person>> {
        self.fail()
    }

    fn list(&self) -> StoreResult<Vec<Person>> {
        self.fail()
    }

    fn put(&self, _record: &Person) -> StoreResult<PutOutcome> {
        self.fail()
    }

    fn delete(&self, _id: &str) -> StoreResult<Person> {
        self.fail()
    }
}

impl Broken {
    fn fail<T>(&self) -> StoreResult<T> {
        match self {
            Self::Unavailable => Err(StoreError::Unavailable("disk detached".to_string())),
            Self::Panics => panic!("store exploded"),
        }
    }
}

#[test]
fn store_failures_and_panics_become_internal_errors() {
    for broken in [Broken::Unavailable, Broken::Panics] {
        let api = CaseworkApi::new(
            broken,
            Arc::new(MemoryStore::<AttendanceRecord>::new()),
            &CoreConfig::default(),
            clock(15),
        )
        .unwrap();
        let token = api.login("admin", "admin123").unwrap().data.token;

        let err = api
            .list_persons(Some(&token), &RequestParams::new())
            .unwrap_err();
        assert_eq!(err, ApiError::Internal);
        assert_eq!(err.to_string(), "Erro interno do servidor");
    }
}
