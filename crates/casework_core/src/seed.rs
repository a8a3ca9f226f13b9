//! Demonstration records for local runs.
//!
//! Three registry entries and one attendance for each, as used by the
//! dashboard before a real backend is wired in.

use crate::model::attendance::AttendanceRecord;
use crate::model::person::{age_on, Person};
use crate::store::{RecordStore, StoreError, StoreResult};
use chrono::NaiveDate;
use log::info;

const DEMO_PEOPLE: &str = r#"[
  {
    "id": "1",
    "nomeCompleto": "Maria Silva Santos",
    "cpf": "123.456.789-00",
    "dataNascimento": "1978-05-15",
    "idade": 0,
    "sexo": "F",
    "telefones": "(11) 99999-9999",
    "enderecoCompleto": "Rua das Flores, 123, Centro, São Paulo - SP",
    "responsavelLegalNome": null,
    "responsavelLegalCpf": null,
    "dataCadastro": "2023-06-15"
  },
  {
    "id": "2",
    "nomeCompleto": "João Carlos Oliveira",
    "cpf": "987.654.321-00",
    "dataNascimento": "1985-12-03",
    "idade": 0,
    "sexo": "M",
    "telefones": "(11) 88888-8888",
    "enderecoCompleto": "Av. Principal, 456, Vila Nova, São Paulo - SP",
    "responsavelLegalNome": null,
    "responsavelLegalCpf": null,
    "dataCadastro": "2023-08-22"
  },
  {
    "id": "3",
    "nomeCompleto": "Ana Paula Costa",
    "cpf": "456.789.123-00",
    "dataNascimento": "1992-09-18",
    "idade": 0,
    "sexo": "F",
    "telefones": "(11) 77777-7777",
    "enderecoCompleto": "Rua da Paz, 789, Jardim América, São Paulo - SP",
    "responsavelLegalNome": null,
    "responsavelLegalCpf": null,
    "dataCadastro": "2023-11-05"
  }
]"#;

const DEMO_ATTENDANCES: &str = r#"[
  {
    "id": "1",
    "userId": "1",
    "userName": "Maria Silva Santos",
    "userCpf": "123.456.789-00",
    "dataAtendimento": "2024-01-15",
    "tipoAtendimento": "Inicial",
    "formaAtendimento": "Presencial",
    "formaAtendimentoOutros": null,
    "tecnicoResponsavel": "Ana Paula Silva",
    "demandaApresentada": "Solicitação de BPC para pessoa com deficiência",
    "servicoBeneficio": ["BPC – Benefício de Prestação Continuada"],
    "encaminhamentosRealizados": "INSS para avaliação médica",
    "observacoesTecnico": "Usuário apresentou toda documentação necessária",
    "parecerSocial": "Favorável ao benefício, atende aos critérios estabelecidos",
    "resultado": "APROVADO",
    "dataCriacao": "2024-01-15T10:30:00Z"
  },
  {
    "id": "2",
    "userId": "2",
    "userName": "João Carlos Oliveira",
    "userCpf": "987.654.321-00",
    "dataAtendimento": "2024-01-10",
    "tipoAtendimento": "Retorno",
    "formaAtendimento": "Telefônico",
    "formaAtendimentoOutros": null,
    "tecnicoResponsavel": "Carlos Roberto Santos",
    "demandaApresentada": "Acompanhamento de processo de Cadastro Único",
    "servicoBeneficio": ["Cadastro Único / Atualização"],
    "encaminhamentosRealizados": "CRAS para acompanhamento familiar",
    "observacoesTecnico": "Processo em andamento, aguardando documentação complementar",
    "parecerSocial": "Em análise",
    "resultado": "PENDENTE",
    "dataCriacao": "2024-01-10T14:15:00Z"
  },
  {
    "id": "3",
    "userId": "3",
    "userName": "Ana Paula Costa",
    "userCpf": "456.789.123-00",
    "dataAtendimento": "2024-01-08",
    "tipoAtendimento": "Inicial",
    "formaAtendimento": "Presencial",
    "formaAtendimentoOutros": null,
    "tecnicoResponsavel": "Maria José Lima",
    "demandaApresentada": "Solicitação de auxílio municipal AME",
    "servicoBeneficio": ["Auxílio Municipal – AME"],
    "encaminhamentosRealizados": "Secretaria de Assistência Social",
    "observacoesTecnico": "Família em situação de vulnerabilidade social",
    "parecerSocial": "Favorável, atende aos critérios do programa",
    "resultado": "APROVADO",
    "dataCriacao": "2024-01-08T09:45:00Z"
  }
]"#;

/// Demo registry entries with ages computed for `today`.
pub fn demo_people(today: NaiveDate) -> StoreResult<Vec<Person>> {
    let mut people: Vec<Person> = decode(DEMO_PEOPLE)?;
    for person in &mut people {
        person.age = age_on(person.birth_date, today);
    }
    Ok(people)
}

pub fn demo_attendances() -> StoreResult<Vec<AttendanceRecord>> {
    decode(DEMO_ATTENDANCES)
}

/// Writes the demo records into the given stores.
///
/// Existing records with the same ids are replaced. Returns the number of
/// records written.
pub fn seed_demo<P, A>(persons: &P, attendances: &A, today: NaiveDate) -> StoreResult<usize>
where
    P: RecordStore<Person> + ?Sized,
    A: RecordStore<AttendanceRecord> + ?Sized,
{
    let people = demo_people(today)?;
    let records = demo_attendances()?;
    for person in &people {
        persons.put(person)?;
    }
    for record in &records {
        attendances.put(record)?;
    }

    let written = people.len() + records.len();
    info!("event=seed_demo module=seed status=ok records={written}");
    Ok(written)
}

fn decode<T: serde::de::DeserializeOwned>(raw: &str) -> StoreResult<Vec<T>> {
    serde_json::from_str(raw).map_err(|err| StoreError::InvalidData(err.to_string()))
}
