//! Request parameter translation for listing and report endpoints.
//!
//! Keys are the external query-string names, accepted verbatim. Empty
//! values are treated as absent.

use crate::config::PagingConfig;
use crate::model::attendance::{
    AttendanceMode, Outcome, FIELD_DATE, FIELD_KIND, FIELD_MODE, FIELD_OUTCOME, FIELD_PERSON_ID,
    FIELD_PERSON_NAME, FIELD_PERSON_NATIONAL_ID, FIELD_SERVICES, FIELD_TECHNICIAN,
};
use crate::model::person::{Sex, FIELD_FULL_NAME, FIELD_NATIONAL_ID, FIELD_PHONES, FIELD_SEX};
use crate::model::record::iso_date;
use crate::query::pipeline::{QueryConfig, QueryError, QueryResult, RangeBounds, SortDirection};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Raw query-string parameters of one request.
pub type RequestParams = BTreeMap<String, String>;

pub const PARAM_PAGE: &str = "page";
pub const PARAM_LIMIT: &str = "limit";
pub const PARAM_PAGE_SIZE: &str = "pageSize";
pub const PARAM_SEARCH: &str = "search";
pub const PARAM_SORT_BY: &str = "sortBy";
pub const PARAM_ORDER: &str = "order";
pub const PARAM_NATIONAL_ID: &str = "cpf";
pub const PARAM_SEX: &str = "sexo";
pub const PARAM_PERSON_ID: &str = "userId";
pub const PARAM_KIND: &str = "tipoAtendimento";
pub const PARAM_OUTCOME: &str = "resultado";
pub const PARAM_SERVICE: &str = "servico";
pub const PARAM_MODE: &str = "formaAtendimento";
pub const PARAM_TECHNICIAN: &str = "tecnicoResponsavel";
pub const PARAM_PERIOD_START: &str = "dataInicio";
pub const PARAM_PERIOD_END: &str = "dataFim";
pub const PARAM_REPORT_KIND: &str = "tipo";

/// Person listing: `search`, `cpf`, `sexo`, sort and paging.
///
/// `search` looks at name, national id and phones; `cpf` is a substring
/// match on the national id. Without `sortBy` the store order is kept.
pub fn person_query(params: &RequestParams, paging: &PagingConfig) -> QueryResult<QueryConfig> {
    let mut config = base_config(params, paging)?;

    if let Some(needle) = param(params, PARAM_SEARCH) {
        config = config.search(needle, [FIELD_FULL_NAME, FIELD_NATIONAL_ID, FIELD_PHONES]);
    }
    if let Some(national_id) = param(params, PARAM_NATIONAL_ID) {
        config = config.search(national_id, [FIELD_NATIONAL_ID]);
    }
    if let Some(sex) = param(params, PARAM_SEX) {
        let code = Sex::parse(sex).map_or(sex, |parsed| parsed.as_str());
        config = config.filter_eq(FIELD_SEX, code);
    }

    apply_sort(config, params, None)
}

/// Attendance listing: equality filters, period, search, sort and paging.
///
/// Defaults to newest `dataAtendimento` first.
pub fn attendance_query(
    params: &RequestParams,
    paging: &PagingConfig,
) -> QueryResult<QueryConfig> {
    let mut config = base_config(params, paging)?;

    for (key, field) in [
        (PARAM_PERSON_ID, FIELD_PERSON_ID),
        (PARAM_KIND, FIELD_KIND),
        (PARAM_SERVICE, FIELD_SERVICES),
        (PARAM_TECHNICIAN, FIELD_TECHNICIAN),
    ] {
        if let Some(value) = param(params, key) {
            config = config.filter_eq(field, value);
        }
    }
    if let Some(outcome) = param(params, PARAM_OUTCOME) {
        let code = Outcome::parse(outcome).map_or(outcome, |parsed| parsed.as_str());
        config = config.filter_eq(FIELD_OUTCOME, code);
    }
    if let Some(mode) = param(params, PARAM_MODE) {
        let label = AttendanceMode::parse(mode).map_or(mode, |parsed| parsed.as_str());
        config = config.filter_eq(FIELD_MODE, label);
    }
    if let Some(period) = attendance_period(params)? {
        config = config.filter_range(FIELD_DATE, period.min, period.max);
    }
    if let Some(needle) = param(params, PARAM_SEARCH) {
        config = config.search(
            needle,
            [FIELD_PERSON_NAME, FIELD_PERSON_NATIONAL_ID, FIELD_TECHNICIAN],
        );
    }

    apply_sort(config, params, Some((FIELD_DATE, SortDirection::Descending)))
}

/// `dataInicio`/`dataFim` as inclusive bounds on the attendance date.
///
/// Bounds compare as text, so each must be a zero-padded `YYYY-MM-DD`.
pub fn attendance_period(params: &RequestParams) -> QueryResult<Option<RangeBounds>> {
    let bounds = RangeBounds {
        min: parse_date_bound(params, PARAM_PERIOD_START)?,
        max: parse_date_bound(params, PARAM_PERIOD_END)?,
    };
    Ok((!bounds.is_open()).then_some(bounds))
}

/// Value of `key`, trimmed, or `None` when absent or blank.
pub fn param<'a>(params: &'a RequestParams, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .map(|value| value.trim())
        .filter(|value| !value.is_empty())
}

fn base_config(params: &RequestParams, paging: &PagingConfig) -> QueryResult<QueryConfig> {
    let page = parse_positive(params, PARAM_PAGE)?.unwrap_or(1);
    let page_size = match parse_positive(params, PARAM_LIMIT)? {
        Some(limit) => limit,
        None => parse_positive(params, PARAM_PAGE_SIZE)?.unwrap_or(paging.default_page_size),
    };
    Ok(QueryConfig::new()
        .paginate(page, page_size)
        .with_max_page_size(paging.max_page_size))
}

fn apply_sort(
    config: QueryConfig,
    params: &RequestParams,
    default: Option<(&str, SortDirection)>,
) -> QueryResult<QueryConfig> {
    let direction = match param(params, PARAM_ORDER) {
        Some(order) => Some(parse_direction(order)?),
        None => None,
    };
    match (param(params, PARAM_SORT_BY), default) {
        (Some(key), _) => Ok(config.sort_by(key, direction.unwrap_or_default())),
        (None, Some((key, default_direction))) => {
            Ok(config.sort_by(key, direction.unwrap_or(default_direction)))
        }
        (None, None) => Ok(config),
    }
}

fn parse_direction(value: &str) -> QueryResult<SortDirection> {
    match value.to_ascii_lowercase().as_str() {
        "asc" | "ascending" => Ok(SortDirection::Ascending),
        "desc" | "descending" => Ok(SortDirection::Descending),
        _ => Err(QueryError::InvalidConfiguration(format!(
            "{PARAM_ORDER} must be `asc` or `desc`, got `{value}`"
        ))),
    }
}

fn parse_date_bound(params: &RequestParams, key: &str) -> QueryResult<Option<String>> {
    let Some(raw) = param(params, key) else {
        return Ok(None);
    };
    match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        Ok(date) if iso_date(date) == raw => Ok(Some(raw.to_string())),
        _ => Err(QueryError::InvalidConfiguration(format!(
            "{key} must be a date as YYYY-MM-DD, got `{raw}`"
        ))),
    }
}

fn parse_positive(params: &RequestParams, key: &str) -> QueryResult<Option<u32>> {
    let Some(raw) = param(params, key) else {
        return Ok(None);
    };
    match raw.parse::<u32>() {
        Ok(0) => Err(QueryError::InvalidConfiguration(format!(
            "{key} must be at least 1"
        ))),
        Ok(value) => Ok(Some(value)),
        Err(_) => Err(QueryError::InvalidConfiguration(format!(
            "{key} must be a positive integer, got `{raw}`"
        ))),
    }
}
