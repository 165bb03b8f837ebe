//! Event source for a PostgREST-style hosted database.
//!
//! Date-only columns are filtered with inclusive `gte`/`lte` bounds. Timestamp
//! columns are filtered with `[start 00:00, end + 1 day 00:00)` in the
//! tenant's UTC offset, so both kinds of column select the same calendar days.

use crate::error::{FetchError, SectionResult};
use crate::fetcher::{EventQuery, EventSource};
use crate::schema::{DateField, EntityKind, EventStatus, MonetaryEvent};
use async_trait::async_trait;
use chrono::{DateTime, Days, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime, Offset, Utc};
use log::debug;
use reqwest::{Client, StatusCode};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

const REST_PATH: &str = "rest/v1";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, JsonSchema)]
pub struct RestTables {
    pub receivables: String,
    pub payables: String,
    pub sales: String,
}

impl Default for RestTables {
    fn default() -> Self {
        Self {
            receivables: "receivables".to_string(),
            payables: "payables".to_string(),
            sales: "sales".to_string(),
        }
    }
}

impl RestTables {
    pub fn table_for(&self, entity: EntityKind) -> &str {
        match entity {
            EntityKind::Receivable => &self.receivables,
            EntityKind::Payable => &self.payables,
            EntityKind::Sale => &self.sales,
        }
    }
}

#[derive(Clone)]
pub struct RestEventSource {
    client: Client,
    base_url: String,
    api_key: String,
    access_token: Option<String>,
    tables: RestTables,
    utc_offset: FixedOffset,
}

impl RestEventSource {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            access_token: None,
            tables: RestTables::default(),
            utc_offset: Utc.fix(),
        }
    }

    /// Signed-in user's token; row level security is evaluated against it.
    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_tables(mut self, tables: RestTables) -> Self {
        self.tables = tables;
        self
    }

    /// Offset of the tenant's wall clock, used for day boundaries and for
    /// the hour of each sale.
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    pub fn table_url(&self, entity: EntityKind) -> String {
        format!(
            "{}/{}/{}",
            self.base_url,
            REST_PATH,
            self.tables.table_for(entity)
        )
    }
}

/// Query string pairs for one fetch.
pub fn build_query_params(query: &EventQuery, utc_offset: &FixedOffset) -> Vec<(String, String)> {
    let field = query.date_field();
    let column = field.column();

    let mut params = vec![
        (
            "select".to_string(),
            format!("amount,{},category,status", column),
        ),
        (
            "tenant_id".to_string(),
            format!("eq.{}", query.tenant.tenant_id),
        ),
    ];

    if let Some(unit) = query.tenant.active_unit_id {
        params.push(("unit_id".to_string(), format!("eq.{}", unit)));
    }

    if field.has_time_component() {
        let after_end = query
            .range
            .end
            .checked_add_days(Days::new(1))
            .unwrap_or(query.range.end);
        params.push((
            column.to_string(),
            format!("gte.{}", day_start(query.range.start, utc_offset)),
        ));
        params.push((
            column.to_string(),
            format!("lt.{}", day_start(after_end, utc_offset)),
        ));
    } else {
        params.push((column.to_string(), format!("gte.{}", query.range.start)));
        params.push((column.to_string(), format!("lte.{}", query.range.end)));
    }

    params.push(("order".to_string(), format!("{}.asc", column)));
    params
}

fn day_start(date: NaiveDate, offset: &FixedOffset) -> String {
    format!("{}T00:00:00{}", date, offset)
}

#[derive(Debug, Deserialize)]
struct EventRow {
    amount: Decimal,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    status: Option<EventStatus>,
}

/// Parses a row date as the store returns it: RFC 3339 timestamps are moved
/// into `offset`, naive timestamps and bare dates are taken as wall time.
pub fn parse_row_timestamp(raw: &str, offset: &FixedOffset) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(offset).naive_local());
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(ts);
    }
    if let Ok(ts) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%.f") {
        return Some(ts);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|d| d.and_time(NaiveTime::MIN))
}

pub fn decode_rows(
    entity: EntityKind,
    body: &str,
    offset: &FixedOffset,
) -> SectionResult<Vec<MonetaryEvent>> {
    let rows: Vec<EventRow> = serde_json::from_str(body).map_err(|e| FetchError::Decode {
        entity,
        message: e.to_string(),
    })?;

    rows.into_iter()
        .map(|row| -> SectionResult<MonetaryEvent> {
            let raw_date = match entity.date_field() {
                DateField::CreatedAt => row.created_at.as_deref(),
                DateField::DueDate => row.due_date.as_deref(),
            }
            .ok_or_else(|| FetchError::Decode {
                entity,
                message: format!("row is missing {}", entity.date_field().column()),
            })?;

            let occurred_at =
                parse_row_timestamp(raw_date, offset).ok_or_else(|| FetchError::Decode {
                    entity,
                    message: format!("unparseable date '{}'", raw_date),
                })?;

            Ok(MonetaryEvent {
                amount: row.amount,
                occurred_at,
                category: row.category,
                status: row.status.unwrap_or_default(),
            })
        })
        .collect()
}

#[async_trait]
impl EventSource for RestEventSource {
    async fn fetch_events(&self, query: &EventQuery) -> SectionResult<Vec<MonetaryEvent>> {
        let entity = query.entity;
        let url = self.table_url(entity);
        let params = build_query_params(query, &self.utc_offset);
        let token = self.access_token.as_deref().unwrap_or(&self.api_key);

        let res = self
            .client
            .get(&url)
            .query(&params)
            .header("apikey", &self.api_key)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| FetchError::Network {
                entity,
                message: e.to_string(),
            })?;

        let status = res.status();
        let body = res.text().await.map_err(|e| FetchError::Network {
            entity,
            message: e.to_string(),
        })?;

        let events = map_response(entity, status, body, &self.utc_offset)?;
        debug!("Fetched {} {} rows from {}", events.len(), entity, url);
        Ok(events)
    }
}

/// Turns an HTTP reply into rows. 401 and 403 are permission failures,
/// any other non-2xx status is a backend failure.
pub fn map_response(
    entity: EntityKind,
    status: StatusCode,
    body: String,
    offset: &FixedOffset,
) -> SectionResult<Vec<MonetaryEvent>> {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Err(FetchError::Permission {
            entity,
            message: body,
        });
    }

    if !status.is_success() {
        return Err(FetchError::Backend {
            entity,
            status: status.as_u16(),
            message: body,
        });
    }

    decode_rows(entity, &body, offset)
}
