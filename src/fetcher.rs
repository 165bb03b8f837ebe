use crate::error::{FetchError, SectionResult};
use crate::schema::{DateField, EntityKind, MonetaryEvent, TenantContext};
use crate::utils::DateRange;
use async_trait::async_trait;
use log::debug;
use std::collections::HashMap;
use std::sync::Arc;

/// One range-filtered read: every `entity` row of the tenant (and unit, when
/// one is selected) whose date column falls inside `range`.
#[derive(Debug, Clone, PartialEq)]
pub struct EventQuery {
    pub entity: EntityKind,
    pub tenant: TenantContext,
    pub range: DateRange,
}

impl EventQuery {
    pub fn new(entity: EntityKind, tenant: &TenantContext, range: DateRange) -> Self {
        Self {
            entity,
            tenant: tenant.clone(),
            range,
        }
    }

    pub fn date_field(&self) -> DateField {
        self.entity.date_field()
    }
}

/// Read side of the hosted data store. Implementations return the full
/// result set for the window; there is no pagination.
#[async_trait]
pub trait EventSource: Send + Sync {
    async fn fetch_events(&self, query: &EventQuery) -> SectionResult<Vec<MonetaryEvent>>;
}

#[async_trait]
impl<S: EventSource + ?Sized> EventSource for Arc<S> {
    async fn fetch_events(&self, query: &EventQuery) -> SectionResult<Vec<MonetaryEvent>> {
        (**self).fetch_events(query).await
    }
}

#[derive(Debug, Clone)]
struct StoredEvent {
    tenant_id: String,
    unit_id: Option<i64>,
    entity: EntityKind,
    event: MonetaryEvent,
}

/// Event source backed by a vector of rows. Applies the same tenant, unit
/// and day-resolution range filtering as the hosted store, and can be told
/// to fail for an entity kind.
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventSource {
    rows: Vec<StoredEvent>,
    failures: HashMap<EntityKind, FetchError>,
}

impl InMemoryEventSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(
        &mut self,
        tenant_id: impl Into<String>,
        unit_id: Option<i64>,
        entity: EntityKind,
        event: MonetaryEvent,
    ) -> &mut Self {
        self.rows.push(StoredEvent {
            tenant_id: tenant_id.into(),
            unit_id,
            entity,
            event,
        });
        self
    }

    pub fn fail_entity(&mut self, entity: EntityKind, error: FetchError) -> &mut Self {
        self.failures.insert(entity, error);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[async_trait]
impl EventSource for InMemoryEventSource {
    async fn fetch_events(&self, query: &EventQuery) -> SectionResult<Vec<MonetaryEvent>> {
        if let Some(error) = self.failures.get(&query.entity) {
            return Err(error.clone());
        }

        let events: Vec<MonetaryEvent> = self
            .rows
            .iter()
            .filter(|row| row.entity == query.entity)
            .filter(|row| row.tenant_id == query.tenant.tenant_id)
            .filter(|row| match query.tenant.active_unit_id {
                Some(unit) => row.unit_id == Some(unit),
                None => true,
            })
            .filter(|row| query.range.contains(row.event.occurred_at))
            .map(|row| row.event.clone())
            .collect();

        debug!(
            "In-memory source returned {} {} rows for tenant {} ({} to {})",
            events.len(),
            query.entity,
            query.tenant.tenant_id,
            query.range.start,
            query.range.end
        );
        Ok(events)
    }
}
