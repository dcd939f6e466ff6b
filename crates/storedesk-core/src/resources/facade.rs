use serde_json::Value;

use super::Entity;
use crate::api::{ApiClient, ApiError, RequestDescriptor};
use crate::models::{ApiEnvelope, AuditLogEntry, ListQuery, OrderStatus, Record, RecordId, StatusChange};

const LOGS_PATH: &str = "/logs/collection";

/// CRUD calls for one backend collection.
///
/// Each method is a single request with a fixed path; bodies and query
/// parameters pass through untouched and errors come straight from the client.
#[derive(Clone)]
pub struct Resource {
    client: ApiClient,
    entity: Entity,
}

impl Resource {
    pub fn new(client: ApiClient, entity: Entity) -> Self {
        Self { client, entity }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    fn item_path(&self, id: &RecordId) -> String {
        format!("{}/{}", self.entity.path(), urlencoding::encode(id.as_str()))
    }

    pub async fn list(&self, query: &ListQuery) -> Result<ApiEnvelope<Vec<Record>>, ApiError> {
        self.client
            .send(RequestDescriptor::get(self.entity.path()).with_query(query.to_pairs()))
            .await
    }

    pub async fn get(&self, id: &RecordId) -> Result<ApiEnvelope<Record>, ApiError> {
        self.client.send(RequestDescriptor::get(self.item_path(id))).await
    }

    pub async fn create(&self, record: &Record) -> Result<ApiEnvelope<Value>, ApiError> {
        self.client
            .send(RequestDescriptor::post(self.entity.path(), record.clone().into_value()))
            .await
    }

    pub async fn update(&self, id: &RecordId, changes: &Record) -> Result<ApiEnvelope<Value>, ApiError> {
        self.client
            .send(RequestDescriptor::put(self.item_path(id), changes.clone().into_value()))
            .await
    }

    pub async fn delete(&self, id: &RecordId) -> Result<ApiEnvelope<Value>, ApiError> {
        self.client.send(RequestDescriptor::delete(self.item_path(id))).await
    }

    /// Audit trail of the whole collection
    pub async fn logs(&self) -> Result<ApiEnvelope<Vec<AuditLogEntry>>, ApiError> {
        self.client
            .send(RequestDescriptor::get(LOGS_PATH).with_query_pair("tableName", self.entity.table_name()))
            .await
    }
}

/// Order calls. Orders are placed by the storefront, so there is no create.
#[derive(Clone)]
pub struct Orders {
    inner: Resource,
}

impl Orders {
    pub fn new(client: ApiClient) -> Self {
        Self {
            inner: Resource::new(client, Entity::Order),
        }
    }

    pub async fn list(&self, query: &ListQuery) -> Result<ApiEnvelope<Vec<Record>>, ApiError> {
        self.inner.list(query).await
    }

    pub async fn get(&self, id: &RecordId) -> Result<ApiEnvelope<Record>, ApiError> {
        self.inner.get(id).await
    }

    pub async fn update(&self, id: &RecordId, changes: &Record) -> Result<ApiEnvelope<Value>, ApiError> {
        self.inner.update(id, changes).await
    }

    /// Move an order to a new fulfilment status
    pub async fn update_status(&self, id: &RecordId, status: OrderStatus) -> Result<ApiEnvelope<Value>, ApiError> {
        let body = serde_json::to_value(StatusChange { new_status: status })
            .map_err(|e| ApiError::InvalidResponse(e.to_string()))?;
        self.inner
            .client
            .send(RequestDescriptor::put(self.inner.item_path(id), body))
            .await
    }

    pub async fn delete(&self, id: &RecordId) -> Result<ApiEnvelope<Value>, ApiError> {
        self.inner.delete(id).await
    }

    pub async fn logs(&self) -> Result<ApiEnvelope<Vec<AuditLogEntry>>, ApiError> {
        self.inner.logs().await
    }
}

impl ApiClient {
    /// Facade for any collection
    pub fn resource(&self, entity: Entity) -> Resource {
        Resource::new(self.clone(), entity)
    }

    pub fn products(&self) -> Resource {
        self.resource(Entity::Product)
    }

    pub fn orders(&self) -> Orders {
        Orders::new(self.clone())
    }

    pub fn brands(&self) -> Resource {
        self.resource(Entity::Brand)
    }

    pub fn categories(&self) -> Resource {
        self.resource(Entity::Category)
    }

    pub fn coupons(&self) -> Resource {
        self.resource(Entity::Coupon)
    }

    pub fn employees(&self) -> Resource {
        self.resource(Entity::Employee)
    }

    pub fn roles(&self) -> Resource {
        self.resource(Entity::Role)
    }

    pub fn departments(&self) -> Resource {
        self.resource(Entity::Department)
    }
}
