//! State behind one entity screen of the back office: a searchable table,
//! a drill-down detail view, create/edit/delete actions and the audit-log
//! drawer.

use tracing::{debug, warn};

use crate::api::{ApiClient, ApiError};
use crate::models::{AuditLogEntry, ListQuery, OrderStatus, Record, RecordId};
use crate::resources::{Entity, Resource};

/// What the screen is showing
#[derive(Debug, Clone, PartialEq)]
pub enum View {
    Table,
    Detail(Record),
}

/// Feedback for the user about the last action
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Success(String),
    Error(String),
}

impl Notice {
    pub fn text(&self) -> &str {
        match self {
            Notice::Success(text) | Notice::Error(text) => text,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Notice::Error(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// Nothing differed from the original; no request was sent
    Unchanged,
    Saved,
}

/// Master-detail controller for one entity.
///
/// Operations take `&mut self`, so one screen never runs two at once.
pub struct MasterDetail {
    client: ApiClient,
    entity: Entity,
    rows: Vec<Record>,
    query: ListQuery,
    view: View,
    logs: Option<Vec<AuditLogEntry>>,
    notice: Option<Notice>,
}

impl MasterDetail {
    pub fn new(client: ApiClient, entity: Entity) -> Self {
        Self {
            client,
            entity,
            rows: Vec::new(),
            query: ListQuery::default(),
            view: View::Table,
            logs: None,
            notice: None,
        }
    }

    pub fn entity(&self) -> Entity {
        self.entity
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn query(&self) -> &ListQuery {
        &self.query
    }

    pub fn view(&self) -> &View {
        &self.view
    }

    pub fn detail(&self) -> Option<&Record> {
        match self.view {
            View::Detail(ref record) => Some(record),
            View::Table => None,
        }
    }

    /// Open audit-log drawer entries, `None` when the drawer is closed
    pub fn logs(&self) -> Option<&[AuditLogEntry]> {
        self.logs.as_deref()
    }

    pub fn notice(&self) -> Option<&Notice> {
        self.notice.as_ref()
    }

    pub fn take_notice(&mut self) -> Option<Notice> {
        self.notice.take()
    }

    fn resource(&self) -> Resource {
        self.client.resource(self.entity)
    }

    fn fail(&mut self, action: &str, error: ApiError) -> ApiError {
        warn!(entity = %self.entity, error = %error, "{} failed", action);
        self.notice = Some(Notice::Error(format!("{} failed: {}", action, error)));
        error
    }

    fn succeed(&mut self, text: String) {
        self.notice = Some(Notice::Success(text));
    }

    // ===== Table =====

    /// Reload the table with the current query
    pub async fn reload(&mut self) -> Result<(), ApiError> {
        let result = self.resource().list(&self.query).await.and_then(|env| env.into_data());
        match result {
            Ok(rows) => {
                debug!(entity = %self.entity, count = rows.len(), "Rows loaded");
                self.rows = rows;
                Ok(())
            }
            Err(e) => Err(self.fail(&format!("Loading {}", self.entity.plural()), e)),
        }
    }

    /// Search by keyword; an empty keyword shows everything again
    pub async fn search(&mut self, keyword: &str) -> Result<(), ApiError> {
        self.query = std::mem::take(&mut self.query).with_keyword(keyword);
        self.reload().await
    }

    /// Replace the whole query, e.g. to add filters
    pub async fn apply_query(&mut self, query: ListQuery) -> Result<(), ApiError> {
        self.query = query;
        self.reload().await
    }

    /// Reload after a successful change. The change already happened, so a
    /// failure here only leaves stale rows on screen.
    async fn reload_after_change(&mut self) {
        let result = self.resource().list(&self.query).await.and_then(|env| env.into_data());
        match result {
            Ok(rows) => self.rows = rows,
            Err(e) => warn!(entity = %self.entity, error = %e, "Reload after change failed"),
        }
    }

    // ===== Detail =====

    /// Show a record, then refresh it from the backend.
    ///
    /// The row data stays on screen if the refresh fails.
    pub async fn open_detail(&mut self, record: Record) -> Result<(), ApiError> {
        let id = record.id();
        self.view = View::Detail(record);

        let Some(id) = id else {
            return Ok(());
        };
        match self.resource().get(&id).await.and_then(|env| env.into_data()) {
            Ok(fresh) => {
                if self.showing(&id) {
                    self.view = View::Detail(fresh);
                }
                Ok(())
            }
            Err(e) => Err(self.fail("Loading details", e)),
        }
    }

    pub fn back_to_table(&mut self) {
        self.view = View::Table;
    }

    fn showing(&self, id: &RecordId) -> bool {
        self.detail().and_then(Record::id).as_ref() == Some(id)
    }

    // ===== Changes =====

    pub async fn create(&mut self, record: Record) -> Result<(), ApiError> {
        if !self.entity.supports_create() {
            return Err(self.fail("Create", ApiError::Unsupported(self.entity.to_string())));
        }
        if let Err(e) = self.resource().create(&record).await.and_then(|env| env.accepted()) {
            return Err(self.fail("Create", e));
        }
        self.succeed(format!("{} created", self.entity));
        self.reload_after_change().await;
        Ok(())
    }

    /// Save an edit, sending only the fields that differ from `original`.
    pub async fn edit(&mut self, original: &Record, edited: &Record) -> Result<EditOutcome, ApiError> {
        let Some(id) = original.id() else {
            return Err(self.fail("Update", ApiError::MissingId));
        };
        let Some(changes) = original.changes_to(edited) else {
            debug!(entity = %self.entity, %id, "Edit has no changes");
            return Ok(EditOutcome::Unchanged);
        };

        if let Err(e) = self.resource().update(&id, &changes).await.and_then(|env| env.accepted()) {
            return Err(self.fail("Update", e));
        }
        self.succeed(format!("{} updated", self.entity));
        self.reload_after_change().await;
        self.refresh_open_detail(&id).await;
        Ok(EditOutcome::Saved)
    }

    pub async fn delete(&mut self, record: &Record) -> Result<(), ApiError> {
        let Some(id) = record.id() else {
            return Err(self.fail("Delete", ApiError::MissingId));
        };
        if let Err(e) = self.resource().delete(&id).await.and_then(|env| env.accepted()) {
            return Err(self.fail("Delete", e));
        }
        if self.showing(&id) {
            self.view = View::Table;
        }
        self.succeed(format!("{} deleted", self.entity));
        self.reload_after_change().await;
        Ok(())
    }

    /// Orders only: move an order to a new status.
    pub async fn change_order_status(&mut self, record: &Record, status: OrderStatus) -> Result<(), ApiError> {
        if self.entity != Entity::Order {
            return Err(self.fail("Status change", ApiError::Unsupported(self.entity.to_string())));
        }
        let Some(id) = record.id() else {
            return Err(self.fail("Status change", ApiError::MissingId));
        };
        let result = self
            .client
            .orders()
            .update_status(&id, status)
            .await
            .and_then(|env| env.accepted());
        if let Err(e) = result {
            return Err(self.fail("Status change", e));
        }
        self.succeed(format!("Order status set to {}", status.display_name()));
        self.reload_after_change().await;
        self.refresh_open_detail(&id).await;
        Ok(())
    }

    async fn refresh_open_detail(&mut self, id: &RecordId) {
        if !self.showing(id) {
            return;
        }
        match self.resource().get(id).await.and_then(|env| env.into_data()) {
            Ok(fresh) => self.view = View::Detail(fresh),
            Err(e) => warn!(entity = %self.entity, error = %e, "Detail refresh failed"),
        }
    }

    // ===== Audit log drawer =====

    pub async fn show_logs(&mut self) -> Result<(), ApiError> {
        match self.resource().logs().await.and_then(|env| env.into_data()) {
            Ok(entries) => {
                self.logs = Some(entries);
                Ok(())
            }
            Err(e) => Err(self.fail("Loading audit log", e)),
        }
    }

    pub fn close_logs(&mut self) {
        self.logs = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ApiClientConfig;
    use crate::auth::{Session, SessionManager};
    use serde_json::{json, Value};
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn console(server: &MockServer, entity: Entity) -> MasterDetail {
        let sessions = SessionManager::in_memory().shared();
        sessions.set(Session::new("token", "refresh")).await.unwrap();
        let config = ApiClientConfig {
            base_url: server.uri(),
            ..Default::default()
        };
        MasterDetail::new(ApiClient::new(&config, sessions).unwrap(), entity)
    }

    fn record(value: Value) -> Record {
        Record::from_value(value).unwrap()
    }

    async fn mount_list(server: &MockServer, collection: &str, rows: Value) {
        Mock::given(method("GET"))
            .and(path(collection))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true, "data": rows})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn test_search_loads_rows_and_keeps_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/products"))
            .and(query_param("keyword", "kem"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"id": 1, "name": "Kem"}]})))
            .expect(1)
            .mount(&server)
            .await;

        let mut screen = console(&server, Entity::Product).await;
        screen.search("kem").await.unwrap();

        assert_eq!(screen.rows().len(), 1);
        assert_eq!(screen.query().keyword.as_deref(), Some("kem"));
        assert!(screen.notice().is_none());
    }

    #[tokio::test]
    async fn test_load_failure_sets_error_notice() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/coupons"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let mut screen = console(&server, Entity::Coupon).await;
        assert!(screen.reload().await.is_err());
        let notice = screen.take_notice().unwrap();
        assert!(notice.is_error());
        assert!(notice.text().starts_with("Loading coupons failed"));
        assert!(screen.notice().is_none());
    }

    #[tokio::test]
    async fn test_open_detail_refreshes_record() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/orders/o1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"_id": "o1", "status": "pending", "cart": [{"name": "Serum"}]}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut screen = console(&server, Entity::Order).await;
        screen.open_detail(record(json!({"_id": "o1"}))).await.unwrap();

        let detail = screen.detail().unwrap();
        assert_eq!(detail.str_field("status"), Some("pending"));

        screen.back_to_table();
        assert_eq!(screen.view(), &View::Table);
    }

    #[tokio::test]
    async fn test_open_detail_keeps_row_on_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/brands/3"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mut screen = console(&server, Entity::Brand).await;
        let row = record(json!({"id": 3, "name": "Row copy"}));
        assert!(screen.open_detail(row.clone()).await.is_err());
        assert_eq!(screen.detail(), Some(&row));
    }

    #[tokio::test]
    async fn test_edit_without_changes_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let mut screen = console(&server, Entity::Brand).await;
        let original = record(json!({"id": 3, "name": "Acme"}));
        let outcome = screen.edit(&original, &record(json!({"name": "Acme"}))).await.unwrap();
        assert_eq!(outcome, EditOutcome::Unchanged);
    }

    #[tokio::test]
    async fn test_edit_sends_only_changed_fields_and_reloads() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/categories/5"))
            .and(body_json(json!({"name": "Skin care"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;
        mount_list(&server, "/categories", json!([{"id": 5, "name": "Skin care"}])).await;

        let mut screen = console(&server, Entity::Category).await;
        let original = record(json!({"id": 5, "name": "Skincare", "slug": "skin"}));
        let edited = record(json!({"name": "Skin care", "slug": "skin"}));

        assert_eq!(screen.edit(&original, &edited).await.unwrap(), EditOutcome::Saved);
        assert_eq!(screen.rows()[0].str_field("name"), Some("Skin care"));
        assert_eq!(screen.notice(), Some(&Notice::Success("Category updated".to_string())));
    }

    #[tokio::test]
    async fn test_edit_rejected_by_backend() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/brands/3"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "success": false,
                "message": "Brand is already exists"
            })))
            .mount(&server)
            .await;

        let mut screen = console(&server, Entity::Brand).await;
        let result = screen
            .edit(&record(json!({"id": 3, "name": "A"})), &record(json!({"name": "B"})))
            .await;

        assert!(matches!(result, Err(ApiError::Rejected(ref m)) if m.contains("Brand is already exists")));
        assert!(screen.notice().unwrap().is_error());
    }

    #[tokio::test]
    async fn test_delete_closes_open_detail() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/roles/r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": {"id": "r1"}})))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/roles/r1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;
        mount_list(&server, "/roles", json!([])).await;

        let mut screen = console(&server, Entity::Role).await;
        let role = record(json!({"id": "r1"}));
        screen.open_detail(role.clone()).await.unwrap();
        screen.delete(&role).await.unwrap();

        assert_eq!(screen.view(), &View::Table);
        assert!(screen.rows().is_empty());
    }

    #[tokio::test]
    async fn test_orders_cannot_be_created() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(201))
            .expect(0)
            .mount(&server)
            .await;

        let mut screen = console(&server, Entity::Order).await;
        let result = screen.create(record(json!({"name": "x"}))).await;
        assert!(matches!(result, Err(ApiError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_change_order_status() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/orders/o9"))
            .and(body_json(json!({"newStatus": "processing"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .expect(1)
            .mount(&server)
            .await;
        mount_list(&server, "/orders", json!([{"_id": "o9", "status": "processing"}])).await;

        let mut screen = console(&server, Entity::Order).await;
        screen
            .change_order_status(&record(json!({"_id": "o9"})), OrderStatus::Processing)
            .await
            .unwrap();
        assert_eq!(screen.rows()[0].str_field("status"), Some("processing"));

        let mut products = console(&server, Entity::Product).await;
        let result = products
            .change_order_status(&record(json!({"id": 1})), OrderStatus::Cancel)
            .await;
        assert!(matches!(result, Err(ApiError::Unsupported(_))));
    }

    #[tokio::test]
    async fn test_log_drawer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/logs/collection"))
            .and(query_param("tableName", "Employee"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": [{"action": "update"}]})))
            .expect(1)
            .mount(&server)
            .await;

        let mut screen = console(&server, Entity::Employee).await;
        assert!(screen.logs().is_none());
        screen.show_logs().await.unwrap();
        assert_eq!(screen.logs().map(|l| l.len()), Some(1));
        screen.close_logs();
        assert!(screen.logs().is_none());
    }
}
