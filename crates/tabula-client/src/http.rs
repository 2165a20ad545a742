//! HTTP client for the review backend's REST API.

use serde::Serialize;
use serde::de::DeserializeOwned;
use tabula_core::{
    Document, EvaluationStats, ExtractedRecord, FieldType, Project, RecordStatus, ReviewAction,
    SchemaField, evaluate,
};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned {status}: {body}")]
    Server { status: u16, body: String },
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Client for the review backend.
///
/// The base URL is fixed at construction; there is no process-wide default.
/// Responses are never cached, so reads after a mutation always hit the server.
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct NewProject<'a> {
    name: &'a str,
    description: &'a str,
}

#[derive(Serialize)]
struct IngestRequest<'a> {
    filename: &'a str,
}

#[derive(Serialize)]
struct RecordUpdate<'a> {
    value: Option<&'a str>,
    status: RecordStatus,
}

#[derive(Serialize)]
struct NewSchemaField<'a> {
    project_id: i64,
    field_name: &'a str,
    field_description: &'a str,
    data_type: FieldType,
}

impl ApiClient {
    /// Create a client for the given backend base URL.
    ///
    /// `base_url` should be like `http://localhost:8000`; a trailing slash is trimmed.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── Transport helpers ──

    async fn read<T: DeserializeOwned>(resp: reqwest::Response) -> Result<T, ClientError> {
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: status.as_u16(),
                body,
            });
        }
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        let resp = self.client.get(&url).send().await?;
        Self::read(resp).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: Option<&B>,
    ) -> Result<T, ClientError> {
        let url = self.url(path);
        debug!(url = %url, "POST");
        let mut req = self.client.post(&url);
        if let Some(body) = body {
            req = req.json(body);
        }
        Self::read(req.send().await?).await
    }

    // ── Health ──

    /// `GET /health`; true when the backend reports `{"status": "ok"}`.
    pub async fn health(&self) -> Result<bool, ClientError> {
        let body: serde_json::Value = self.get("/health").await?;
        Ok(body.get("status").and_then(|s| s.as_str()) == Some("ok"))
    }

    // ── Projects ──

    pub async fn list_projects(&self) -> Result<Vec<Project>, ClientError> {
        self.get("/projects").await
    }

    pub async fn create_project(
        &self,
        name: &str,
        description: &str,
    ) -> Result<Project, ClientError> {
        let project: Project = self
            .post("/projects", Some(&NewProject { name, description }))
            .await?;
        info!(project_id = project.id, name, "created remote project");
        Ok(project)
    }

    pub async fn get_project(&self, id: i64) -> Result<Project, ClientError> {
        self.get(&format!("/projects/{id}")).await
    }

    // ── Documents ──

    /// Files available for ingestion in the backend's data directory.
    pub async fn list_files(&self) -> Result<Vec<String>, ClientError> {
        self.get("/files").await
    }

    pub async fn ingest_document(
        &self,
        project_id: i64,
        filename: &str,
    ) -> Result<Document, ClientError> {
        let doc: Document = self
            .post(
                &format!("/projects/{project_id}/ingest"),
                Some(&IngestRequest { filename }),
            )
            .await?;
        info!(document_id = doc.id, project_id, filename, "ingested remote document");
        Ok(doc)
    }

    pub async fn list_documents(&self, project_id: i64) -> Result<Vec<Document>, ClientError> {
        self.get(&format!("/projects/{project_id}/documents")).await
    }

    pub async fn get_document(&self, id: i64) -> Result<Document, ClientError> {
        self.get(&format!("/documents/{id}")).await
    }

    /// Trigger (re-)extraction; the backend replaces the document's records.
    pub async fn extract_document(&self, id: i64) -> Result<Vec<ExtractedRecord>, ClientError> {
        let records: Vec<ExtractedRecord> = self
            .post::<(), _>(&format!("/documents/{id}/extract"), None)
            .await?;
        info!(document_id = id, count = records.len(), "extraction complete");
        Ok(records)
    }

    // ── Records ──

    pub async fn get_records(&self, document_id: i64) -> Result<Vec<ExtractedRecord>, ClientError> {
        self.get(&format!("/documents/{document_id}/records")).await
    }

    /// `PUT /records/{id}` with a raw value and status.
    pub async fn update_record(
        &self,
        id: i64,
        value: Option<&str>,
        status: RecordStatus,
    ) -> Result<ExtractedRecord, ClientError> {
        let url = self.url(&format!("/records/{id}"));
        info!(url = %url, %status, "updating record");
        let resp = self
            .client
            .put(&url)
            .json(&RecordUpdate { value, status })
            .send()
            .await?;
        Self::read(resp).await
    }

    /// Apply a reviewer action to a fetched record and send the result.
    ///
    /// Approving resets the value to `ai_value`. A record the backend returned
    /// without an `ai_value` is therefore approved with a null value.
    pub async fn review(
        &self,
        record: &ExtractedRecord,
        action: ReviewAction,
    ) -> Result<ExtractedRecord, ClientError> {
        if action == ReviewAction::Approve && record.ai_value.is_none() && record.value.is_some() {
            warn!(
                record_id = record.id,
                field = %record.field_name,
                "approving record without ai_value clears its current value"
            );
        }
        let mut reviewed = record.clone();
        reviewed.apply(action);
        self.update_record(reviewed.id, reviewed.value.as_deref(), reviewed.status)
            .await
    }

    /// Every record across a project's documents, fetched concurrently.
    pub async fn project_records(
        &self,
        project_id: i64,
    ) -> Result<Vec<ExtractedRecord>, ClientError> {
        let documents = self.list_documents(project_id).await?;
        let per_doc =
            futures::future::try_join_all(documents.iter().map(|d| self.get_records(d.id)))
                .await?;
        let records: Vec<ExtractedRecord> = per_doc.into_iter().flatten().collect();
        debug!(project_id, documents = documents.len(), records = records.len(), "fetched project records");
        Ok(records)
    }

    // ── Schema ──

    pub async fn get_schema(&self, project_id: i64) -> Result<Vec<SchemaField>, ClientError> {
        self.get(&format!("/projects/{project_id}/schema")).await
    }

    pub async fn add_schema_field(
        &self,
        project_id: i64,
        field_name: &str,
        field_description: &str,
        data_type: FieldType,
    ) -> Result<SchemaField, ClientError> {
        self.post(
            &format!("/projects/{project_id}/schema"),
            Some(&NewSchemaField {
                project_id,
                field_name,
                field_description,
                data_type,
            }),
        )
        .await
    }

    pub async fn delete_schema_field(
        &self,
        project_id: i64,
        field_id: i64,
    ) -> Result<(), ClientError> {
        let url = self.url(&format!("/projects/{project_id}/schema/{field_id}"));
        info!(url = %url, "deleting schema field");
        let resp = self.client.delete(&url).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(ClientError::Server {
                status: status.as_u16(),
                body,
            });
        }
        Ok(())
    }

    // ── Evaluation ──

    /// The backend's own evaluation numbers.
    pub async fn get_evaluation(&self, project_id: i64) -> Result<EvaluationStats, ClientError> {
        self.get(&format!("/projects/{project_id}/evaluation")).await
    }

    /// Fetch the project's records and evaluate them locally, including the
    /// per-field breakdown.
    pub async fn evaluate_remote(&self, project_id: i64) -> Result<EvaluationStats, ClientError> {
        let records = self.project_records(project_id).await?;
        let stats = evaluate(&records);
        info!(
            project_id,
            total = stats.total_fields,
            reviewed = stats.reviewed_fields,
            accuracy = stats.accuracy,
            "evaluated remote project"
        );
        Ok(stats)
    }
}
