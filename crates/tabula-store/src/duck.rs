//! DuckDB storage for the review workflow.

use std::path::Path;

use arrow::record_batch::RecordBatch;
use duckdb::{Connection, OptionalExt, Row, params};
use tabula_core::{
    Document, DocumentStatus, EvaluationStats, ExtractedRecord, ExtractionResult, FieldType,
    Project, RecordStatus, ReviewAction, SchemaField, effective_fields, evaluate,
    records_from_results,
};
use tracing::{debug, info};

use crate::StoreError;

const SCHEMA_SQL: &str = "
    CREATE SEQUENCE IF NOT EXISTS projects_id_seq START 1;
    CREATE TABLE IF NOT EXISTS projects (
        id BIGINT PRIMARY KEY DEFAULT nextval('projects_id_seq'),
        name VARCHAR NOT NULL,
        description VARCHAR,
        created_at VARCHAR NOT NULL
    );

    CREATE SEQUENCE IF NOT EXISTS documents_id_seq START 1;
    CREATE TABLE IF NOT EXISTS documents (
        id BIGINT PRIMARY KEY DEFAULT nextval('documents_id_seq'),
        project_id BIGINT NOT NULL,
        filename VARCHAR NOT NULL,
        content VARCHAR NOT NULL,
        file_path VARCHAR NOT NULL,
        status VARCHAR NOT NULL,
        created_at VARCHAR NOT NULL
    );

    CREATE SEQUENCE IF NOT EXISTS schema_fields_id_seq START 1;
    CREATE TABLE IF NOT EXISTS schema_fields (
        id BIGINT PRIMARY KEY DEFAULT nextval('schema_fields_id_seq'),
        project_id BIGINT NOT NULL,
        field_name VARCHAR NOT NULL,
        field_description VARCHAR NOT NULL,
        data_type VARCHAR NOT NULL
    );

    CREATE SEQUENCE IF NOT EXISTS extracted_records_id_seq START 1;
    CREATE TABLE IF NOT EXISTS extracted_records (
        id BIGINT PRIMARY KEY DEFAULT nextval('extracted_records_id_seq'),
        document_id BIGINT NOT NULL,
        field_name VARCHAR NOT NULL,
        value VARCHAR,
        ai_value VARCHAR,
        confidence DOUBLE,
        ai_confidence DOUBLE,
        citation VARCHAR,
        normalization VARCHAR,
        status VARCHAR NOT NULL
    );
";

const PROJECT_COLUMNS: &str = "id, name, description, created_at";
const DOCUMENT_COLUMNS: &str = "id, project_id, filename, content, file_path, status, created_at";
const FIELD_COLUMNS: &str = "id, project_id, field_name, field_description, data_type";
const RECORD_COLUMNS: &str = "id, document_id, field_name, value, ai_value, confidence, \
                              ai_confidence, citation, normalization, status";

/// File extensions read as plain UTF-8 text on ingest.
const TEXT_EXTENSIONS: &[&str] = &["txt", "text", "md"];

/// DuckDB store for projects, documents, extraction schema, and review records.
///
/// Tables are created on open if missing, so a fresh file and an existing
/// one behave the same. Use [`open`](Self::open) for an ephemeral in-memory
/// database and [`open_persistent`](Self::open_persistent) for a file that
/// survives across process restarts.
///
/// Nothing here caches derived numbers: [`evaluate_project`](Self::evaluate_project)
/// reads the current rows every time it is called.
pub struct ReviewStore {
    conn: Connection,
}

impl ReviewStore {
    /// Open an in-memory DuckDB database.
    pub fn open() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        Self::init(conn)
    }

    /// Open or create a persistent DuckDB database at the given path.
    pub fn open_persistent(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "opened review store");
        Self::init(conn)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA_SQL)?;
        Ok(Self { conn })
    }

    // ── Counts ──

    /// Number of rows in the `projects` table.
    pub fn project_count(&self) -> Result<usize, StoreError> {
        self.count_table("projects")
    }

    /// Number of rows in the `documents` table.
    pub fn document_count(&self) -> Result<usize, StoreError> {
        self.count_table("documents")
    }

    /// Number of rows in the `extracted_records` table.
    pub fn record_count(&self) -> Result<usize, StoreError> {
        self.count_table("extracted_records")
    }

    fn count_table(&self, table: &str) -> Result<usize, StoreError> {
        let sql = format!("SELECT count(*)::BIGINT AS cnt FROM {table}");
        let mut stmt = self.conn.prepare(&sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        let batch = batches.first().ok_or(StoreError::NoResults)?;
        let col = batch
            .column(0)
            .as_any()
            .downcast_ref::<arrow::array::Int64Array>()
            .ok_or_else(|| StoreError::Other("count column not i64".into()))?;
        Ok(col.value(0) as usize)
    }

    // ── Projects ──

    /// Insert a project and return it with its assigned id.
    pub fn create_project(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<Project, StoreError> {
        let created_at = now();
        let sql = format!(
            "INSERT INTO projects (name, description, created_at) VALUES (?, ?, ?)
             RETURNING {PROJECT_COLUMNS}"
        );
        let project = self.conn.query_row(
            &sql,
            params![name, description, created_at],
            project_from_row,
        )?;
        info!(project_id = project.id, name, "created project");
        Ok(project)
    }

    /// All projects, oldest first.
    pub fn list_projects(&self) -> Result<Vec<Project>, StoreError> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([], project_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Fetch a single project by id.
    pub fn get_project(&self, id: i64) -> Result<Project, StoreError> {
        let sql = format!("SELECT {PROJECT_COLUMNS} FROM projects WHERE id = ?");
        self.conn
            .query_row(&sql, [id], project_from_row)
            .optional()?
            .ok_or(StoreError::NotFound {
                entity: "project",
                id,
            })
    }

    // ── Extraction schema ──

    /// Add a field to a project's extraction schema. Field names are unique per project.
    pub fn add_schema_field(
        &self,
        project_id: i64,
        field_name: &str,
        field_description: &str,
        data_type: FieldType,
    ) -> Result<SchemaField, StoreError> {
        self.get_project(project_id)?;
        let exists: i64 = self.conn.query_row(
            "SELECT count(*)::BIGINT FROM schema_fields WHERE project_id = ? AND field_name = ?",
            params![project_id, field_name],
            |row| row.get(0),
        )?;
        if exists > 0 {
            return Err(StoreError::DuplicateField {
                project_id,
                field_name: field_name.to_string(),
            });
        }

        let sql = format!(
            "INSERT INTO schema_fields (project_id, field_name, field_description, data_type)
             VALUES (?, ?, ?, ?) RETURNING {FIELD_COLUMNS}"
        );
        let field = self.conn.query_row(
            &sql,
            params![project_id, field_name, field_description, data_type.as_str()],
            field_from_row,
        )?;
        info!(project_id, field = field_name, "added schema field");
        Ok(field)
    }

    /// A project's own schema fields in creation order (empty if it uses the defaults).
    pub fn list_schema_fields(&self, project_id: i64) -> Result<Vec<SchemaField>, StoreError> {
        let sql = format!("SELECT {FIELD_COLUMNS} FROM schema_fields WHERE project_id = ? ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([project_id], field_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Remove a schema field from a project.
    pub fn delete_schema_field(&self, project_id: i64, field_id: i64) -> Result<(), StoreError> {
        let deleted = self.conn.execute(
            "DELETE FROM schema_fields WHERE project_id = ? AND id = ?",
            params![project_id, field_id],
        )?;
        if deleted == 0 {
            return Err(StoreError::NotFound {
                entity: "schema field",
                id: field_id,
            });
        }
        info!(project_id, field_id, "deleted schema field");
        Ok(())
    }

    // ── Documents ──

    /// Store already-extracted document text under a project.
    pub fn add_document(
        &self,
        project_id: i64,
        filename: &str,
        content: &str,
        file_path: &str,
    ) -> Result<Document, StoreError> {
        self.get_project(project_id)?;
        let sql = format!(
            "INSERT INTO documents (project_id, filename, content, file_path, status, created_at)
             VALUES (?, ?, ?, ?, ?, ?) RETURNING {DOCUMENT_COLUMNS}"
        );
        let doc = self.conn.query_row(
            &sql,
            params![
                project_id,
                filename,
                content,
                file_path,
                DocumentStatus::Ingested.as_str(),
                now()
            ],
            document_from_row,
        )?;
        info!(document_id = doc.id, project_id, filename, chars = content.len(), "ingested document");
        Ok(doc)
    }

    /// Read a plain-text file from disk and add it to a project.
    pub fn ingest_text(&self, project_id: i64, path: &Path) -> Result<Document, StoreError> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();
        if !TEXT_EXTENSIONS.contains(&ext.as_str()) {
            return Err(StoreError::UnsupportedFile(path.to_path_buf()));
        }
        let content = std::fs::read_to_string(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        self.add_document(project_id, &filename, &content, &path.display().to_string())
    }

    /// Documents of a project, oldest first.
    pub fn list_documents(&self, project_id: i64) -> Result<Vec<Document>, StoreError> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE project_id = ? ORDER BY id");
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([project_id], document_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// Fetch a single document by id.
    pub fn get_document(&self, id: i64) -> Result<Document, StoreError> {
        let sql = format!("SELECT {DOCUMENT_COLUMNS} FROM documents WHERE id = ?");
        self.conn
            .query_row(&sql, [id], document_from_row)
            .optional()?
            .ok_or(StoreError::NotFound {
                entity: "document",
                id,
            })
    }

    /// Overwrite a document's processing status.
    pub fn set_document_status(&self, id: i64, status: DocumentStatus) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE documents SET status = ? WHERE id = ?",
            params![status.as_str(), id],
        )?;
        if updated == 0 {
            return Err(StoreError::NotFound {
                entity: "document",
                id,
            });
        }
        debug!(document_id = id, %status, "document status updated");
        Ok(())
    }

    // ── Records ──

    /// Replace a document's records with a fresh extraction.
    ///
    /// One pending record is written per effective schema field (the project's
    /// own schema, or the default legal field set). Old records are deleted
    /// and the document is marked `extracted` in the same transaction.
    pub fn replace_records(
        &mut self,
        document_id: i64,
        results: Vec<ExtractionResult>,
    ) -> Result<Vec<ExtractedRecord>, StoreError> {
        let doc = self.get_document(document_id)?;
        let schema = self.list_schema_fields(doc.project_id)?;
        let fields = effective_fields(doc.project_id, &schema);
        let records = records_from_results(document_id, &fields, results);

        let tx = self.conn.transaction()?;
        let removed = tx.execute(
            "DELETE FROM extracted_records WHERE document_id = ?",
            [document_id],
        )?;

        let insert_sql = format!(
            "INSERT INTO extracted_records (document_id, field_name, value, ai_value, confidence,
                 ai_confidence, citation, normalization, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?) RETURNING {RECORD_COLUMNS}"
        );
        let mut saved = Vec::with_capacity(records.len());
        for r in &records {
            let row = tx.query_row(
                &insert_sql,
                params![
                    r.document_id,
                    r.field_name,
                    r.value,
                    r.ai_value,
                    r.confidence,
                    r.ai_confidence,
                    r.citation,
                    r.normalization,
                    r.status.as_str()
                ],
                record_from_row,
            )?;
            saved.push(row);
        }

        tx.execute(
            "UPDATE documents SET status = ? WHERE id = ?",
            params![DocumentStatus::Extracted.as_str(), document_id],
        )?;
        tx.commit()?;

        info!(
            document_id,
            removed,
            inserted = saved.len(),
            "replaced extracted records"
        );
        Ok(saved)
    }

    /// Records of one document in insertion (schema) order.
    pub fn records_for_document(&self, document_id: i64) -> Result<Vec<ExtractedRecord>, StoreError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM extracted_records WHERE document_id = ? ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([document_id], record_from_row)?;
        Ok(rows.collect::<Result<Vec<_>, _>>()?)
    }

    /// All records across every document of a project, in insertion order.
    pub fn records_for_project(&self, project_id: i64) -> Result<Vec<ExtractedRecord>, StoreError> {
        let sql = format!(
            "SELECT {RECORD_COLUMNS} FROM extracted_records
             WHERE document_id IN (SELECT id FROM documents WHERE project_id = ?)
             ORDER BY id"
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map([project_id], record_from_row)?;
        let records = rows.collect::<Result<Vec<_>, _>>()?;
        debug!(project_id, count = records.len(), "loaded project records");
        Ok(records)
    }

    /// Fetch a single record by id.
    pub fn get_record(&self, id: i64) -> Result<ExtractedRecord, StoreError> {
        let sql = format!("SELECT {RECORD_COLUMNS} FROM extracted_records WHERE id = ?");
        self.conn
            .query_row(&sql, [id], record_from_row)
            .optional()?
            .ok_or(StoreError::NotFound { entity: "record", id })
    }

    /// Apply a reviewer action to a record and persist the result.
    pub fn review(&self, id: i64, action: ReviewAction) -> Result<ExtractedRecord, StoreError> {
        let mut record = self.get_record(id)?;
        record.apply(action);
        self.write_review(&record)?;
        info!(record_id = id, status = %record.status, "record reviewed");
        Ok(record)
    }

    /// Set value and status directly, as the `PUT /records/{id}` endpoint does.
    pub fn update_record(
        &self,
        id: i64,
        value: Option<&str>,
        status: RecordStatus,
    ) -> Result<ExtractedRecord, StoreError> {
        let mut record = self.get_record(id)?;
        record.value = value.map(str::to_string);
        record.status = status;
        self.write_review(&record)?;
        info!(record_id = id, %status, "record updated");
        Ok(record)
    }

    fn write_review(&self, record: &ExtractedRecord) -> Result<(), StoreError> {
        self.conn.execute(
            "UPDATE extracted_records SET value = ?, confidence = ?, status = ? WHERE id = ?",
            params![
                record.value,
                record.confidence,
                record.status.as_str(),
                record.id
            ],
        )?;
        Ok(())
    }

    // ── Evaluation ──

    /// Evaluate a project's current records.
    pub fn evaluate_project(&self, project_id: i64) -> Result<EvaluationStats, StoreError> {
        self.get_project(project_id)?;
        let records = self.records_for_project(project_id)?;
        let stats = evaluate(&records);
        info!(
            project_id,
            total = stats.total_fields,
            reviewed = stats.reviewed_fields,
            accuracy = stats.accuracy,
            "evaluated project"
        );
        Ok(stats)
    }

    // ── Escape hatch ──

    /// Execute arbitrary SQL and return Arrow RecordBatches.
    pub fn query_arrow(&self, sql: &str) -> Result<Vec<RecordBatch>, StoreError> {
        let mut stmt = self.conn.prepare(sql)?;
        let batches: Vec<RecordBatch> = stmt.query_arrow([])?.collect();
        Ok(batches)
    }
}

// ── Row mapping ──

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

fn project_from_row(row: &Row<'_>) -> duckdb::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        name: row.get(1)?,
        description: row.get(2)?,
        created_at: row.get(3)?,
    })
}

fn document_from_row(row: &Row<'_>) -> duckdb::Result<Document> {
    let status: String = row.get(5)?;
    Ok(Document {
        id: row.get(0)?,
        project_id: row.get(1)?,
        filename: row.get(2)?,
        content: row.get(3)?,
        file_path: row.get(4)?,
        status: DocumentStatus::parse_lossy(&status),
        created_at: row.get(6)?,
    })
}

fn field_from_row(row: &Row<'_>) -> duckdb::Result<SchemaField> {
    let data_type: String = row.get(4)?;
    Ok(SchemaField {
        id: row.get(0)?,
        project_id: row.get(1)?,
        field_name: row.get(2)?,
        field_description: row.get(3)?,
        data_type: FieldType::parse(&data_type).unwrap_or_default(),
    })
}

fn record_from_row(row: &Row<'_>) -> duckdb::Result<ExtractedRecord> {
    let status: String = row.get(9)?;
    Ok(ExtractedRecord {
        id: row.get(0)?,
        document_id: row.get(1)?,
        field_name: row.get(2)?,
        value: row.get(3)?,
        ai_value: row.get(4)?,
        confidence: row.get(5)?,
        ai_confidence: row.get(6)?,
        citation: row.get(7)?,
        normalization: row.get(8)?,
        status: RecordStatus::parse_lossy(&status),
    })
}
