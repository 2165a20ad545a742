use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use tabula_client::ApiClient;
use tabula_core::{ExtractedRecord, RecordStatus, ReviewAction, evaluate, parse_results};
use tabula_store::ReviewStore;
use tracing::info;

use crate::cli::{
    DocumentCommand, EvaluateArgs, ExtractCommand, ProjectCommand, RecordsArgs, RemoteCommand,
    ReviewCommand, SchemaCommand, SqlArgs,
};
use crate::display;

pub fn open_store(db: Option<&Path>) -> Result<ReviewStore> {
    match db {
        Some(path) => {
            info!(path = %path.display(), "opening review store");
            ReviewStore::open_persistent(path)
                .with_context(|| format!("failed to open store at {}", path.display()))
        }
        None => {
            info!("opening in-memory review store");
            ReviewStore::open().context("failed to open in-memory store")
        }
    }
}

pub fn project(store: &ReviewStore, cmd: ProjectCommand) -> Result<()> {
    match cmd {
        ProjectCommand::Create { name, description } => {
            let p = store.create_project(&name, description.as_deref())?;
            display::print_project(&p);
        }
        ProjectCommand::List => display::print_projects(&store.list_projects()?),
        ProjectCommand::Show { id } => display::print_project(&store.get_project(id)?),
    }
    Ok(())
}

pub fn schema(store: &ReviewStore, cmd: SchemaCommand) -> Result<()> {
    match cmd {
        SchemaCommand::Add {
            project,
            name,
            description,
            data_type,
        } => {
            let field = store.add_schema_field(project, &name, &description, data_type)?;
            display::print_schema(std::slice::from_ref(&field));
        }
        SchemaCommand::List { project } => {
            display::print_schema(&store.list_schema_fields(project)?)
        }
        SchemaCommand::Remove { project, field_id } => {
            store.delete_schema_field(project, field_id)?;
            println!("removed schema field {field_id}");
        }
    }
    Ok(())
}

pub fn document(store: &ReviewStore, cmd: DocumentCommand) -> Result<()> {
    match cmd {
        DocumentCommand::Ingest { project, path } => {
            let doc = store
                .ingest_text(project, &path)
                .with_context(|| format!("failed to ingest {}", path.display()))?;
            display::print_document(&doc);
        }
        DocumentCommand::List { project } => {
            display::print_documents(&store.list_documents(project)?)
        }
        DocumentCommand::Show { id } => display::print_document(&store.get_document(id)?),
    }
    Ok(())
}

pub fn extract(store: &mut ReviewStore, cmd: ExtractCommand) -> Result<()> {
    match cmd {
        ExtractCommand::Import { document, file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let results = parse_results(&raw)
                .with_context(|| format!("failed to parse {}", file.display()))?;
            let records = store.replace_records(document, results)?;
            info!(document_id = document, count = records.len(), "imported extraction results");
            display::print_records(&records);
        }
    }
    Ok(())
}

pub fn records(store: &ReviewStore, args: RecordsArgs) -> Result<()> {
    let records = match (args.document, args.project) {
        (Some(doc), _) => store.records_for_document(doc)?,
        (None, Some(project)) => store.records_for_project(project)?,
        (None, None) => bail!("either --document or --project is required"),
    };
    display::print_records(&records);
    Ok(())
}

pub fn review(store: &ReviewStore, cmd: ReviewCommand) -> Result<()> {
    let record = match review_request(cmd) {
        ReviewRequest::Set { id, value, status } => {
            store.update_record(id, value.as_deref(), status)?
        }
        ReviewRequest::Action { id, action } => store.review(id, action)?,
    };
    display::print_records(std::slice::from_ref(&record));
    Ok(())
}

pub fn evaluate_cmd(store: Option<&ReviewStore>, args: EvaluateArgs) -> Result<()> {
    let (title, stats) = match (&args.input, args.project, store) {
        (Some(path), _, _) => {
            let records = read_records(path)?;
            (path.display().to_string(), evaluate(&records))
        }
        (None, Some(project), Some(store)) => {
            let p = store.get_project(project)?;
            (p.name, store.evaluate_project(project)?)
        }
        _ => bail!("either --project or --input is required"),
    };
    emit_evaluation(&title, &stats, args.json)
}

pub fn sql(store: &ReviewStore, args: SqlArgs) -> Result<()> {
    let batches = store
        .query_arrow(&args.query)
        .context("query failed")?;
    display::print_batches(&batches)
}

pub async fn remote(client: &ApiClient, cmd: RemoteCommand) -> Result<()> {
    match cmd {
        RemoteCommand::Health => {
            let ok = client
                .health()
                .await
                .with_context(|| format!("backend at {} unreachable", client.base_url()))?;
            if !ok {
                bail!("backend at {} reported unhealthy", client.base_url());
            }
            println!("ok");
        }
        RemoteCommand::Projects => display::print_projects(&client.list_projects().await?),
        RemoteCommand::Files => {
            for name in client.list_files().await? {
                println!("  {name}");
            }
        }
        RemoteCommand::Ingest { project, filename } => {
            display::print_document(&client.ingest_document(project, &filename).await?)
        }
        RemoteCommand::Documents { project } => {
            display::print_documents(&client.list_documents(project).await?)
        }
        RemoteCommand::Document { id } => display::print_document(&client.get_document(id).await?),
        RemoteCommand::Extract { document } => {
            display::print_records(&client.extract_document(document).await?)
        }
        RemoteCommand::Schema { project } => display::print_schema(&client.get_schema(project).await?),
        RemoteCommand::Records { document } => {
            display::print_records(&client.get_records(document).await?)
        }
        RemoteCommand::Evaluate {
            project,
            server,
            json,
        } => {
            let stats = if server {
                client.get_evaluation(project).await?
            } else {
                client.evaluate_remote(project).await?
            };
            emit_evaluation(&format!("project {project}"), &stats, json)?;
        }
        RemoteCommand::Review { document, action } => {
            let updated = match review_request(action) {
                ReviewRequest::Set { id, value, status } => {
                    client.update_record(id, value.as_deref(), status).await?
                }
                ReviewRequest::Action { id, action } => {
                    let records = client.get_records(document).await?;
                    let record = records
                        .iter()
                        .find(|r| r.id == id)
                        .with_context(|| format!("record {id} not found in document {document}"))?;
                    client.review(record, action).await?
                }
            };
            display::print_records(std::slice::from_ref(&updated));
        }
    }
    Ok(())
}

// ── Helpers ──

/// A review command resolved into either a reviewer action or a raw write.
#[derive(Debug, PartialEq)]
enum ReviewRequest {
    Action {
        id: i64,
        action: ReviewAction,
    },
    Set {
        id: i64,
        value: Option<String>,
        status: RecordStatus,
    },
}

fn review_request(cmd: ReviewCommand) -> ReviewRequest {
    match cmd {
        ReviewCommand::Approve { id } => ReviewRequest::Action {
            id,
            action: ReviewAction::Approve,
        },
        ReviewCommand::Reject { id } => ReviewRequest::Action {
            id,
            action: ReviewAction::Reject,
        },
        ReviewCommand::Edit { id, value } => ReviewRequest::Action {
            id,
            action: ReviewAction::Edit(Some(value)),
        },
        ReviewCommand::Set { id, value, status } => ReviewRequest::Set {
            id,
            value,
            status: RecordStatus::from(status),
        },
    }
}

fn read_records(path: &Path) -> Result<Vec<ExtractedRecord>> {
    let raw = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_slice(&raw).with_context(|| format!("failed to parse {}", path.display()))
}

fn emit_evaluation(title: &str, stats: &tabula_core::EvaluationStats, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(stats)?);
    } else {
        display::print_evaluation(title, stats);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn review_request_mapping() {
        assert_eq!(
            review_request(ReviewCommand::Approve { id: 3 }),
            ReviewRequest::Action {
                id: 3,
                action: ReviewAction::Approve
            }
        );
        assert_eq!(
            review_request(ReviewCommand::Edit {
                id: 4,
                value: "Acme".into()
            }),
            ReviewRequest::Action {
                id: 4,
                action: ReviewAction::Edit(Some("Acme".into()))
            }
        );
        assert_eq!(
            review_request(ReviewCommand::Set {
                id: 5,
                value: None,
                status: crate::cli::StatusArg::Rejected
            }),
            ReviewRequest::Set {
                id: 5,
                value: None,
                status: RecordStatus::Rejected
            }
        );
    }

    #[test]
    fn read_records_from_backend_shaped_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[
                {{"id": 1, "document_id": 1, "field_name": "F1", "value": "A", "ai_value": "A", "status": "approved"}},
                {{"id": 2, "document_id": 1, "field_name": "F2", "value": "C", "ai_value": "B", "status": "manual_updated"}},
                {{"id": 3, "document_id": 1, "field_name": "F3", "value": "X", "ai_value": "X", "status": "pending"}},
                {{"id": 4, "document_id": 1, "field_name": "F4", "value": "Y", "ai_value": "Y", "status": "rejected"}}
            ]"#
        )
        .unwrap();
        let records = read_records(file.path()).unwrap();
        let stats = evaluate(&records);
        assert_eq!(stats.total_fields, 4);
        assert_eq!(stats.reviewed_fields, 2);
        assert_eq!(stats.correct_fields, 1);
        assert_eq!(stats.accuracy, 50);
    }

    #[test]
    fn local_review_flow_updates_evaluation() {
        let mut store = ReviewStore::open().unwrap();
        let project = store.create_project("Leases", None).unwrap();
        let doc = store
            .add_document(project.id, "lease.txt", "This lease...", "lease.txt")
            .unwrap();
        let results = parse_results(
            r#"{"results": [{"field_name": "Parties", "value": "Acme", "confidence": 0.8}]}"#,
        )
        .unwrap();
        let records = store.replace_records(doc.id, results).unwrap();
        let parties = records.iter().find(|r| r.field_name == "Parties").unwrap();

        review(&store, ReviewCommand::Approve { id: parties.id }).unwrap();
        let stats = store.evaluate_project(project.id).unwrap();
        assert_eq!(stats.reviewed_fields, 1);
        assert_eq!(stats.accuracy, 100);
    }
}
