//! Terminal rendering for evaluation results, records, and ad-hoc query output.

use std::fmt::Write;

use arrow::record_batch::RecordBatch;
use tabula_core::{Document, EvaluationStats, ExtractedRecord, Project, SchemaField};

const MAX_VALUE_CHARS: usize = 40;

// ── Public API ──

/// Print an evaluation as a card: headline numbers, then the per-field table.
pub fn print_evaluation(title: &str, stats: &EvaluationStats) {
    print!("{}", format_evaluation(title, stats));
}

pub fn print_records(records: &[ExtractedRecord]) {
    print!("{}", format_records(records));
}

pub fn print_projects(projects: &[Project]) {
    if projects.is_empty() {
        println!("(no projects)");
        return;
    }
    for p in projects {
        print!("  {:>4}  {:<30}", p.id, p.name);
        if let Some(desc) = p.description.as_deref()
            && !desc.is_empty()
        {
            print!("  {}", truncate(desc, 50));
        }
        println!();
    }
}

pub fn print_project(project: &Project) {
    println!("=== {} ===", project.name);
    println!("  {:<14} {}", "id", project.id);
    if let Some(desc) = project.description.as_deref() {
        println!("  {:<14} {}", "description", desc);
    }
    println!("  {:<14} {}", "created_at", project.created_at);
}

pub fn print_schema(fields: &[SchemaField]) {
    if fields.is_empty() {
        println!("(no schema fields; default legal fields apply)");
        return;
    }
    for f in fields {
        println!(
            "  {:>4}  {:<26} {:<8} {}",
            f.id,
            f.field_name,
            f.data_type.as_str(),
            truncate(&f.field_description, 50)
        );
    }
}

pub fn print_documents(documents: &[Document]) {
    if documents.is_empty() {
        println!("(no documents)");
        return;
    }
    for d in documents {
        println!("  {:>4}  {:<36} {}", d.id, truncate(&d.filename, 36), d.status);
    }
}

pub fn print_document(doc: &Document) {
    println!("=== {} ===", doc.filename);
    println!("  {:<14} {}", "id", doc.id);
    println!("  {:<14} {}", "project_id", doc.project_id);
    println!("  {:<14} {}", "status", doc.status);
    println!("  {:<14} {}", "file_path", doc.file_path);
    println!("  {:<14} {}", "created_at", doc.created_at);
    println!("  {:<14} {} chars", "content", doc.content.chars().count());
}

/// Print query results using Arrow's table formatter.
pub fn print_batches(batches: &[RecordBatch]) -> anyhow::Result<()> {
    let rows: usize = batches.iter().map(|b| b.num_rows()).sum();
    if rows == 0 {
        println!("(0 rows)");
        return Ok(());
    }
    println!("{}", arrow::util::pretty::pretty_format_batches(batches)?);
    println!("({rows} rows)");
    Ok(())
}

// ── Formatting ──

pub fn format_evaluation(title: &str, stats: &EvaluationStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "=== {title} ===");
    let _ = writeln!(out, "  {:<16} {}", "total_fields", stats.total_fields);
    let _ = writeln!(out, "  {:<16} {}", "reviewed_fields", stats.reviewed_fields);
    let _ = writeln!(out, "  {:<16} {}", "correct_fields", stats.correct_fields);
    let _ = writeln!(out, "  {:<16} {}%", "accuracy", stats.accuracy);

    if stats.field_breakdown.is_empty() {
        return out;
    }
    let _ = writeln!(out);
    let _ = writeln!(out, "Field breakdown");
    let _ = writeln!(
        out,
        "  {:<26} {:>6} {:>9} {:>8} {:>9}",
        "field", "total", "reviewed", "correct", "accuracy"
    );
    for f in &stats.field_breakdown {
        let _ = writeln!(
            out,
            "  {:<26} {:>6} {:>9} {:>8} {:>8}%",
            truncate(&f.field_name, 26),
            f.total,
            f.reviewed,
            f.correct,
            f.accuracy
        );
    }
    out
}

pub fn format_records(records: &[ExtractedRecord]) -> String {
    let mut out = String::new();
    if records.is_empty() {
        let _ = writeln!(out, "(no records)");
        return out;
    }
    for r in records {
        let value = r.value.as_deref().unwrap_or("-");
        let _ = write!(
            out,
            "  {:>5}  {:<26} {:<15} {}",
            r.id,
            truncate(&r.field_name, 26),
            r.status.as_str(),
            truncate(value, MAX_VALUE_CHARS)
        );
        if r.value != r.ai_value {
            let ai = r.ai_value.as_deref().unwrap_or("-");
            let _ = write!(out, "  (ai: {})", truncate(ai, MAX_VALUE_CHARS));
        }
        if let Some(c) = r.confidence {
            let _ = write!(out, "  [{c:.2}]");
        }
        let _ = writeln!(out);
    }
    out
}

/// Shorten to at most `max` characters, marking the cut with `...`.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let keep = max.saturating_sub(3);
    let mut short: String = s.chars().take(keep).collect();
    short.push_str("...");
    short
}
