use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use tabula_core::{FieldType, RecordStatus};

#[derive(Parser, Debug)]
#[command(
    name = "tabula",
    version,
    about = "Review AI-extracted contract fields and measure extraction accuracy"
)]
pub struct Cli {
    /// DuckDB file for the local review store (in-memory when omitted).
    #[arg(long, global = true, env = "TABULA_DB")]
    pub db: Option<PathBuf>,

    /// Base URL of the review backend.
    #[arg(
        long,
        global = true,
        env = "TABULA_API_URL",
        default_value = "http://localhost:8000"
    )]
    pub api_url: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage review projects.
    #[command(subcommand)]
    Project(ProjectCommand),
    /// Manage a project's extraction schema.
    #[command(subcommand)]
    Schema(SchemaCommand),
    /// Ingest and inspect documents.
    #[command(subcommand)]
    Document(DocumentCommand),
    /// Load extraction results for a document.
    #[command(subcommand)]
    Extract(ExtractCommand),
    /// List extracted records.
    Records(RecordsArgs),
    /// Apply a reviewer decision to a record.
    #[command(subcommand)]
    Review(ReviewCommand),
    /// Compute extraction accuracy.
    Evaluate(EvaluateArgs),
    /// Talk to the review backend over HTTP.
    #[command(subcommand)]
    Remote(RemoteCommand),
    /// Run a SQL query against the local store and print the result table.
    Sql(SqlArgs),
}

#[derive(Subcommand, Debug)]
pub enum ProjectCommand {
    Create {
        name: String,
        #[arg(long)]
        description: Option<String>,
    },
    List,
    Show {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum SchemaCommand {
    Add {
        #[arg(long)]
        project: i64,
        name: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value = "string")]
        data_type: FieldType,
    },
    List {
        #[arg(long)]
        project: i64,
    },
    Remove {
        #[arg(long)]
        project: i64,
        field_id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum DocumentCommand {
    /// Read a plain-text document from disk into a project.
    Ingest {
        #[arg(long)]
        project: i64,
        path: PathBuf,
    },
    List {
        #[arg(long)]
        project: i64,
    },
    Show {
        id: i64,
    },
}

#[derive(Subcommand, Debug)]
pub enum ExtractCommand {
    /// Replace a document's records with results from a JSON file.
    Import {
        #[arg(long)]
        document: i64,
        file: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RecordsArgs {
    #[arg(long, conflicts_with = "project", required_unless_present = "project")]
    pub document: Option<i64>,

    #[arg(long)]
    pub project: Option<i64>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ReviewCommand {
    Approve {
        id: i64,
    },
    Reject {
        id: i64,
    },
    Edit {
        id: i64,
        value: String,
    },
    /// Write value and status directly.
    Set {
        id: i64,
        #[arg(long)]
        value: Option<String>,
        #[arg(long, value_enum)]
        status: StatusArg,
    },
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    #[arg(long, conflicts_with = "input", required_unless_present = "input")]
    pub project: Option<i64>,

    /// JSON file holding an array of extracted records.
    #[arg(long)]
    pub input: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Subcommand, Debug)]
pub enum RemoteCommand {
    Health,
    Projects,
    /// Files available for ingestion on the backend.
    Files,
    Ingest {
        #[arg(long)]
        project: i64,
        filename: String,
    },
    Documents {
        project: i64,
    },
    Document {
        id: i64,
    },
    /// Run extraction on a document and print the new records.
    Extract {
        document: i64,
    },
    Schema {
        project: i64,
    },
    Records {
        document: i64,
    },
    /// Evaluate a remote project locally from its records.
    Evaluate {
        project: i64,
        /// Print the backend's own evaluation instead.
        #[arg(long, default_value_t = false)]
        server: bool,
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    Review {
        #[arg(long)]
        document: i64,
        #[command(subcommand)]
        action: ReviewCommand,
    },
}

#[derive(Args, Debug, Clone)]
pub struct SqlArgs {
    pub query: String,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum StatusArg {
    Pending,
    Approved,
    Rejected,
    ManualUpdated,
}

impl From<StatusArg> for RecordStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Pending => RecordStatus::Pending,
            StatusArg::Approved => RecordStatus::Approved,
            StatusArg::Rejected => RecordStatus::Rejected,
            StatusArg::ManualUpdated => RecordStatus::ManualUpdated,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_review_set_with_status() {
        let cli = Cli::try_parse_from([
            "tabula", "review", "set", "4", "--value", "Acme", "--status", "manual-updated",
        ])
        .unwrap();
        match cli.command {
            Commands::Review(ReviewCommand::Set { id, value, status }) => {
                assert_eq!(id, 4);
                assert_eq!(value.as_deref(), Some("Acme"));
                assert_eq!(RecordStatus::from(status), RecordStatus::ManualUpdated);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn schema_add_parses_field_type() {
        let cli = Cli::try_parse_from([
            "tabula", "schema", "add", "--project", "1", "Liability Cap", "--data-type", "number",
        ])
        .unwrap();
        match cli.command {
            Commands::Schema(SchemaCommand::Add { data_type, .. }) => {
                assert_eq!(data_type, FieldType::Number)
            }
            other => panic!("unexpected command: {other:?}"),
        }
        assert!(
            Cli::try_parse_from([
                "tabula", "schema", "add", "--project", "1", "X", "--data-type", "currency",
            ])
            .is_err()
        );
    }

    #[test]
    fn evaluate_needs_exactly_one_source() {
        assert!(Cli::try_parse_from(["tabula", "evaluate"]).is_err());
        assert!(
            Cli::try_parse_from(["tabula", "evaluate", "--project", "1", "--input", "r.json"])
                .is_err()
        );
        let cli = Cli::try_parse_from(["tabula", "evaluate", "--input", "r.json", "--json"]).unwrap();
        match cli.command {
            Commands::Evaluate(args) => {
                assert!(args.json);
                assert_eq!(args.input, Some(PathBuf::from("r.json")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn api_url_flag_overrides_default() {
        let cli = Cli::try_parse_from(["tabula", "--api-url", "http://backend:9000", "remote", "health"])
            .unwrap();
        assert_eq!(cli.api_url, "http://backend:9000");
        assert!(matches!(cli.command, Commands::Remote(RemoteCommand::Health)));
    }
}
