use clap::{Parser, Subcommand};
use chairside_core::cdt::{CaseTier, CdtTable};
use chairside_core::config::history_depth_from_env_value;
use chairside_core::constants::{DEFAULT_DATA_DIR, DEFAULT_MODEL, DEFAULT_SEED};
use chairside_core::model::GenerationRecord;
use chairside_core::redaction::RedactionPolicy;
use chairside_core::requests::request_fingerprint;
use chairside_core::store::{AuditStore, FileStore};
use chairside_core::{AuditRecorder, ConfirmationEvaluator, CoreConfig, DocumentType, GenerationId};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "chairside")]
#[command(about = "Inspect the chairside document generation audit trail")]
struct Cli {
    /// Audit data directory (defaults to CHAIRSIDE_DATA_DIR, then ./chairside_data)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// List all generations, oldest first
    List,
    /// Show one generation record
    Show {
        /// Generation id
        id: String,
    },
    /// Show the regeneration history of a generation
    History {
        /// Generation id
        id: String,
    },
    /// Show the confirmation of a generation
    Confirmation {
        /// Generation id
        id: String,
    },
    /// List generations sharing the input fingerprint of a generation
    Related {
        /// Generation id
        id: String,
    },
    /// Print the input fingerprint a JSON request body is recorded under
    Fingerprint {
        /// Document type: treatment_summary or insurance_summary
        document_type: String,
        /// Request body as JSON
        json: String,
    },
    /// Show the CDT code chosen for a treatment case
    Codes {
        /// Case tier: express, mild, moderate or complex
        #[arg(long)]
        tier: String,
        /// Patient age in years
        #[arg(long)]
        age: Option<u8>,
    },
}

fn open(data_dir: Option<PathBuf>) -> Result<(Arc<CoreConfig>, Arc<FileStore>), Box<dyn std::error::Error>> {
    let data_dir = data_dir
        .or_else(|| std::env::var("CHAIRSIDE_DATA_DIR").ok().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from(DEFAULT_DATA_DIR));
    let depth = history_depth_from_env_value(std::env::var("HISTORY_MAX_DEPTH").ok())?;
    let cfg = CoreConfig::new(
        data_dir.clone(),
        RedactionPolicy::StoreFull,
        DEFAULT_SEED,
        DEFAULT_SEED,
        DEFAULT_MODEL.into(),
        depth,
    )?;
    let store = FileStore::open(data_dir)?;
    Ok((Arc::new(cfg), Arc::new(store)))
}

fn summary_line(record: &GenerationRecord) -> String {
    format!(
        "{} {} {:?} seed={} regenerated={} created={}",
        record.id,
        record.document_type,
        record.status,
        record
            .seed
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".into()),
        record.is_regenerated,
        record.created_at.to_rfc3339()
    )
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Some(Commands::List) => {
            let (_, store) = open(cli.data_dir)?;
            let generations = store.list_generations()?;
            if generations.is_empty() {
                println!("No generations found.");
            } else {
                for record in generations {
                    println!("{}", summary_line(&record));
                }
            }
        }
        Some(Commands::Show { id }) => {
            let (_, store) = open(cli.data_dir)?;
            let id = GenerationId::parse(&id)?;
            match store.get_generation(&id)? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => eprintln!("Generation {} not found", id),
            }
        }
        Some(Commands::History { id }) => {
            let (cfg, store) = open(cli.data_dir)?;
            let id = GenerationId::parse(&id)?;
            let history = ConfirmationEvaluator::new(cfg, store).history(&id);
            if history.is_empty() {
                println!("{} has no regeneration history.", id);
            } else {
                for (n, entry) in history.iter().enumerate() {
                    println!("{}. {}", n + 1, entry);
                }
            }
        }
        Some(Commands::Confirmation { id }) => {
            let (cfg, store) = open(cli.data_dir)?;
            let id = GenerationId::parse(&id)?;
            match ConfirmationEvaluator::new(cfg, store).status(&id)? {
                Some(record) => println!("{}", serde_json::to_string_pretty(&record)?),
                None => println!("{} has not been confirmed.", id),
            }
        }
        Some(Commands::Related { id }) => {
            let (cfg, store) = open(cli.data_dir)?;
            let id = GenerationId::parse(&id)?;
            let recorder = AuditRecorder::new(cfg, store);
            let Some(record) = recorder.find_by_id(&id)? else {
                eprintln!("Generation {} not found", id);
                return Ok(());
            };
            match record.input_fingerprint {
                Some(fp) => {
                    println!("Fingerprint: {}", fp);
                    for related in recorder.find_by_fingerprint(&fp)? {
                        println!("{}", summary_line(&related));
                    }
                }
                None => println!("{} has no input fingerprint.", id),
            }
        }
        Some(Commands::Fingerprint {
            document_type,
            json,
        }) => {
            let document_type: DocumentType = document_type.parse()?;
            println!("{}", request_fingerprint(document_type, &json)?);
        }
        Some(Commands::Codes { tier, age }) => {
            let tier: CaseTier = tier.parse()?;
            let selection = CdtTable::embedded()?.select_treatment(Some(tier), age);
            for code in &selection.codes {
                println!("{} {}", code.code, code.description);
            }
            if let Some(notes) = selection.notes {
                println!("Notes: {}", notes);
            }
        }
        None => {
            println!("No command given. Run with --help for usage.");
        }
    }

    Ok(())
}
