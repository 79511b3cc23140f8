mod render;

use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use directories::ProjectDirs;
use rust_decimal::Decimal;
use tracing_subscriber::EnvFilter;

use civil_billing::commands::receipts::{build_receipt_draft, parse_allocation, AllocationArg};
use civil_billing::commands::settings::{get_settings, load_settings, save_settings, SettingsPayload};
use civil_billing::commands::{clients, dashboard, invoices, receipts};
use civil_billing::db::Database;
use civil_billing::models::{LineItem, NewClient, NewInvoice};
use civil_billing::services::remote::HttpRecordService;
use civil_billing::utils::{parse_date, parse_decimal, today};
use civil_billing::{Billing, MirrorStatus};

#[derive(Parser, Debug)]
#[command(name = "civil-billing", version, about = "Clients, invoices and receipts for an engineering practice")]
struct Cli {
    /// SQLite file holding the ledger and settings
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Totals and recent activity
    Dashboard {
        #[arg(long, default_value_t = 5)]
        recent: usize,
    },
    #[command(subcommand)]
    Clients(ClientCommand),
    #[command(subcommand)]
    Invoices(InvoiceCommand),
    #[command(subcommand)]
    Receipts(ReceiptCommand),
    #[command(subcommand)]
    Settings(SettingsCommand),
}

#[derive(Subcommand, Debug)]
enum ClientCommand {
    List,
    /// Client card with its invoices and receipts
    Show { client: String },
    Add {
        #[arg(long)]
        name: String,
        #[arg(long)]
        tax_id: Option<String>,
        #[arg(long)]
        email: Option<String>,
        #[arg(long)]
        phone: Option<String>,
        #[arg(long)]
        address: Option<String>,
    },
    Delete { client: String },
    /// Merge the remote client list into the local one
    Sync,
}

#[derive(Subcommand, Debug)]
enum InvoiceCommand {
    List {
        #[arg(long)]
        open: bool,
    },
    Create {
        /// Client id or name
        #[arg(long)]
        client: String,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "")]
        description: String,
        /// description:quantity:unit_price, repeatable
        #[arg(long = "item", required = true, value_parser = invoices::parse_line_item)]
        items: Vec<LineItem>,
        #[arg(long, default_value = "21", value_parser = parse_decimal)]
        tax_rate: Decimal,
    },
}

#[derive(Subcommand, Debug)]
enum ReceiptCommand {
    List,
    Register {
        /// Client id or name
        #[arg(long)]
        client: String,
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
        #[arg(long, default_value = "Transferencia")]
        method: String,
        /// invoice=amount, where invoice is an id or number; repeatable
        #[arg(long = "apply", required = true, value_parser = parse_allocation)]
        allocations: Vec<AllocationArg>,
        #[arg(long, default_value = "")]
        notes: String,
    },
}

#[derive(Subcommand, Debug)]
enum SettingsCommand {
    Show,
    /// An empty value clears the setting
    Set {
        #[arg(long)]
        api_base: Option<String>,
        #[arg(long)]
        api_token: Option<String>,
    },
}

fn default_db_path() -> Result<PathBuf> {
    match ProjectDirs::from("com", "civil-billing", "civil-billing") {
        Some(dirs) => {
            let dir = dirs.data_dir();
            std::fs::create_dir_all(dir).with_context(|| format!("Create data dir {}", dir.display()))?;
            Ok(dir.join("civil-billing.sqlite"))
        }
        None => Ok(PathBuf::from("civil-billing.sqlite")),
    }
}

fn report_mirror(mirror: &MirrorStatus) {
    match mirror {
        MirrorStatus::Mirrored => {}
        MirrorStatus::Disabled => eprintln!("note: record service not configured, saved locally only"),
        MirrorStatus::Failed(err) => eprintln!("warning: saved locally, but {}", err),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let db_path = match cli.db {
        Some(path) => path,
        None => default_db_path()?,
    };
    let db = Database::new(&db_path).with_context(|| format!("Open database {}", db_path.display()))?;

    match cli.command {
        Command::Settings(command) => run_settings(&db, command)?,
        Command::Dashboard { recent } => {
            let billing = open_billing(db);
            println!("{}", render::dashboard(&dashboard::get_dashboard_stats(&billing, recent)));
        }
        Command::Clients(command) => run_clients(&mut open_billing(db), command).await?,
        Command::Invoices(command) => run_invoices(&mut open_billing(db), command).await?,
        Command::Receipts(command) => run_receipts(&mut open_billing(db), command).await?,
    }
    Ok(())
}

fn open_billing(db: Database) -> Billing<HttpRecordService> {
    let settings = load_settings(&db);
    let remote = HttpRecordService::from_settings(&settings);
    Billing::open(Box::new(db), remote)
}

fn run_settings(db: &Database, command: SettingsCommand) -> Result<()> {
    let settings = match command {
        SettingsCommand::Show => get_settings(db)?,
        SettingsCommand::Set { api_base, api_token } => save_settings(db, SettingsPayload { api_base, api_token })?,
    };
    println!("{}", render::settings(&settings));
    Ok(())
}

fn client_id(billing: &Billing<HttpRecordService>, key: &str) -> Result<String> {
    clients::resolve_client(billing.ledger(), key)
        .map(|client| client.id.clone())
        .ok_or_else(|| anyhow!("No single client matches {:?}", key))
}

async fn run_clients(billing: &mut Billing<HttpRecordService>, command: ClientCommand) -> Result<()> {
    match command {
        ClientCommand::List => println!("{}", render::clients(&clients::get_clients(billing.ledger()))),
        ClientCommand::Show { client } => {
            let detail = clients::get_client_detail(billing.ledger(), &client)
                .ok_or_else(|| anyhow!("No single client matches {:?}", client))?;
            println!("{}", render::client_detail(&detail));
        }
        ClientCommand::Add {
            name,
            tax_id,
            email,
            phone,
            address,
        } => {
            let committed = billing
                .create_client(NewClient {
                    name,
                    tax_id,
                    email,
                    phone,
                    address,
                })
                .await?;
            println!("Client {} created ({})", committed.record.name, committed.record.id);
            report_mirror(&committed.mirror);
        }
        ClientCommand::Delete { client } => {
            let id = client_id(billing, &client)?;
            let removed = billing.delete_client(&id)?;
            println!("Client {} deleted", removed.name);
        }
        ClientCommand::Sync => {
            if !billing.has_remote() {
                return Err(anyhow!("Record service not configured; set it with `settings set --api-base`"));
            }
            let added = billing.sync_clients().await?;
            println!("{} client(s) added from the record service", added);
        }
    }
    Ok(())
}

async fn run_invoices(billing: &mut Billing<HttpRecordService>, command: InvoiceCommand) -> Result<()> {
    match command {
        InvoiceCommand::List { open } => {
            println!("{}", render::invoices(&invoices::get_invoices(billing.ledger(), open)));
        }
        InvoiceCommand::Create {
            client,
            date,
            description,
            items,
            tax_rate,
        } => {
            let client_id = client_id(billing, &client)?;
            let committed = billing
                .create_invoice(NewInvoice {
                    client_id,
                    date: date.unwrap_or_else(today),
                    description,
                    line_items: items,
                    tax_rate,
                })
                .await?;
            let summary = invoices::invoice_summary(billing.ledger(), &committed.record);
            println!("{}", render::invoices(&[summary]));
            report_mirror(&committed.mirror);
        }
    }
    Ok(())
}

async fn run_receipts(billing: &mut Billing<HttpRecordService>, command: ReceiptCommand) -> Result<()> {
    match command {
        ReceiptCommand::List => println!("{}", render::receipts(&receipts::get_receipts(billing.ledger()))),
        ReceiptCommand::Register {
            client,
            date,
            method,
            allocations,
            notes,
        } => {
            let client_id = client_id(billing, &client)?;
            let draft = build_receipt_draft(
                billing.ledger(),
                client_id,
                date.unwrap_or_else(today),
                method,
                allocations,
                notes,
            );
            let committed = billing.register_receipt(draft).await?;
            let summary = receipts::receipt_summary(billing.ledger(), &committed.record);
            println!("{}", render::receipts(&[summary]));
            report_mirror(&committed.mirror);
        }
    }
    Ok(())
}
