//! # Apothecary Till Entry Point
//!
//! Command-line front end for the counter.
//!
//! ## Startup Sequence
//! 1. Parse arguments
//! 2. Initialize tracing (stderr)
//! 3. Load configuration, resolve the database path
//! 4. Connect to the database and run migrations
//! 5. Run the command
//!
//! ## Examples
//! ```text
//! till catalog add --name "Paracetamol 500" --batch PCM-2201 --pack "10 tablets" --mrp 25 --stock 3
//! till catalog list --search para
//! till sell --phone 9876543210 --item <ID>:5 --item <ID>:1:package:pct=5
//! till report --date 2026-10-18
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use apothecary_core::invoice::InvoiceState;
use apothecary_core::CatalogEntry;
use apothecary_db::{Database, DbConfig};
use apothecary_till::commands::bill::{add_to_bill, set_customer_phone, BillItemArg};
use apothecary_till::commands::catalog::{
    add_entry, delete_entry, import_legacy_catalog, inventory_alerts, list_catalog,
    search_catalog, update_entry, CatalogEntryInput,
};
use apothecary_till::commands::history::{daily_report, sale_history, sweep_orphans};
use apothecary_till::commands::sale::{apply_recorded_stock, get_invoice, record_bill};
use apothecary_till::{init_tracing, ApiError, BillState, CommitOutcome, TillConfig};
use chrono::{Local, NaiveDate};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;
use tracing::info;

#[derive(Parser)]
#[command(name = "till", about = "Pharmacy counter till", version)]
struct Cli {
    #[arg(long, global = true, help = "Database file (overrides APOTHECARY_DB_PATH)")]
    db: Option<PathBuf>,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Manage the medicine catalog
    #[command(subcommand)]
    Catalog(CatalogCommands),
    /// Show low-stock and near-expiry medicines
    Alerts,
    /// Bill items and commit the sale
    Sell(SellArgs),
    /// List recent sales
    History(HistoryArgs),
    /// Sales for one day
    Report(ReportArgs),
    /// Show the invoice for a sale
    Invoice { sale_id: String },
    /// Delete sale headers left without items
    Sweep,
}

#[derive(Subcommand)]
enum CatalogCommands {
    List {
        #[arg(long, default_value = "")]
        search: String,
        #[arg(long, default_value_t = 100)]
        limit: u32,
    },
    Add(EntryArgs),
    Edit {
        id: String,
        #[command(flatten)]
        fields: EntryArgs,
    },
    Delete {
        id: String,
    },
    /// Import a JSON export from an older catalog
    Import {
        file: PathBuf,
    },
}

/// Form fields; omitted ones stay blank (add) or unchanged (edit).
#[derive(Args)]
struct EntryArgs {
    #[arg(long)]
    name: Option<String>,
    #[arg(long)]
    supplier: Option<String>,
    #[arg(long)]
    batch: Option<String>,
    #[arg(long = "type")]
    drug_type: Option<String>,
    #[arg(long = "pack", help = "Package description, e.g. \"10 tablets\"")]
    package_description: Option<String>,
    #[arg(long, help = "YYYY-MM")]
    expiry: Option<String>,
    #[arg(long)]
    mrp: Option<String>,
    #[arg(long)]
    discount: Option<String>,
    #[arg(long)]
    purchase_rate: Option<String>,
    #[arg(long)]
    purchase_discount: Option<String>,
    #[arg(long)]
    cgst: Option<String>,
    #[arg(long)]
    sgst: Option<String>,
    #[arg(long, help = "Whole packages in stock")]
    stock: Option<String>,
    #[arg(long, help = "Loose units from an opened package")]
    loose: Option<String>,
    #[arg(long)]
    reminder: Option<String>,
}

impl EntryArgs {
    fn apply_to(self, form: &mut CatalogEntryInput) {
        let fields = [
            (self.name, &mut form.product_name),
            (self.supplier, &mut form.supplier_name),
            (self.batch, &mut form.batch_no),
            (self.drug_type, &mut form.drug_type),
            (self.package_description, &mut form.package_description),
            (self.expiry, &mut form.expiry),
            (self.mrp, &mut form.package_mrp),
            (self.discount, &mut form.standard_discount),
            (self.purchase_rate, &mut form.purchase_rate),
            (self.purchase_discount, &mut form.purchase_discount),
            (self.cgst, &mut form.cgst),
            (self.sgst, &mut form.sgst),
            (self.stock, &mut form.stock_packages),
            (self.loose, &mut form.remaining_units),
            (self.reminder, &mut form.reminder_threshold_packages),
        ];
        for (value, slot) in fields {
            if let Some(value) = value {
                *slot = value;
            }
        }
    }
}

#[derive(Args)]
struct SellArgs {
    #[arg(long, help = "Customer phone number")]
    phone: String,
    #[arg(
        long = "item",
        required = true,
        help = "ID:QTY[:unit|:package][:pct=N|:flat=N], repeatable"
    )]
    items: Vec<String>,
}

#[derive(Args)]
struct HistoryArgs {
    #[arg(long, default_value = "", help = "Bill number, customer name or phone")]
    search: String,
    #[arg(long)]
    limit: Option<u32>,
}

#[derive(Args)]
struct ReportArgs {
    #[arg(long, help = "YYYY-MM-DD, defaults to today")]
    date: Option<NaiveDate>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing();

    let mut config = TillConfig::from_env();
    if let Some(path) = cli.db.clone() {
        config.database_path = Some(path);
    }
    let db_path = config.resolve_database_path()?;
    info!(?db_path, "Database path determined");

    let db = Database::new(DbConfig::new(db_path))
        .await
        .context("failed to open the till database")?;

    let result = run(cli, &config, &db).await;
    db.close().await;
    result
}

async fn run(cli: Cli, config: &TillConfig, db: &Database) -> Result<()> {
    let json = cli.json;
    match cli.command {
        Commands::Catalog(command) => handle_catalog_command(db, config, command, json).await,
        Commands::Alerts => {
            let alerts = inventory_alerts(db, Local::now().date_naive()).await?;
            if json {
                return print_json(&alerts);
            }
            println!("Low stock:");
            print_entries(&alerts.low_stock, config);
            println!("\nExpiring within a month:");
            print_entries(&alerts.expiring_soon, config);
            Ok(())
        }
        Commands::Sell(args) => handle_sell(db, config, args, json).await,
        Commands::History(args) => {
            let limit = args.limit.unwrap_or(config.history_limit);
            let sales = sale_history(db, &args.search, limit).await?;
            if json {
                return print_json(&sales);
            }
            for sale in &sales {
                println!(
                    "{:<20} {}  {:<14} {:>12}  {}",
                    sale.bill_number,
                    sale.sale_date.with_timezone(&Local).format("%d-%m-%Y %H:%M"),
                    sale.customer_phone,
                    config.format_currency(sale.grand_total),
                    sale.medicines
                );
            }
            println!("{} sale(s)", sales.len());
            Ok(())
        }
        Commands::Report(args) => {
            let date = args.date.unwrap_or_else(|| Local::now().date_naive());
            let report = daily_report(db, date, &Local).await?;
            if json {
                return print_json(&report);
            }
            println!("{}", report);
            Ok(())
        }
        Commands::Invoice { sale_id } => {
            let state = get_invoice(db, &sale_id, &Local).await?;
            if json {
                return print_json(&state);
            }
            match state {
                InvoiceState::Loaded(invoice) => {
                    print_store_header(config);
                    println!("{}", invoice);
                    Ok(())
                }
                InvoiceState::NotFound | InvoiceState::Loading => {
                    Err(ApiError::not_found("Sale", &sale_id).into())
                }
            }
        }
        Commands::Sweep => {
            let removed = sweep_orphans(db, config).await?;
            if json {
                return print_json(&serde_json::json!({ "removed": removed }));
            }
            println!("Removed {} orphaned sale header(s)", removed);
            Ok(())
        }
    }
}

async fn handle_catalog_command(
    db: &Database,
    config: &TillConfig,
    command: CatalogCommands,
    json: bool,
) -> Result<()> {
    match command {
        CatalogCommands::List { search, limit } => {
            let entries = if search.trim().is_empty() {
                list_catalog(db).await?
            } else {
                search_catalog(db, &search, limit).await?
            };
            if json {
                return print_json(&entries);
            }
            print_entries(&entries, config);
            Ok(())
        }
        CatalogCommands::Add(fields) => {
            let mut form = CatalogEntryInput::default();
            fields.apply_to(&mut form);
            let entry = add_entry(db, &form).await?;
            if json {
                return print_json(&entry);
            }
            println!("Added {} ({})", entry.product_name, entry.id);
            Ok(())
        }
        CatalogCommands::Edit { id, fields } => {
            let existing = db
                .catalog()
                .get_by_id(&id)
                .await?
                .ok_or_else(|| ApiError::not_found("Medicine", &id))?;
            let mut form = CatalogEntryInput::from(&existing);
            fields.apply_to(&mut form);
            let entry = update_entry(db, &id, &form).await?;
            if json {
                return print_json(&entry);
            }
            println!("Updated {} ({})", entry.product_name, entry.id);
            Ok(())
        }
        CatalogCommands::Delete { id } => {
            delete_entry(db, &id).await?;
            println!("Deleted {}", id);
            Ok(())
        }
        CatalogCommands::Import { file } => {
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read {}", file.display()))?;
            let summary = import_legacy_catalog(db, &text).await?;
            if json {
                return print_json(&summary);
            }
            println!("Imported {} record(s)", summary.imported);
            for skipped in &summary.skipped {
                println!("  skipped {}: {}", skipped.product_name, skipped.reason);
            }
            Ok(())
        }
    }
}

async fn handle_sell(db: &Database, config: &TillConfig, args: SellArgs, json: bool) -> Result<()> {
    let bill = BillState::new();
    for raw in &args.items {
        let item: BillItemArg = raw.parse()?;
        add_to_bill(db, &bill, &item.entry_id, item.quantity, item.unit, item.ad_hoc).await?;
    }
    set_customer_phone(&bill, &args.phone)?;

    let recorded = record_bill(db, &bill).await?;
    if !json {
        print_store_header(config);
        let invoice = apothecary_core::invoice::Invoice::from_record(&recorded.to_record(), &Local);
        println!("{}", invoice);
    }

    let outcome = apply_recorded_stock(db, &recorded).await;
    if json {
        return print_json(&serde_json::json!({ "sale": recorded, "outcome": outcome }));
    }
    if let CommitOutcome::PartialSuccess { failures } = &outcome {
        eprintln!("\nWARNING: {}", ApiError::partial_success(failures).message);
    }
    Ok(())
}

fn print_store_header(config: &TillConfig) {
    println!("{}", config.store_name);
    for line in &config.store_address {
        println!("{}", line);
    }
    println!();
}

fn print_entries(entries: &[CatalogEntry], config: &TillConfig) {
    if entries.is_empty() {
        println!("  (none)");
        return;
    }
    for entry in entries {
        println!(
            "{:<36}  {:<24} {:<10} {:<7} {:>10}  {}",
            entry.id,
            entry.product_name,
            entry.batch_no,
            entry.expiry.map(|e| e.to_string()).unwrap_or_else(|| "-".into()),
            config.format_currency(entry.package_mrp),
            entry.stock_display()
        );
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
