//! # Seed Data Generator
//!
//! Populates the database with medicines for development.
//!
//! ## Usage
//! ```bash
//! # Generate 200 medicines (default)
//! cargo run -p apothecary-db --bin seed
//!
//! # Generate custom amount
//! cargo run -p apothecary-db --bin seed -- --count 1000
//!
//! # Specify database path
//! cargo run -p apothecary-db --bin seed -- --db ./data/apothecary.db
//! ```
//!
//! Each medicine gets a batch `{FORM}-{INDEX}`, a package description
//! matching its dosage form, an expiry 1-36 months out, GST at one of the
//! usual slabs split evenly into CGST and SGST, and 0-40 packages of stock.

use std::env;

use apothecary_core::{CatalogEntry, DrugType, ExpiryMonth, Money, Percent};
use apothecary_db::{Database, DbConfig};
use chrono::{Datelike, Utc};
use uuid::Uuid;

/// Medicine names per dosage form.
const MEDICINES: &[(DrugType, &[&str])] = &[
    (
        DrugType::Tablet,
        &[
            "Paracetamol 500",
            "Crocin Advance",
            "Dolo 650",
            "Azithral 500",
            "Cetirizine 10",
            "Pantoprazole 40",
            "Metformin 500",
            "Amlodipine 5",
            "Atorvastatin 10",
            "Montelukast 10",
        ],
    ),
    (
        DrugType::Capsule,
        &[
            "Amoxicillin 500",
            "Omeprazole 20",
            "Becosules",
            "Doxycycline 100",
            "Evion 400",
        ],
    ),
    (
        DrugType::Syrup,
        &["Benadryl", "Ascoril LS", "Grilinctus", "Calpol Suspension"],
    ),
    (DrugType::Tonic, &["Zincovit", "Liv 52", "Cyproheptadine Tonic"]),
    (
        DrugType::Ointment,
        &["Betnovate C", "Soframycin", "Volini Gel", "Candid B"],
    ),
];

/// GST slabs in basis points.
const GST_SLABS: &[u32] = &[0, 500, 1200, 1800];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut count: usize = 200;
    let mut db_path = String::from("./apothecary_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--count" | "-c" => {
                if i + 1 < args.len() {
                    count = args[i + 1].parse().unwrap_or(200);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Apothecary Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -c, --count <N>    Number of medicines to generate (default: 200)");
                println!("  -d, --db <PATH>    Database file path (default: ./apothecary_dev.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Apothecary Seed Data Generator");
    println!("==============================");
    println!("Database:  {}", db_path);
    println!("Medicines: {}", count);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.catalog().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} medicines", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    println!();
    println!("Generating medicines...");

    let names: Vec<(DrugType, &str)> = MEDICINES
        .iter()
        .flat_map(|(form, names)| names.iter().map(move |n| (*form, *n)))
        .collect();

    let start = std::time::Instant::now();
    let mut generated = 0;

    for seed in 0..count {
        let (form, name) = names[seed % names.len()];
        let entry = generate_medicine(form, name, seed);

        if let Err(e) = db.catalog().insert(&entry).await {
            eprintln!("Failed to insert {} ({}): {}", entry.product_name, entry.batch_no, e);
            continue;
        }

        generated += 1;
        if generated % 50 == 0 {
            println!("  Generated {} medicines...", generated);
        }
    }

    let elapsed = start.elapsed();
    println!();
    println!("✓ Generated {} medicines in {:?}", generated, elapsed);

    let found = db.catalog().search("para", 10).await?;
    println!("  Search 'para': {} results", found.len());

    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Builds one medicine with plausible values derived from `seed`.
fn generate_medicine(form: DrugType, name: &str, seed: usize) -> CatalogEntry {
    let now = Utc::now();

    let (description, units) = match form {
        DrugType::Tablet => ("10 tablets", 10),
        DrugType::Capsule => ("15 capsules", 15),
        DrugType::Syrup => ("1 bottle", 1),
        DrugType::Tonic => ("1 bottle", 1),
        DrugType::Ointment => ("1 tube", 1),
        DrugType::Other => ("1 pack", 1),
    };

    // ₹15.00 - ₹249.50 per package
    let package_mrp = Money::from_paise(1_500 + ((seed * 1_373) % 23_450) as i64);
    let purchase_rate = Money::from_paise(package_mrp.paise() * (65 + (seed % 15) as i64) / 100);

    let gst = GST_SLABS[seed % GST_SLABS.len()];
    let half = Percent::from_bps(gst / 2);

    let months_out = 1 + (seed % 36) as u32;
    let total_months = now.year() * 12 + now.month0() as i32 + months_out as i32;
    let expiry = ExpiryMonth::new(total_months / 12, (total_months % 12) as u32 + 1).ok();

    let stock_packages = (seed % 41) as i64;
    let remaining_units = if units > 1 { (seed % units) as i64 } else { 0 };

    CatalogEntry {
        id: Uuid::new_v4().to_string(),
        product_name: name.to_string(),
        supplier_name: "City Pharma Distributors".to_string(),
        batch_no: format!("{}-{:04}", form.as_str()[..3].to_uppercase(), seed),
        drug_type: form,
        package_description: description.to_string(),
        expiry,
        package_mrp,
        standard_discount: (seed % 3 == 0).then(|| Percent::from_whole(5)),
        purchase_rate,
        purchase_discount: None,
        cgst: half,
        sgst: half,
        stock_packages,
        remaining_units,
        reminder_threshold_packages: apothecary_core::DEFAULT_REMINDER_PACKAGES,
        created_at: now,
        updated_at: now,
    }
}
