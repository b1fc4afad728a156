use std::error::Error;
use std::path::Path;
use std::process::exit;

use clap::Parser;
use rusqlite::Connection;
use rust_decimal::Decimal;
use time::{Duration, OffsetDateTime};
use time_tz::timezones::db::etc::UTC;

use budgety::{
    BudgetAmount, CategoryName, MonthKey, Transaction, UserId, create_transaction,
    find_or_create_category, initialize_db, set_default_budget, set_display_name, upsert_override,
};

/// A utility for creating a test database for the JSON API server of budgety.
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// File path to save the SQLite database to.
    #[arg(long, short)]
    output_path: String,
}

/// Create and populate a database for manual testing.
fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let output_path = Path::new(&args.output_path);

    match output_path.extension() {
        None => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        Some(extension) if extension.is_empty() => {
            eprintln!("Output path must include a file extension (e.g., 'my_database.db').");
            exit(1);
        }
        _ => {}
    }

    if output_path.is_file() {
        eprintln!("File already exists at {output_path:#?}!");
        exit(1);
    }

    println!("Creating database at {output_path:#?}");
    let conn = Connection::open(output_path)?;

    initialize_db(&conn)?;

    println!("Naming users...");
    set_display_name(UserId::Owner, "Alex", &conn)?;
    set_display_name(UserId::Partner, "Sam", &conn)?;

    println!("Creating categories and budgets...");
    let this_month = MonthKey::containing(OffsetDateTime::now_utc());
    let mut category_ids = Vec::new();
    for (name, default_budget) in [
        ("Groceries", Decimal::new(800, 0)),
        ("Rent", Decimal::new(2200, 0)),
        ("Eating out", Decimal::new(250, 0)),
        ("Transport", Decimal::new(150, 0)),
    ] {
        let category = find_or_create_category(CategoryName::new(name)?, &conn)?;
        set_default_budget(category.id, Some(BudgetAmount::new(default_budget)?), &conn)?;
        category_ids.push(category.id);
    }
    upsert_override(
        category_ids[2],
        this_month,
        BudgetAmount::new(Decimal::new(400, 0))?,
        &conn,
    )?;

    println!("Creating transactions...");
    for (month, day_count) in [(this_month.previous(), 28), (this_month, 10)] {
        let month_start = month.range(UTC).start;
        for day in 0..day_count {
            let payer = if day % 3 == 0 {
                UserId::Partner
            } else {
                UserId::Owner
            };
            let category_id = category_ids[day as usize % category_ids.len()];
            let amount = Decimal::new(500 + (day * 331) % 9000, 2);

            create_transaction(
                Transaction::build(amount, category_id, payer)
                    .occurred_at(month_start + Duration::days(day) + Duration::hours(12)),
                &conn,
            )?;
        }
    }

    println!("Success!");

    Ok(())
}
