use std::process::ExitCode;

use chrono::Local;

use leadledger::export;
use leadledger::pipeline::LeadBook;
use leadledger::store::SqliteLeadStore;
use leadledger::view::LeadQuery;

fn main() -> ExitCode {
    env_logger::init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().map(String::as_str).unwrap_or("stats");

    let store = SqliteLeadStore::open()?;
    let book = LeadBook::open(Box::new(store))?;
    let today = Local::now().date_naive();

    match command {
        "list" => {
            let query = match args.get(1) {
                Some(term) => LeadQuery::with_search(term.as_str()),
                None => LeadQuery::default(),
            };
            for lead in book.filtered(&query) {
                println!(
                    "{:>6}  {}  {:<14}  {}",
                    lead.id,
                    lead.date.format("%Y-%m-%d"),
                    lead.lead_status.label(),
                    lead.business_name
                );
            }
        }
        "stats" => {
            let stats = book.stats();
            println!("Leads:           {}", stats.total_leads);
            println!("Revenue (LKR):   {:.2}", stats.total_revenue);
            println!("Expenses (LKR):  {:.2}", stats.total_expenses);
            println!("Pending (LKR):   {:.2}", stats.pending_balance);
            println!("Conversion:      {}%", stats.conversion_rate);
            println!();
            for slice in book.pipeline_breakdown() {
                println!("{:<16} {}", slice.status.label(), slice.count);
            }
        }
        "reminders" => {
            let reminders = book.reminders(today);
            if reminders.is_empty() {
                println!("Nothing due.");
            }
            for r in reminders {
                println!(
                    "[{:?}] {} — {:?} due {}",
                    r.priority,
                    r.business_name,
                    r.kind,
                    r.date.format("%Y-%m-%d")
                );
            }
        }
        "export-csv" => {
            print!("{}", export::leads_to_csv(book.leads()));
        }
        "export-json" => {
            println!("{}", export::leads_to_json(book.leads())?);
        }
        other => {
            eprintln!("unknown command: {other}");
            eprintln!("usage: leadledger [list [term] | stats | reminders | export-csv | export-json]");
            return Err("unknown command".into());
        }
    }
    Ok(())
}
