//! Human-readable output for the CLI.

use owo_colors::OwoColorize;
use tricycle::{MigrationRecord, Outcome, Plan, Recorded, Registry, RunReport};

/// Print every table of the registry with its columns.
pub fn print_schema(registry: &Registry) {
    println!(
        "Schema {} ({} tables):",
        registry.schema().bold(),
        registry.len()
    );
    println!();
    for table in registry.tables() {
        println!("  {} ({} columns)", table.name.bold(), table.columns.len());
        for (name, col) in &table.columns {
            let mut attrs = Vec::new();
            if col.primary_key {
                attrs.push("PK".to_string());
            }
            if col.auto_increment {
                attrs.push("IDENTITY".to_string());
            }
            if col.not_null && !col.primary_key {
                attrs.push("NOT NULL".to_string());
            }
            if let Some(default) = &col.default {
                attrs.push(format!("DEFAULT {default}"));
            }

            let attrs_str = if attrs.is_empty() {
                String::new()
            } else {
                format!(" [{}]", attrs.join(", "))
            };
            println!("    {}: {}{}", name, col.sql_type, attrs_str.dimmed());

            if let Some(fk) = &col.references {
                let on_delete = fk
                    .on_delete
                    .map(|a| format!(" ON DELETE {}", a.as_str()))
                    .unwrap_or_default();
                println!("      -> {}.{}{}", fk.table, fk.column, on_delete);
            }
        }
        if !table.indexes.is_empty() {
            println!("    indexes: {}", table.indexes.join(", "));
        }
        if let Some(policy) = &table.row_level_security {
            println!("    policy: {}", policy.name);
        }
        println!();
    }
}

/// Print a plan: the change summary, then the SQL.
pub fn print_plan(plan: &Plan) {
    eprintln!("{} {}", "mode:".dimmed(), plan.mode);
    eprint!("{}", plan.delta);
    if !plan.is_empty() {
        eprintln!();
        println!("{}", plan.sql);
    }
}

pub fn print_report(report: &RunReport) {
    match &report.outcome {
        Outcome::AlreadyApplied => {
            eprintln!("{} {} was already applied", "✓".green(), report.name);
        }
        Outcome::UpToDate => {
            eprintln!("{} schema is up to date", "✓".green());
        }
        Outcome::Applied => {
            let changes = report
                .plan
                .as_ref()
                .map(|p| p.delta.change_count())
                .unwrap_or(0);
            eprintln!(
                "{} applied {} ({} changes)",
                "✓".green(),
                report.name.bold(),
                changes
            );
        }
        Outcome::ManualRequired(steps) => {
            eprintln!(
                "{} {} could not be applied automatically",
                "!".yellow().bold(),
                report.name.bold()
            );
            for issue in &report.issues {
                eprintln!("  {}", issue.to_string().dimmed());
            }
            eprintln!();
            eprint!("{steps}");
            eprintln!();
            println!("{}", report.sql());
        }
    }

    if let Some(path) = &report.artifact {
        eprintln!("  saved {}", path);
    }
    match report.recorded {
        Some(Recorded::Inserted) => eprintln!("  recorded in ledger"),
        Some(Recorded::AlreadyPresent) => eprintln!("  ledger already had this migration"),
        None if report.outcome != Outcome::AlreadyApplied => {
            eprintln!("  {}", "not recorded in ledger".yellow())
        }
        None => {}
    }
}

pub fn print_status(records: &[MigrationRecord]) {
    if records.is_empty() {
        println!("No migrations recorded.");
        return;
    }
    println!("Applied migrations ({}):", records.len());
    println!();
    for record in records {
        println!(
            "  {} {}",
            record.applied_at.format("%Y-%m-%d %H:%M:%S UTC").dimmed(),
            record.name
        );
    }
}

/// Mask password in database URL for display
pub fn mask_password(url: &str) -> String {
    // Simple masking: replace password between :// and @
    if let Some(start) = url.find("://") {
        if let Some(at) = url.rfind('@') {
            if at > start + 3 {
                let prefix = &url[..start + 3];
                let suffix = &url[at..];
                if let Some(colon) = url[start + 3..at].find(':') {
                    let user = &url[start + 3..start + 3 + colon];
                    return format!("{}{}:***{}", prefix, user, suffix);
                }
            }
        }
    }
    url.to_string()
}
