use std::path::Path;

use anyhow::{Context as _, Result};

use super::Context;
use super::sync::print_failures;

pub fn export(ctx: &Context, out: Option<&Path>) -> Result<()> {
    let feed = ctx.service.export_feed(ctx.user())?;

    match out {
        Some(path) => {
            std::fs::write(path, &feed)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            eprintln!("Wrote {}", path.display());
        }
        None => print!("{}", feed),
    }
    Ok(())
}

pub fn import(ctx: &Context, file: &Path) -> Result<()> {
    let text = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let report = ctx.service.import_feed(ctx.user(), &text)?;

    println!("{}", report);
    print_failures("Rejected", &report.rejected);
    print_failures("Not saved", &report.store_failures);
    for dup in &report.duplicates {
        println!("  Skipped: events {} share UID {}", dup.event_ids.join(", "), dup.identity);
    }
    Ok(())
}
