use anyhow::Result;
use calsync_core::CalSyncError;
use calsync_core::sync::EventFailure;

use super::Context;

pub async fn run(ctx: &Context) -> Result<()> {
    let (oauth, calendar) = ctx.google()?;

    let report = match ctx.service.run_sync(ctx.user(), &calendar, &oauth).await {
        Ok(report) => report,
        Err(CalSyncError::CredentialExpired(provider)) => {
            anyhow::bail!(
                "{} access has expired or was revoked.\n\
                Run `calsync auth-url` and `calsync auth-complete <code>` to reconnect.",
                provider
            );
        }
        Err(e) if e.is_retryable() => {
            anyhow::bail!("{}\nNothing was lost; try again later.", e);
        }
        Err(e) => return Err(e.into()),
    };

    if report.is_noop() && !report.has_failures() {
        println!("Everything up to date");
    } else {
        println!("{}", report);
    }

    print_failures("Not pushed", &report.push_failures);
    print_failures("Not saved", &report.store_failures);
    print_failures("Rejected from remote", &report.rejected);
    for dup in &report.duplicates {
        println!("  Skipped: events {} share remote id {}", dup.event_ids.join(", "), dup.identity);
    }
    if report.deletions_suppressed {
        println!("  Many linked events were missing remotely; local deletions were skipped this run.");
    }

    Ok(())
}

pub fn print_failures(label: &str, failures: &[EventFailure]) {
    for failure in failures {
        println!("  {}: {} ({})", label, failure.id, failure.reason);
    }
}
