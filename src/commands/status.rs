use anyhow::Result;

use super::Context;

pub fn run(ctx: &Context) -> Result<()> {
    for status in ctx.service.sync_status(ctx.user())? {
        let last = status
            .last_synced_at
            .map(|t| t.format("%Y-%m-%d %H:%M UTC").to_string())
            .unwrap_or_else(|| "never".to_string());

        if status.connected {
            println!("{:<8} {:<10} last sync: {}", status.provider, status.state, last);
        } else {
            println!("{:<8} not connected", status.provider);
        }
    }
    Ok(())
}
