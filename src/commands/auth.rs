use anyhow::Result;
use calsync_core::Provider;

use super::Context;

pub fn url(ctx: &Context, state: Option<&str>) -> Result<()> {
    let (oauth, _) = ctx.google()?;
    let url = ctx.service.initiate_auth(&oauth, state)?;

    println!("Open this URL in your browser to connect Google Calendar:\n");
    println!("{}", url);
    println!("\nThen run `calsync auth-complete <code>` with the code from the redirect.");
    Ok(())
}

pub async fn complete(ctx: &Context, code: &str) -> Result<()> {
    let (oauth, _) = ctx.google()?;
    let credential = ctx.service.complete_auth(ctx.user(), &oauth, code).await?;

    println!("Connected {} for {}", credential.provider, credential.user);
    if let Some(expires_at) = credential.expires_at {
        println!("  access token valid until {}", expires_at.format("%Y-%m-%d %H:%M UTC"));
    }
    println!("\nRun `calsync sync` to sync your calendar.");
    Ok(())
}

pub fn disconnect(ctx: &Context, provider: &str) -> Result<()> {
    let provider: Provider = provider.parse()?;
    ctx.service.disconnect(ctx.user(), provider)?;
    println!("Disconnected {}", provider);
    Ok(())
}
