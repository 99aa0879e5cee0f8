use anyhow::Result;
use calsync_core::SyncWindow;
use calsync_core::event::Event;
use calsync_core::store::EventStore;
use chrono::Local;

use super::Context;

pub fn run(ctx: &Context) -> Result<()> {
    let window = SyncWindow::current();
    let events: Vec<Event> = ctx
        .store
        .events_by_owner(ctx.user())?
        .into_iter()
        .filter(|e| window.intersects(e.start, e.end))
        .collect();

    if events.is_empty() {
        println!("No events found");
        return Ok(());
    }

    // Grouped by local day
    let mut current_date: Option<String> = None;
    for event in &events {
        let date_label = event.start.with_timezone(&Local).format("%a %b %-d %Y").to_string();
        if current_date.as_ref() != Some(&date_label) {
            if current_date.is_some() {
                println!();
            }
            println!("{}", date_label);
            current_date = Some(date_label);
        }

        println!("  {} {}{}", format_time(event), event.title, links(event));
    }

    Ok(())
}

fn format_time(event: &Event) -> String {
    if event.all_day {
        format!("{:>7}", "all-day")
    } else {
        format!("{:>7}", event.start.with_timezone(&Local).format("%H:%M"))
    }
}

fn links(event: &Event) -> String {
    let mut tags = Vec::new();
    if event.remote_id.is_some() {
        tags.push("google");
    }
    if event.feed_uid.is_some() {
        tags.push("ical");
    }
    if tags.is_empty() {
        String::new()
    } else {
        format!(" [{}]", tags.join(", "))
    }
}
