use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::Result;

use crate::output::Output;
use crate::projection::Projection;
use crate::service::CommentService;

/// Renders the guestbook and keeps re-rendering it on every change.
///
/// A background thread refreshes the store every `interval` so writes made
/// by other processes reach the feed too. With `once`, only the current
/// state is rendered.
pub fn run(
    service: &CommentService,
    token: Option<String>,
    interval: Duration,
    once: bool,
    out: &Output,
) -> Result<()> {
    let feed = service.subscribe()?;

    if !once {
        let store = Arc::clone(service.store());
        thread::spawn(move || {
            loop {
                thread::sleep(interval);
                if let Err(err) = store.refresh() {
                    tracing::warn!(error = %format!("{err:#}"), "refresh failed");
                }
            }
        });
    }

    let mut projection = Projection::new(token);
    let mut rendered = Ok(());
    projection.follow(feed, |view| {
        if let Err(err) = out.watch_frame(view) {
            rendered = Err(err);
            return false;
        }
        !once
    });
    rendered
}
