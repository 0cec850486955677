use crate::Context;
use crate::organize::error::{ErrorKind, Result, from_storage};
use crate::organize::file::{Moved, Pipeline};
use async_stream::stream;
use drivesort_storage::{BackendHandle, Listing};
use futures::{Stream, StreamExt};
use std::collections::HashSet;
use std::fmt;

/// Consecutive listings without a single new item before giving up.
const MAX_IDLE_ROUNDS: u32 = 3;

/// How far along a run is: moved items against the total first reported for
/// the source folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    pub done: u64,
    pub total: u64,
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Done {} of {}...", self.done, self.total)
    }
}

/// Progress events emitted by [`organize`] as it empties the source folder.
///
/// Events follow a strict ordering:
/// 1. [`Started`](Self::Started), exactly once.
/// 2. Either [`NothingToDo`](Self::NothingToDo) or
///    [`DiscoveryComplete`](Self::DiscoveryComplete) with the total item
///    count, exactly once.
/// 3. [`Organized`](Self::Organized), zero or more times, one per moved item.
/// 4. [`Complete`](Self::Complete), exactly once, with the number of items
///    moved, signalling the stream is finished.
///
/// An error terminates the stream early, in which case [`Complete`](Self::Complete)
/// is never emitted.
#[derive(Debug)]
pub enum OrganizeEvent {
    /// Organizing has begun; emitted exactly once before any other event.
    Started,
    /// The source folder reported no items at all.
    NothingToDo,
    /// The first listing came back; the total count is now known.
    DiscoveryComplete(u64),
    /// An item has been moved into its destination folder.
    Organized { moved: Moved, progress: Progress },
    /// The source folder is empty (or every counted item was moved).
    Complete(u64),
}

/// How a finished run went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The source folder was empty to begin with.
    NothingToDo,
    Completed { moved: u64 },
}

enum State {
    Fetching,
    Processing(Listing),
    Completed,
}

/// Streams [`OrganizeEvent`]s while moving every item in the context's source
/// folder into its dated destination.
///
/// The source folder is listed, the returned batch is organized one item at a
/// time, and the folder is listed again until it comes back empty or as many
/// items were moved as the first listing reported. Listings may be partial;
/// that is what the re-listing is for.
///
/// # Shrinking source
/// The loop relies on the source folder only ever shrinking while it runs:
/// moved items disappear and nothing new arrives. Items that were already
/// moved but show up again (the service's listings can lag behind) are skipped.
/// A listing without a single new item counts as an idle round; the loop backs
/// off according to the retry policy and lists again, failing with
/// [`Stalled`](ErrorKind::Stalled) after three idle rounds in a row.
///
/// # Cancellation
/// Nothing happens until the stream is polled. Dropping it abandons the run
/// at the next suspension point; the item being moved at that moment is
/// either moved or not, never half-moved.
///
/// # Errors
/// The first failure is yielded as the final item; remaining items are left
/// alone. Item failures are [`Item`](ErrorKind::Item) naming the item.
pub fn organize<'a>(backend: &'a BackendHandle, ctx: &'a Context) -> impl Stream<Item = Result<OrganizeEvent>> + 'a {
    // `rustfmt` does not format macros that use braces. Wrap in parentheses!
    stream!({
        yield Ok(OrganizeEvent::Started);
        tracing::info!(backend = backend.name(), source = %ctx.source, "Organizing");

        let pipeline = Pipeline::new(backend, ctx);
        let mut total = None;
        let mut done = 0u64;
        let mut moved_ids = HashSet::new();
        let mut idle_rounds = 0u32;
        let mut state = State::Fetching;

        loop {
            state = match state {
                State::Fetching => {
                    let listing = match backend.list_children(&ctx.source).await {
                        Ok(listing) => listing,
                        Err(e) => {
                            yield Err(from_storage(e, || ErrorKind::Listing(ctx.source.clone())));
                            return;
                        },
                    };
                    tracing::debug!(items = listing.len(), total = listing.total, "Fetched listing");
                    if total.is_none() {
                        if listing.total == 0 {
                            yield Ok(OrganizeEvent::NothingToDo);
                            State::Completed
                        } else {
                            total = Some(listing.total);
                            yield Ok(OrganizeEvent::DiscoveryComplete(listing.total));
                            if listing.is_empty() { State::Completed } else { State::Processing(listing) }
                        }
                    } else if listing.is_empty() {
                        State::Completed
                    } else {
                        State::Processing(listing)
                    }
                },
                State::Processing(listing) => {
                    let total = total.unwrap_or_default();
                    let mut progressed = false;
                    for item in listing {
                        if moved_ids.contains(&item.id) {
                            tracing::debug!(item = %item.name, "Skipping item that was already moved");
                            continue;
                        }
                        match pipeline.run(&item).await {
                            Ok(moved) => {
                                moved_ids.insert(item.id);
                                done += 1;
                                progressed = true;
                                yield Ok(OrganizeEvent::Organized { moved, progress: Progress { done, total } });
                            },
                            Err(e) => {
                                tracing::error!(item = %item.name, "Organizing stopped");
                                yield Err(e);
                                return;
                            },
                        }
                    }
                    if done >= total {
                        State::Completed
                    } else if progressed {
                        idle_rounds = 0;
                        State::Fetching
                    } else {
                        idle_rounds += 1;
                        if idle_rounds >= MAX_IDLE_ROUNDS {
                            yield Err(exn::Exn::from(ErrorKind::Stalled(ctx.source.clone())));
                            return;
                        }
                        let delay = ctx.retry.delay_before(idle_rounds + 1);
                        tracing::warn!(
                            idle_rounds,
                            delay_ms = delay.as_millis() as u64,
                            "Source folder only lists items that were already moved, waiting"
                        );
                        tokio::time::sleep(delay).await;
                        State::Fetching
                    }
                },
                State::Completed => {
                    if let Some(total) = total
                        && done < total
                    {
                        tracing::warn!(
                            moved = done,
                            total,
                            "Source folder listed no more files before the reported total was reached"
                        );
                    }
                    tracing::info!(moved = done, "Organizing complete");
                    yield Ok(OrganizeEvent::Complete(done));
                    return;
                },
            };
        }
    })
}

/// Drives [`organize`] to the end, discarding progress.
pub async fn run(backend: &BackendHandle, ctx: &Context) -> Result<Outcome> {
    let events = organize(backend, ctx);
    futures::pin_mut!(events);
    let mut empty = false;
    let mut moved = 0;
    while let Some(event) = events.next().await {
        match event? {
            OrganizeEvent::NothingToDo => empty = true,
            OrganizeEvent::Complete(count) => moved = count,
            _ => (),
        }
    }
    Ok(if empty { Outcome::NothingToDo } else { Outcome::Completed { moved } })
}
