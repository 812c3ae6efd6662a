//! Event channel built on crossbeam-channel.
//!
//! Scans and disposal batches run off the interactive thread and push
//! their progress through an [`EventSender`]. The CLI hands the matching
//! [`EventReceiver`] to a listener thread that drives its progress bars.

use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use std::thread::{self, JoinHandle};

use super::Event;

/// Sending half handed to scanners, finders and the deletion engine.
///
/// Every clone feeds the same receiver.
#[derive(Clone)]
pub struct EventSender {
    inner: Sender<Event>,
}

impl EventSender {
    /// Send an event.
    ///
    /// A dropped receiver is not an error: work continues without anyone
    /// listening.
    pub fn send(&self, event: Event) {
        let _ = self.inner.send(event);
    }
}

pub struct EventReceiver {
    inner: Receiver<Event>,
}

impl EventReceiver {
    /// Block until the next event, or `None` once every sender is gone
    pub fn recv(&self) -> Option<Event> {
        self.inner.recv().ok()
    }

    /// Blocking iterator that ends when all senders are dropped
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.iter()
    }

    /// Whatever is queued right now, without blocking
    pub fn drain(&self) -> impl Iterator<Item = Event> + '_ {
        self.inner.try_iter()
    }

    /// Fold every event on a background thread.
    ///
    /// The thread ends, and the handle yields `state`, once the last
    /// sender is dropped. Drop your sender before joining.
    pub fn fold_in_background<T, F>(self, mut state: T, mut on_event: F) -> JoinHandle<T>
    where
        T: Send + 'static,
        F: FnMut(&mut T, Event) + Send + 'static,
    {
        thread::spawn(move || {
            for event in self.inner.iter() {
                on_event(&mut state, event);
            }
            state
        })
    }

    /// [`fold_in_background`](Self::fold_in_background) for listeners
    /// that only react, such as progress bars
    pub fn listen_in_background<F>(self, mut on_event: F) -> JoinHandle<()>
    where
        F: FnMut(Event) + Send + 'static,
    {
        self.fold_in_background((), move |_, event| on_event(event))
    }
}

/// Factory for sender/receiver pairs.
pub struct EventChannel;

impl EventChannel {
    /// Unbounded channel; a scan never waits on a slow listener.
    pub fn new() -> (EventSender, EventReceiver) {
        Self::wrap(unbounded())
    }

    /// Channel that blocks senders once `capacity` events are queued
    pub fn bounded(capacity: usize) -> (EventSender, EventReceiver) {
        Self::wrap(bounded(capacity))
    }

    fn wrap((sender, receiver): (Sender<Event>, Receiver<Event>)) -> (EventSender, EventReceiver) {
        (
            EventSender { inner: sender },
            EventReceiver { inner: receiver },
        )
    }
}

/// A sender whose receiver is already gone, for callers that do not
/// care about progress.
pub fn null_sender() -> EventSender {
    let (sender, _receiver) = EventChannel::new();
    sender
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{DisposeEvent, DisposeProgress, EmptyFolderEvent};
    use std::path::PathBuf;

    #[test]
    fn null_sender_does_not_panic() {
        let sender = null_sender();
        sender.send(Event::Dispose(DisposeEvent::Completed {
            succeeded: 1,
            failed: 0,
        }));
    }

    #[test]
    fn drain_returns_only_queued_events() {
        let (sender, receiver) = EventChannel::bounded(4);

        sender.send(Event::Dispose(DisposeEvent::Cancelled { not_attempted: 2 }));
        sender.send(Event::Dispose(DisposeEvent::Cancelled { not_attempted: 1 }));

        assert_eq!(receiver.drain().count(), 2);
        assert_eq!(receiver.drain().count(), 0);
    }

    #[test]
    fn background_fold_sees_events_from_every_sender_clone() {
        let (sender, receiver) = EventChannel::new();
        let tally = receiver.fold_in_background(Vec::new(), |found: &mut Vec<PathBuf>, event| {
            if let Event::EmptyFolder(EmptyFolderEvent::Found { path }) = event {
                found.push(path);
            }
        });

        let workers: Vec<_> = (0..4)
            .map(|i| {
                let sender = sender.clone();
                thread::spawn(move || {
                    sender.send(Event::EmptyFolder(EmptyFolderEvent::Found {
                        path: PathBuf::from(format!("/empty/{i}")),
                    }));
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }
        drop(sender);

        let mut found = tally.join().unwrap();
        found.sort();
        assert_eq!(
            found,
            (0..4)
                .map(|i| PathBuf::from(format!("/empty/{i}")))
                .collect::<Vec<_>>()
        );
    }

    #[test]
    fn background_listener_ends_when_the_sender_is_dropped() {
        let (sender, receiver) = EventChannel::new();
        let (seen_tx, seen_rx) = crossbeam_channel::unbounded();
        let listener = receiver.listen_in_background(move |event| {
            if let Event::Dispose(DisposeEvent::Progress(p)) = event {
                let _ = seen_tx.send(p.completed);
            }
        });

        for completed in 1..=3 {
            sender.send(Event::Dispose(DisposeEvent::Progress(DisposeProgress {
                completed,
                total: 3,
                current_path: PathBuf::from("/junk"),
            })));
        }
        drop(sender);

        listener.join().unwrap();
        assert_eq!(seen_rx.try_iter().collect::<Vec<_>>(), vec![1, 2, 3]);
    }
}
