//! One-shot completion channel for asynchronous calls.

use tokio::sync::oneshot;

use crate::{Outcome, Result};

/// Value delivered on a completion channel.
///
/// `Err` is only delivered for failed calls made with `throw_on_error`.
pub type Delivery = Result<Outcome>;

/// Create a completion channel.
#[must_use]
pub fn completion() -> (Completion, CompletionReceiver) {
    let (tx, rx) = oneshot::channel();
    (Completion { tx }, CompletionReceiver { rx: Some(rx) })
}

/// Sending half, consumed by the dispatcher.
#[derive(Debug)]
pub struct Completion {
    tx: oneshot::Sender<Delivery>,
}

impl Completion {
    /// Deliver the result of the call. Returns `false` if the receiver is gone.
    pub fn deliver(self, delivery: Delivery) -> bool {
        self.tx.send(delivery).is_ok()
    }

    /// Returns `true` if the receiver has been dropped.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Receiving half, held by the caller.
///
/// Yields at most one value. Every later receive, and a receive after the
/// sending half was dropped without delivering, returns `None`.
#[derive(Debug)]
pub struct CompletionReceiver {
    rx: Option<oneshot::Receiver<Delivery>>,
}

impl CompletionReceiver {
    /// Wait for the result.
    pub async fn recv(&mut self) -> Option<Delivery> {
        let rx = self.rx.take()?;
        rx.await.ok()
    }

    /// Block the current thread until the result arrives.
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context.
    pub fn blocking_recv(&mut self) -> Option<Delivery> {
        let rx = self.rx.take()?;
        rx.blocking_recv().ok()
    }

    /// Returns `true` once a receive has completed.
    #[must_use]
    pub const fn is_closed(&self) -> bool {
        self.rx.is_none()
    }
}

#[cfg(test)]
mod tests {
    use assert2::{check, let_assert};

    use super::*;
    use crate::{Error, Failure};

    #[tokio::test]
    async fn yields_exactly_one_value() {
        let (completion, mut receiver) = completion();
        check!(!receiver.is_closed());

        check!(completion.deliver(Ok(Outcome::Failure(Failure::Transport(Error::Timeout)))));

        let_assert!(Some(Ok(Outcome::Failure(_))) = receiver.recv().await);
        check!(receiver.is_closed());
        check!(receiver.recv().await.is_none());
    }

    #[tokio::test]
    async fn dropped_sender_closes_without_value() {
        let (completion, mut receiver) = completion();
        drop(completion);

        check!(receiver.recv().await.is_none());
        check!(receiver.is_closed());
    }

    #[test]
    fn dropped_receiver_is_reported() {
        let (completion, receiver) = completion();
        drop(receiver);

        check!(completion.is_closed());
        check!(!completion.deliver(Err(Error::MissingToken)));
    }

    #[test]
    fn blocking_receive_from_another_thread() {
        let (completion, mut receiver) = completion();
        let sender = std::thread::spawn(move || completion.deliver(Err(Error::Timeout)));

        let_assert!(Some(Err(Error::Timeout)) = receiver.blocking_recv());
        check!(sender.join().expect("sender thread"));
        check!(receiver.blocking_recv().is_none());
    }
}
