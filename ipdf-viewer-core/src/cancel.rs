//! Load generations: every `open` gets a ticket, and opening again makes all
//! older tickets stale. Stale tickets resolve [`LoadTicket::superseded`], which
//! lets in-flight renders abort instead of finishing work nobody will show.

use tokio::sync::watch;

#[derive(Debug)]
pub struct LoadGenerations {
    tx: watch::Sender<u64>,
}

impl Default for LoadGenerations {
    fn default() -> Self {
        Self::new()
    }
}

impl LoadGenerations {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx }
    }

    /// Start a new generation, invalidating every outstanding ticket.
    pub fn advance(&self) -> LoadTicket {
        self.tx.send_modify(|generation| *generation += 1);
        LoadTicket {
            generation: *self.tx.borrow(),
            rx: self.tx.subscribe(),
        }
    }

    /// Invalidate outstanding tickets without issuing a new one.
    pub fn cancel(&self) {
        self.tx.send_modify(|generation| *generation += 1);
    }

    pub fn current(&self) -> u64 {
        *self.tx.borrow()
    }
}

#[derive(Debug)]
pub struct LoadTicket {
    generation: u64,
    rx: watch::Receiver<u64>,
}

impl LoadTicket {
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self) -> bool {
        *self.rx.borrow() == self.generation
    }

    /// Resolves once a newer generation has started.
    pub async fn superseded(&mut self) {
        while self.is_current() {
            if self.rx.changed().await.is_err() {
                // Sender dropped together with the viewer; nothing will ever
                // supersede this ticket.
                std::future::pending::<()>().await;
            }
        }
    }
}
