//! The single owner of the register state.
//!
//! Both HTTP endpoints talk to one actor through a [`Mailbox`]. The actor takes
//! commands off its queue one at a time and runs each to completion, including
//! the blocking store commit, before it looks at the next. That ordering is the
//! only thing keeping concurrent requests from the sale and admin endpoints
//! apart; there is no lock around the state.

use crate::{
    core::{
        catalog::Product,
        shop::{CatalogEdit, EditOutcome, Shop},
        snapshot::{CartSnapshot, SalesReport},
    },
    errors::{Error, Result},
    storage::PersistentStore,
};
use std::sync::Arc;
use tokio::{
    sync::{Notify, mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

/// Pending commands allowed before senders wait.
pub const MAILBOX_CAPACITY: usize = 32;

/// Commands accepted by the state owner.
#[derive(Debug)]
pub(crate) enum Command {
    Cart {
        reply: oneshot::Sender<CartSnapshot>,
    },
    AddToCart {
        index: i64,
        quantity: i64,
        reply: oneshot::Sender<Result<u32>>,
    },
    RemoveFromCart {
        index: i64,
        reply: oneshot::Sender<Result<u32>>,
    },
    ClearCart {
        reply: oneshot::Sender<()>,
    },
    Submit {
        reply: oneshot::Sender<Result<u64>>,
    },
    Sales {
        reply: oneshot::Sender<SalesReport>,
    },
    ExportCsv {
        reply: oneshot::Sender<String>,
    },
    /// Terminal: after a successful reset the actor stops and fires the restart hook.
    ResetSales {
        reply: oneshot::Sender<Result<()>>,
    },
    SaveCatalog {
        edit: CatalogEdit,
        reply: oneshot::Sender<Result<EditOutcome>>,
    },
    DeleteProduct {
        index: i64,
        reply: oneshot::Sender<Result<Product>>,
    },
}

/// Called once the actor has stopped for a restart.
pub trait RestartHook: Send + 'static {
    /// Asks the surrounding lifecycle to boot the register again.
    fn restart(&self);
}

/// Restart hook that wakes whoever awaits [`RestartSignal::requested`].
#[derive(Debug, Clone, Default)]
pub struct RestartSignal {
    notify: Arc<Notify>,
}

impl RestartSignal {
    /// A signal nobody has fired yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves once a restart was requested, even if that happened before the call.
    pub async fn requested(&self) {
        self.notify.notified().await;
    }
}

impl RestartHook for RestartSignal {
    fn restart(&self) {
        self.notify.notify_one();
    }
}

/// Cloneable handle for sending commands to the actor.
///
/// Every method fails with [`Error::Unavailable`] once the actor has stopped;
/// otherwise it returns whatever the matching [`Shop`] operation returned.
#[derive(Debug, Clone)]
pub struct Mailbox {
    inner: mpsc::Sender<Command>,
}

impl Mailbox {
    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T> {
        let (tx, rx) = oneshot::channel();
        self.inner
            .send(make(tx))
            .await
            .map_err(|_| Error::Unavailable)?;
        rx.await.map_err(|_| Error::Unavailable)
    }

    /// Catalog and cart snapshot.
    pub async fn cart(&self) -> Result<CartSnapshot> {
        self.request(|reply| Command::Cart { reply }).await
    }

    /// See [`Shop::add_to_cart`].
    pub async fn add_to_cart(&self, index: i64, quantity: i64) -> Result<u32> {
        self.request(|reply| Command::AddToCart {
            index,
            quantity,
            reply,
        })
        .await?
    }

    /// See [`Shop::remove_from_cart`].
    pub async fn remove_from_cart(&self, index: i64) -> Result<u32> {
        self.request(|reply| Command::RemoveFromCart { index, reply })
            .await?
    }

    /// See [`Shop::clear_cart`].
    pub async fn clear_cart(&self) -> Result<()> {
        self.request(|reply| Command::ClearCart { reply }).await
    }

    /// See [`Shop::submit`].
    pub async fn submit(&self) -> Result<u64> {
        self.request(|reply| Command::Submit { reply }).await?
    }

    /// Sales counts snapshot.
    pub async fn sales(&self) -> Result<SalesReport> {
        self.request(|reply| Command::Sales { reply }).await
    }

    /// See [`Shop::export_csv`].
    pub async fn export_csv(&self) -> Result<String> {
        self.request(|reply| Command::ExportCsv { reply }).await
    }

    /// See [`Shop::reset_sales`]. On success the actor stops and the restart
    /// hook fires.
    pub async fn reset_sales(&self) -> Result<()> {
        self.request(|reply| Command::ResetSales { reply }).await?
    }

    /// See [`Shop::apply_edit`].
    pub async fn save_catalog(&self, edit: CatalogEdit) -> Result<EditOutcome> {
        self.request(|reply| Command::SaveCatalog { edit, reply })
            .await?
    }

    /// See [`Shop::delete_product`].
    pub async fn delete_product(&self, index: i64) -> Result<Product> {
        self.request(|reply| Command::DeleteProduct { index, reply })
            .await?
    }
}

/// Starts the actor on a blocking thread. The join handle yields the store
/// back once the actor stops, either after a sales reset or when every
/// mailbox has been dropped.
pub fn spawn<S, H>(shop: Shop<S>, restart: H) -> (Mailbox, JoinHandle<S>)
where
    S: PersistentStore + Send + 'static,
    H: RestartHook,
{
    let (tx, rx) = mpsc::channel(MAILBOX_CAPACITY);
    let handle = tokio::task::spawn_blocking(move || run(shop, rx, &restart));
    (Mailbox { inner: tx }, handle)
}

enum Flow {
    Continue,
    Restart,
}

fn run<S: PersistentStore>(
    mut shop: Shop<S>,
    mut commands: mpsc::Receiver<Command>,
    restart: &impl RestartHook,
) -> S {
    debug!("State owner started");
    while let Some(command) = commands.blocking_recv() {
        if matches!(execute(&mut shop, command), Flow::Restart) {
            // Anything still queued is answered with `Unavailable` when dropped.
            commands.close();
            info!("Sales reset committed, restarting");
            restart.restart();
            break;
        }
    }
    debug!("State owner stopped");
    shop.into_store()
}

// A dropped receiver means the caller went away; the state change stands.
fn execute<S: PersistentStore>(shop: &mut Shop<S>, command: Command) -> Flow {
    match command {
        Command::Cart { reply } => {
            let _ = reply.send(shop.cart_snapshot());
        }
        Command::AddToCart {
            index,
            quantity,
            reply,
        } => {
            let _ = reply.send(shop.add_to_cart(index, quantity));
        }
        Command::RemoveFromCart { index, reply } => {
            let _ = reply.send(shop.remove_from_cart(index));
        }
        Command::ClearCart { reply } => {
            shop.clear_cart();
            let _ = reply.send(());
        }
        Command::Submit { reply } => {
            let _ = reply.send(shop.submit());
        }
        Command::Sales { reply } => {
            let _ = reply.send(shop.sales_report());
        }
        Command::ExportCsv { reply } => {
            let _ = reply.send(shop.export_csv());
        }
        Command::ResetSales { reply } => {
            let result = shop.reset_sales();
            let reset = result.is_ok();
            if let Err(e) = &result {
                warn!("Sales reset failed: {e}");
            }
            let _ = reply.send(result);
            if reset {
                return Flow::Restart;
            }
        }
        Command::SaveCatalog { edit, reply } => {
            let _ = reply.send(shop.apply_edit(edit));
        }
        Command::DeleteProduct { index, reply } => {
            let _ = reply.send(shop.delete_product(index));
        }
    }
    Flow::Continue
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;
    use crate::test_utils::{brezel_and_fanta_drafts, shop_with};
    use std::time::Duration;

    #[tokio::test]
    async fn test_commands_run_in_order() -> Result<()> {
        let shop = shop_with(&brezel_and_fanta_drafts())?;
        let (mailbox, actor) = spawn(shop, RestartSignal::new());

        mailbox.add_to_cart(0, 2).await?;
        mailbox.add_to_cart(1, 1).await?;
        assert_eq!(mailbox.cart().await?.total.cents(), 750);
        assert_eq!(mailbox.submit().await?, 3);

        let sales = mailbox.sales().await?;
        assert_eq!(sales.total_sold(), 3);

        drop(mailbox);
        let store = actor.await.unwrap();
        assert!(store.commits() >= 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_concurrent_adds_are_all_applied() -> Result<()> {
        let shop = shop_with(&brezel_and_fanta_drafts())?;
        let (mailbox, _actor) = spawn(shop, RestartSignal::new());

        let mut tasks = Vec::new();
        for i in 0..40 {
            let mailbox = mailbox.clone();
            tasks.push(tokio::spawn(
                async move { mailbox.add_to_cart(i % 2, 1).await },
            ));
        }
        for task in tasks {
            task.await.unwrap()?;
        }

        let cart = mailbox.cart().await?;
        assert_eq!(cart.lines[0].quantity, 20);
        assert_eq!(cart.lines[1].quantity, 20);
        Ok(())
    }

    #[tokio::test]
    async fn test_errors_are_replied_not_fatal() -> Result<()> {
        let shop = shop_with(&brezel_and_fanta_drafts())?;
        let (mailbox, _actor) = spawn(shop, RestartSignal::new());

        assert!(matches!(
            mailbox.add_to_cart(9, 1).await.unwrap_err(),
            Error::IndexOutOfRange { index: 9, len: 2 }
        ));
        assert_eq!(mailbox.remove_from_cart(0).await?, 0);
        assert_eq!(mailbox.add_to_cart(0, 1).await?, 1);
        Ok(())
    }

    #[tokio::test]
    async fn test_reset_stops_actor_and_requests_restart() -> Result<()> {
        let shop = shop_with(&brezel_and_fanta_drafts())?;
        let restart = RestartSignal::new();
        let (mailbox, actor) = spawn(shop, restart.clone());

        mailbox.add_to_cart(0, 3).await?;
        mailbox.submit().await?;
        mailbox.reset_sales().await?;

        tokio::time::timeout(Duration::from_secs(5), restart.requested())
            .await
            .unwrap();
        assert!(matches!(
            mailbox.cart().await.unwrap_err(),
            Error::Unavailable
        ));

        let store = actor.await.unwrap();
        let (rebooted, _) = Shop::boot(store, &[])?;
        assert_eq!(rebooted.sales_report().total_sold(), 0);
        Ok(())
    }
}
