//! HTTP layer - the sale and admin endpoints and the register lifecycle.
//!
//! Each endpoint listens on its own address with its own route table. Handlers
//! never touch state directly; they forward a command to the state owner in
//! [`actor`] and turn the reply into a response.

/// Single state owner and its command mailbox
pub mod actor;
/// Admin endpoint routes
pub mod admin;
/// Error to HTTP response mapping
pub mod response;
/// Sale endpoint routes
pub mod sale;

use crate::{
    config::AppConfig,
    core::{catalog::ProductDraft, shop::Shop},
    errors::Result,
    presentation::{HtmlPresenter, Presenter},
    storage::{FileStore, layout::STORE_SIZE},
};
use actor::{Mailbox, RestartSignal};
use axum::Router;
use serde::Deserialize;
use std::{io, sync::Arc};
use tokio::{net::TcpListener, sync::watch};
use tracing::{info, instrument};

/// Shared by every handler of both endpoints.
#[derive(Clone)]
pub struct AppState {
    /// Handle to the state owner
    pub mailbox: Mailbox,
    /// Page renderer
    pub presenter: Arc<dyn Presenter>,
}

/// `?id=..&quantity=..` as sent by the pages.
#[derive(Debug, Deserialize)]
pub struct ItemParams {
    /// Catalog slot; required by every route that reads it
    pub id: Option<i64>,
    /// Units to add, 1 when absent
    pub quantity: Option<i64>,
}

/// Why the endpoints stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stop {
    Restart,
    Shutdown,
}

/// Boots the register from the image at `config.store_path` and serves both
/// endpoints until Ctrl-C. A sales reset stops everything and boots again from
/// the store, which also empties the cart.
///
/// # Errors
/// Returns an error if the store cannot be opened or committed, a listener
/// cannot be bound, or an endpoint fails while serving.
#[instrument(skip_all)]
pub async fn run_register(config: &AppConfig, seeds: &[ProductDraft]) -> Result<()> {
    let presenter: Arc<dyn Presenter> = Arc::new(HtmlPresenter);
    let mut store = FileStore::open(&config.store_path, STORE_SIZE)?;

    loop {
        let (shop, report) = Shop::boot(store, seeds)?;
        info!(
            source = ?report.source,
            products = report.products,
            "Register booted"
        );

        let restart = RestartSignal::new();
        let (mailbox, actor) = actor::spawn(shop, restart.clone());
        let state = AppState {
            mailbox,
            presenter: Arc::clone(&presenter),
        };

        let stop = serve(config, state, &restart).await?;
        store = actor.await.map_err(io::Error::from)?;

        match stop {
            Stop::Restart => info!("Restarting register"),
            Stop::Shutdown => {
                info!("Register shut down");
                return Ok(());
            }
        }
    }
}

async fn serve(config: &AppConfig, state: AppState, restart: &RestartSignal) -> Result<Stop> {
    let sale_listener = TcpListener::bind(config.sale_addr).await?;
    let admin_listener = TcpListener::bind(config.admin_addr).await?;
    info!("Sale page listening on {}", config.sale_addr);
    info!("Admin page listening on {}", config.admin_addr);

    let (stop_tx, stop_rx) = watch::channel(false);
    let sale = tokio::spawn(serve_endpoint(
        sale_listener,
        sale::router(state.clone()),
        stop_rx.clone(),
    ));
    let admin = tokio::spawn(serve_endpoint(
        admin_listener,
        admin::router(state),
        stop_rx,
    ));

    let stop = tokio::select! {
        () = restart.requested() => {
            // Let the reset acknowledgement reach the browser first.
            tokio::time::sleep(config.restart_delay).await;
            Stop::Restart
        }
        result = tokio::signal::ctrl_c() => {
            result?;
            Stop::Shutdown
        }
    };

    let _ = stop_tx.send(true);
    sale.await.map_err(io::Error::from)??;
    admin.await.map_err(io::Error::from)??;
    Ok(stop)
}

async fn serve_endpoint(
    listener: TcpListener,
    router: Router,
    mut stop: watch::Receiver<bool>,
) -> io::Result<()> {
    axum::serve(listener, router)
        .with_graceful_shutdown(async move {
            let _ = stop.wait_for(|&stop| stop).await;
        })
        .await
}
