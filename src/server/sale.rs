//! Sale endpoint - the cashier's page, cart actions and the sales overview.

use super::{
    AppState, ItemParams,
    response::{ACK, not_found},
};
use crate::errors::{Error, Result};
use axum::{
    Router,
    extract::{Query, State},
    http::header,
    response::{Html, IntoResponse, Redirect},
    routing::{any, get, post},
};
use tracing::instrument;

/// Routes of the cashier-facing endpoint.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(view))
        .route("/content", get(content))
        .route("/add", any(add))
        .route("/remove", any(remove))
        .route("/clear", any(clear))
        .route("/submit", any(submit))
        .route("/sales", get(sales))
        .route("/exportSales", post(export_sales))
        .route("/resetSales", post(reset_sales))
        .fallback(not_found)
        .with_state(state)
}

async fn view(State(state): State<AppState>) -> Html<String> {
    Html(state.presenter.sale_page())
}

async fn content(State(state): State<AppState>) -> Result<Html<String>> {
    let cart = state.mailbox.cart().await?;
    Ok(Html(state.presenter.cart_fragment(&cart)))
}

#[instrument(skip(state))]
async fn add(
    State(state): State<AppState>,
    Query(params): Query<ItemParams>,
) -> Result<&'static str> {
    let index = params.id.ok_or(Error::MissingParameter { name: "id" })?;
    let quantity = params.quantity.unwrap_or(1);
    state.mailbox.add_to_cart(index, quantity).await?;
    Ok(ACK)
}

#[instrument(skip(state))]
async fn remove(
    State(state): State<AppState>,
    Query(params): Query<ItemParams>,
) -> Result<&'static str> {
    let index = params.id.ok_or(Error::MissingParameter { name: "id" })?;
    state.mailbox.remove_from_cart(index).await?;
    Ok(ACK)
}

#[instrument(skip(state))]
async fn clear(State(state): State<AppState>) -> Result<&'static str> {
    state.mailbox.clear_cart().await?;
    Ok(ACK)
}

#[instrument(skip(state))]
async fn submit(State(state): State<AppState>) -> Result<&'static str> {
    state.mailbox.submit().await?;
    Ok(ACK)
}

async fn sales(State(state): State<AppState>) -> Result<Html<String>> {
    let report = state.mailbox.sales().await?;
    Ok(Html(state.presenter.sales_page(&report)))
}

#[instrument(skip(state))]
async fn export_sales(State(state): State<AppState>) -> Result<impl IntoResponse> {
    let csv = state.mailbox.export_csv().await?;
    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (header::CONTENT_DISPOSITION, "attachment; filename=sales.csv"),
        ],
        csv,
    ))
}

/// Zeroes the counts and answers with `303 See Other` to the overview; the
/// register restarts right after.
#[instrument(skip(state))]
async fn reset_sales(State(state): State<AppState>) -> Result<Redirect> {
    state.mailbox.reset_sales().await?;
    Ok(Redirect::to("/sales"))
}
