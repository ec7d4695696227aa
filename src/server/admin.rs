//! Admin endpoint - catalog editing.

use super::{
    AppState, ItemParams,
    response::{ACK, not_found},
};
use crate::{
    core::{
        catalog::{ProductDraft, normalize_name},
        money::Money,
        shop::{CatalogEdit, SlotEdit},
    },
    errors::{Error, Result},
    storage::layout::MAX_PRODUCTS,
};
use axum::{
    Form, Router,
    extract::{Query, State},
    response::{Html, Redirect},
    routing::{any, get, post},
};
use std::collections::HashMap;
use tracing::{info, instrument};

/// Routes of the catalog editing endpoint.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(view))
        .route("/saveConfig", post(save))
        .route("/deleteProduct", any(delete))
        .fallback(not_found)
        .with_state(state)
}

async fn view(State(state): State<AppState>) -> Result<Html<String>> {
    let catalog = state.mailbox.cart().await?;
    Ok(Html(state.presenter.admin_page(&catalog)))
}

#[instrument(skip_all)]
async fn save(
    State(state): State<AppState>,
    Form(form): Form<HashMap<String, String>>,
) -> Result<Redirect> {
    let edit = parse_catalog_edit(&form)?;
    let outcome = state.mailbox.save_catalog(edit).await?;
    info!(
        updated = outcome.updated,
        dropped = outcome.append_dropped,
        "Admin save applied"
    );
    Ok(Redirect::to("/"))
}

#[instrument(skip(state))]
async fn delete(
    State(state): State<AppState>,
    Query(params): Query<ItemParams>,
) -> Result<&'static str> {
    let index = params.id.ok_or(Error::MissingParameter { name: "id" })?;
    state.mailbox.delete_product(index).await?;
    Ok(ACK)
}

/// Builds a catalog edit from the admin form.
///
/// Slot `i` is edited when `name_i` is present. `price_i` left blank keeps the
/// current price and a missing `deposit_i` checkbox clears the deposit flag.
/// A non-blank `new_name` adds a product priced by `new_price`. Every field is
/// validated before anything is applied.
///
/// # Errors
/// Returns [`Error::InvalidPrice`] or [`Error::InvalidName`] for the first bad field.
pub fn parse_catalog_edit(form: &HashMap<String, String>) -> Result<CatalogEdit> {
    let mut edit = CatalogEdit::default();

    for index in 0..MAX_PRODUCTS {
        let Some(name) = form.get(&format!("name_{index}")) else {
            continue;
        };
        let price = match form.get(&format!("price_{index}")) {
            Some(raw) if !raw.trim().is_empty() => Some(Money::parse(raw)?),
            _ => None,
        };
        edit.slots.push(SlotEdit {
            index,
            name: normalize_name(name)?,
            price,
            has_deposit: form.contains_key(&format!("deposit_{index}")),
        });
    }

    if let Some(name) = form.get("new_name").filter(|n| !n.trim().is_empty()) {
        let price = Money::parse(form.get("new_price").map_or("", String::as_str))?;
        edit.append = Some(ProductDraft::new(
            name,
            price,
            form.contains_key("new_deposit"),
        )?);
    }

    Ok(edit)
}
