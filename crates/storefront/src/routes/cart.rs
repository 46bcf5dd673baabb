//! Cart route handlers.
//!
//! The cart lives in the session, so every handler here works for anonymous
//! visitors too. Mutations redirect back to the cart page with a flash message.

use askama::Template;
use askama_web::WebTemplate;
use axum::{
    Form,
    extract::{Path, State},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use tower_sessions::Session;
use tracing::instrument;

use photostock_core::{PhotoId, PhotoSize};

use crate::error::{AppError, Result};
use crate::models::{FlashMessage, flash};
use crate::services::{CartView, cart};
use crate::state::AppState;

/// Cart line display data for templates.
#[derive(Clone)]
pub struct CartLineView {
    pub photo_id: PhotoId,
    pub caption: String,
    pub image_url: String,
    pub price: String,
    pub size: PhotoSize,
}

/// Size choice offered next to each line.
#[derive(Clone)]
pub struct SizeOption {
    pub code: &'static str,
    pub label: &'static str,
}

fn size_options() -> Vec<SizeOption> {
    PhotoSize::ALL
        .iter()
        .map(|size| SizeOption {
            code: size.code(),
            label: size.label(),
        })
        .collect()
}

/// Cart page template.
#[derive(Template, WebTemplate)]
#[template(path = "cart/view.html")]
pub struct CartViewTemplate {
    pub lines: Vec<CartLineView>,
    pub subtotal: String,
    pub item_count: usize,
    pub sizes: Vec<SizeOption>,
    pub flash: Vec<FlashMessage>,
}

impl CartViewTemplate {
    fn new(view: CartView, flash: Vec<FlashMessage>) -> Self {
        Self {
            item_count: view.item_count(),
            subtotal: view.subtotal.to_string(),
            lines: view
                .lines
                .into_iter()
                .map(|line| CartLineView {
                    photo_id: line.photo.id,
                    price: line.photo.price.to_string(),
                    caption: line.photo.caption,
                    image_url: line.photo.image_url,
                    size: line.size,
                })
                .collect(),
            sizes: size_options(),
            flash,
        }
    }
}

/// Size form field; blank means the default size.
#[derive(Debug, Default, Deserialize)]
pub struct SizeForm {
    #[serde(default)]
    pub size: String,
}

impl SizeForm {
    fn parse(&self) -> Result<PhotoSize> {
        if self.size.trim().is_empty() {
            return Ok(PhotoSize::default());
        }
        self.size.parse().map_err(AppError::BadRequest)
    }
}

/// Display cart page.
#[instrument(skip(state, session))]
pub async fn show(State(state): State<AppState>, session: Session) -> Result<CartViewTemplate> {
    let view = cart::view(&state.photos(), &session, state.config().stripe.currency).await?;
    Ok(CartViewTemplate::new(view, flash::take(&session).await))
}

/// Add a photo to the cart, or change its size if already present.
#[instrument(skip(state, session))]
pub async fn add(
    State(state): State<AppState>,
    session: Session,
    Path(photo_id): Path<PhotoId>,
    Form(form): Form<SizeForm>,
) -> Result<Response> {
    let size = form.parse()?;
    let photo = cart::add(&state.photos(), &session, photo_id, size).await?;

    flash::success(
        &session,
        format!("\"{}\" ({}) is in your cart.", photo.caption, size.label()),
    )
    .await;
    Ok(Redirect::to("/cart").into_response())
}

/// Remove a photo from the cart. Absent photos are ignored.
#[instrument(skip(session))]
pub async fn remove(session: Session, Path(photo_id): Path<PhotoId>) -> Result<Response> {
    if cart::remove(&session, photo_id).await? {
        flash::success(&session, "Removed from your cart.").await;
    }
    Ok(Redirect::to("/cart").into_response())
}

/// Change the size of a photo already in the cart.
#[instrument(skip(session))]
pub async fn update_size(
    session: Session,
    Path(photo_id): Path<PhotoId>,
    Form(form): Form<SizeForm>,
) -> Result<Response> {
    let size = form.parse()?;
    if cart::update_size(&session, photo_id, size).await? {
        flash::success(&session, format!("Size changed to {}.", size.label())).await;
    }
    Ok(Redirect::to("/cart").into_response())
}

/// Cart count for the header badge, as plain text.
#[instrument(skip(session))]
pub async fn count(session: Session) -> Result<String> {
    Ok(cart::count(&session).await?.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn blank_size_defaults_to_medium() {
        assert_eq!(SizeForm::default().parse().unwrap(), PhotoSize::Medium);
    }

    #[test]
    fn size_codes_parse_and_garbage_is_rejected() {
        let form = SizeForm {
            size: "xl".to_string(),
        };
        assert_eq!(form.parse().unwrap(), PhotoSize::ExtraLarge);

        let form = SizeForm {
            size: "huge".to_string(),
        };
        assert!(matches!(form.parse(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn every_size_is_offered() {
        let codes: Vec<_> = size_options().iter().map(|o| o.code).collect();
        assert_eq!(codes, vec!["S", "M", "L", "XL"]);
    }
}
