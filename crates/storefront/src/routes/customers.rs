//! Customer area: profile, download history and favourites.
//!
//! Every handler requires the customers-group capability via
//! [`RequireCustomer`].

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

use photostock_core::PhotoId;

use crate::error::Result;
use crate::middleware::RequireCustomer;
use crate::models::{
    CustomerProfile, Download, FavouritePhoto, FieldError, FlashMessage, ProfileForm, flash,
};
use crate::services::favourites::safe_redirect;
use crate::services::profile;
use crate::services::{EntitlementStore, FavouriteStore, ProfileOutcome, ProfileStore, favourites};
use crate::state::AppState;

const PROFILE_PATH: &str = "/customers/profile";
const CREATE_PATH: &str = "/customers/profile/create";

/// Profile overview, or a prompt to create one.
#[derive(Template, WebTemplate)]
#[template(path = "customers/profile.html")]
pub struct ProfileTemplate {
    pub profile: Option<CustomerProfile>,
    pub flash: Vec<FlashMessage>,
}

/// Per-field messages for the profile form.
#[derive(Debug, Default, Clone)]
pub struct ProfileFormErrors {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub country: Option<String>,
}

impl From<Vec<FieldError>> for ProfileFormErrors {
    fn from(errors: Vec<FieldError>) -> Self {
        let mut out = Self::default();
        for error in errors {
            let slot = match error.field {
                "first_name" => &mut out.first_name,
                "last_name" => &mut out.last_name,
                "email" => &mut out.email,
                "phone" => &mut out.phone,
                "country" => &mut out.country,
                _ => continue,
            };
            slot.get_or_insert(error.message);
        }
        out
    }
}

/// Create/update form.
#[derive(Template, WebTemplate)]
#[template(path = "customers/profile_form.html")]
pub struct ProfileFormTemplate {
    pub title: &'static str,
    pub action: &'static str,
    pub form: ProfileForm,
    pub errors: ProfileFormErrors,
    pub flash: Vec<FlashMessage>,
}

#[derive(Template, WebTemplate)]
#[template(path = "customers/downloads.html")]
pub struct DownloadsTemplate {
    pub downloads: Vec<Download>,
    pub flash: Vec<FlashMessage>,
}

#[derive(Template, WebTemplate)]
#[template(path = "customers/favourites.html")]
pub struct FavouritesTemplate {
    pub favourites: Vec<FavouritePhoto>,
    pub flash: Vec<FlashMessage>,
}

/// Favourite toggle form.
#[derive(Debug, Default, Deserialize)]
pub struct FavouriteForm {
    pub redirect_url: Option<String>,
}

fn create_form(
    form: ProfileForm,
    errors: ProfileFormErrors,
    flash: Vec<FlashMessage>,
) -> ProfileFormTemplate {
    ProfileFormTemplate {
        title: "Create your profile",
        action: CREATE_PATH,
        form,
        errors,
        flash,
    }
}

fn update_form(
    form: ProfileForm,
    errors: ProfileFormErrors,
    flash: Vec<FlashMessage>,
) -> ProfileFormTemplate {
    ProfileFormTemplate {
        title: "Update your profile",
        action: "/customers/profile/update",
        form,
        errors,
        flash,
    }
}

/// `GET /customers/profile`
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn view_profile(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    session: Session,
) -> Result<ProfileTemplate> {
    let profile = state.customers().find_by_user(user.id).await?;
    Ok(ProfileTemplate {
        profile,
        flash: flash::take(&session).await,
    })
}

/// `GET /customers/profile/create`
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn create_page(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    session: Session,
) -> Result<Response> {
    if state.customers().find_by_user(user.id).await?.is_some() {
        return Ok(Redirect::to(PROFILE_PATH).into_response());
    }
    Ok(create_form(
        ProfileForm::default(),
        ProfileFormErrors::default(),
        flash::take(&session).await,
    )
    .into_response())
}

/// `POST /customers/profile/create`
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn create_profile(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    session: Session,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    match profile::create(&state.customers(), user.id, &form).await? {
        ProfileOutcome::Saved(_) => {
            flash::success(&session, "Your profile has been created.").await;
            Ok(Redirect::to(PROFILE_PATH).into_response())
        }
        ProfileOutcome::AlreadyExists(_) => Ok(Redirect::to(PROFILE_PATH).into_response()),
        ProfileOutcome::Invalid(errors) => {
            flash::error(&session, "Please correct the errors below.").await;
            Ok(create_form(form, errors.into(), flash::take(&session).await).into_response())
        }
    }
}

/// `GET /customers/profile/update`
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn update_page(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    session: Session,
) -> Result<Response> {
    let Some(existing) = state.customers().find_by_user(user.id).await? else {
        return Ok(Redirect::to(CREATE_PATH).into_response());
    };
    Ok(update_form(
        ProfileForm::from_profile(&existing),
        ProfileFormErrors::default(),
        flash::take(&session).await,
    )
    .into_response())
}

/// `POST /customers/profile/update`
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn update_profile(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    session: Session,
    Form(form): Form<ProfileForm>,
) -> Result<Response> {
    match profile::update(&state.customers(), user.id, &form).await {
        Ok(ProfileOutcome::Saved(_) | ProfileOutcome::AlreadyExists(_)) => {
            flash::success(&session, "Your profile has been updated.").await;
            Ok(Redirect::to(PROFILE_PATH).into_response())
        }
        Ok(ProfileOutcome::Invalid(errors)) => {
            flash::error(&session, "Please correct the errors below.").await;
            Ok(update_form(form, errors.into(), flash::take(&session).await).into_response())
        }
        Err(profile::ProfileError::NoProfile) => {
            flash::error(&session, "Please create your profile first.").await;
            Ok(Redirect::to(CREATE_PATH).into_response())
        }
        Err(e) => Err(e.into()),
    }
}

/// `GET /customers/downloads`
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn downloads(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    session: Session,
) -> Result<DownloadsTemplate> {
    let downloads = match state.customers().find_by_user(user.id).await? {
        Some(profile) => state.checkouts().downloads(profile.id).await?,
        None => Vec::new(),
    };
    Ok(DownloadsTemplate {
        downloads,
        flash: flash::take(&session).await,
    })
}

/// `GET /customers/favourites`
#[instrument(skip(state, session, user), fields(user_id = %user.id))]
pub async fn view_favourites(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    session: Session,
) -> Result<FavouritesTemplate> {
    let favourites = match state.customers().find_by_user(user.id).await? {
        Some(profile) => state.favourites().list_favourites(profile.id).await?,
        None => Vec::new(),
    };
    Ok(FavouritesTemplate {
        favourites,
        flash: flash::take(&session).await,
    })
}

/// `POST /customers/favourites/{photo_id}`
#[instrument(skip(state, session, user, form), fields(user_id = %user.id))]
pub async fn toggle_favourite(
    State(state): State<AppState>,
    RequireCustomer(user): RequireCustomer,
    session: Session,
    Path(photo_id): Path<PhotoId>,
    Form(form): Form<FavouriteForm>,
) -> Result<Response> {
    let Some(profile) = state.customers().find_by_user(user.id).await? else {
        flash::error(&session, "Please create your profile to save favourites.").await;
        return Ok(Redirect::to(CREATE_PATH).into_response());
    };

    let outcome =
        favourites::toggle(&state.photos(), &state.favourites(), profile.id, photo_id).await?;
    flash::success(&session, outcome.message()).await;

    Ok(Redirect::to(safe_redirect(form.redirect_url.as_deref())).into_response())
}
