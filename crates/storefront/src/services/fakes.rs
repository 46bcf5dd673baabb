//! In-memory implementations of the storage and payment seams for unit tests.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Utc;
use tower_sessions::{MemoryStore, Session};

use photostock_core::{
    CheckoutState, CurrencyCode, CustomerId, PhotoId, PhotoSize, Price, UserId,
};

use super::capability::GroupDirectory;
use super::cart::Catalog;
use super::checkout::CheckoutStore;
use super::favourites::FavouriteStore;
use super::fulfillment::{ClaimResult, EntitlementStore};
use super::profile::ProfileStore;
use crate::db::RepositoryError;
use crate::models::{
    CartLine, CheckoutRecord, CorrelationToken, CustomerProfile, Download, FavouritePhoto, Photo,
    ProfileInput,
};
use crate::payments::{PaymentError, PaymentGateway, PaymentSessionRequest, ProviderSession};

pub fn photo(id: i32, caption: &str, price: &str) -> Photo {
    Photo {
        id: PhotoId::new(id),
        caption: caption.to_string(),
        price: Price::new(price.parse().unwrap(), CurrencyCode::USD),
        image_url: format!("https://img.test/{id}.jpg"),
    }
}

pub fn test_session() -> Session {
    Session::new(None, Arc::new(MemoryStore::default()), None)
}

#[derive(Debug, Clone)]
struct StoredDownload {
    customer_id: CustomerId,
    photo_id: PhotoId,
    size: PhotoSize,
    token: String,
}

#[derive(Default)]
struct State {
    photos: BTreeMap<PhotoId, Photo>,
    checkouts: BTreeMap<String, CheckoutRecord>,
    downloads: Vec<StoredDownload>,
    profiles: Vec<CustomerProfile>,
    favourites: Vec<(CustomerId, PhotoId)>,
    groups: HashSet<(UserId, String)>,
}

/// One store standing in for every repository.
#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
    fail_writes: AtomicBool,
    group_lookups: AtomicUsize,
}

impl InMemoryStore {
    pub fn with_photos(photos: impl IntoIterator<Item = Photo>) -> Self {
        let store = Self::default();
        store
            .state
            .lock()
            .unwrap()
            .photos
            .extend(photos.into_iter().map(|p| (p.id, p)));
        store
    }

    pub fn delete_photo(&self, id: PhotoId) {
        self.state.lock().unwrap().photos.remove(&id);
    }

    /// Make every subsequent write fail as if the database went away.
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn checkout_count(&self) -> usize {
        self.state.lock().unwrap().checkouts.len()
    }

    pub fn checkout_states(&self) -> Vec<CheckoutState> {
        self.state
            .lock()
            .unwrap()
            .checkouts
            .values()
            .map(|c| c.state)
            .collect()
    }

    pub fn downloads_for_token(&self, token: &str) -> Vec<(PhotoId, PhotoSize)> {
        self.state
            .lock()
            .unwrap()
            .downloads
            .iter()
            .filter(|d| d.token == token)
            .map(|d| (d.photo_id, d.size))
            .collect()
    }

    pub fn profile_count(&self) -> usize {
        self.state.lock().unwrap().profiles.len()
    }

    pub fn grant(&self, user_id: UserId, group: &str) {
        self.state
            .lock()
            .unwrap()
            .groups
            .insert((user_id, group.to_string()));
    }

    pub fn revoke(&self, user_id: UserId, group: &str) {
        self.state
            .lock()
            .unwrap()
            .groups
            .remove(&(user_id, group.to_string()));
    }

    pub fn group_lookups(&self) -> usize {
        self.group_lookups.load(Ordering::SeqCst)
    }

    fn check_writable(&self) -> Result<(), RepositoryError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(RepositoryError::Database(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

impl Catalog for InMemoryStore {
    async fn find_photo(&self, id: PhotoId) -> Result<Option<Photo>, RepositoryError> {
        Ok(self.state.lock().unwrap().photos.get(&id).cloned())
    }

    async fn find_photos(&self, ids: &[PhotoId]) -> Result<Vec<Photo>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| state.photos.get(id).cloned())
            .collect())
    }
}

impl CheckoutStore for InMemoryStore {
    async fn insert_pending(
        &self,
        token: &CorrelationToken,
        customer_id: CustomerId,
        lines: &[CartLine],
    ) -> Result<(), RepositoryError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        if state.checkouts.contains_key(token.as_str()) {
            return Err(RepositoryError::Conflict("checkout already exists".to_string()));
        }
        state.checkouts.insert(
            token.as_str().to_string(),
            CheckoutRecord {
                token: token.clone(),
                customer_id,
                provider_session_id: None,
                lines: lines.to_vec(),
                state: CheckoutState::Created,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn attach_provider_session(
        &self,
        token: &CorrelationToken,
        provider_session_id: &str,
    ) -> Result<(), RepositoryError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let record = state
            .checkouts
            .get_mut(token.as_str())
            .ok_or(RepositoryError::NotFound)?;
        record.provider_session_id = Some(provider_session_id.to_string());
        Ok(())
    }

    async fn find(&self, token: &str) -> Result<Option<CheckoutRecord>, RepositoryError> {
        Ok(self.state.lock().unwrap().checkouts.get(token).cloned())
    }

    async fn transition(&self, token: &str, to: CheckoutState) -> Result<bool, RepositoryError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        match state.checkouts.get_mut(token) {
            Some(record) if record.state.is_open() => {
                record.state = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

impl EntitlementStore for InMemoryStore {
    async fn claim_and_record(&self, token: &str) -> Result<ClaimResult, RepositoryError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let Some(record) = state.checkouts.get_mut(token) else {
            return Ok(ClaimResult::NotFound);
        };
        if !record.state.is_open() {
            return Ok(ClaimResult::NotOpen(record.state));
        }
        record.state = CheckoutState::Fulfilled;
        let customer_id = record.customer_id;
        let lines = record.lines.clone();

        let mut inserted = 0;
        for line in lines {
            let exists = state
                .downloads
                .iter()
                .any(|d| d.token == token && d.photo_id == line.photo_id);
            if !exists {
                state.downloads.push(StoredDownload {
                    customer_id,
                    photo_id: line.photo_id,
                    size: line.size,
                    token: token.to_string(),
                });
                inserted += 1;
            }
        }
        Ok(ClaimResult::Recorded(inserted))
    }

    async fn downloads(&self, customer_id: CustomerId) -> Result<Vec<Download>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .downloads
            .iter()
            .rev()
            .filter(|d| d.customer_id == customer_id)
            .filter_map(|d| {
                state.photos.get(&d.photo_id).map(|p| Download {
                    photo_id: d.photo_id,
                    caption: p.caption.clone(),
                    image_url: p.image_url.clone(),
                    size: d.size,
                    purchased_at: Utc::now(),
                })
            })
            .collect())
    }
}

impl ProfileStore for InMemoryStore {
    async fn find_by_user(
        &self,
        user_id: UserId,
    ) -> Result<Option<CustomerProfile>, RepositoryError> {
        Ok(self
            .state
            .lock()
            .unwrap()
            .profiles
            .iter()
            .find(|p| p.user_id == user_id)
            .cloned())
    }

    async fn create(
        &self,
        user_id: UserId,
        input: &ProfileInput,
    ) -> Result<CustomerProfile, RepositoryError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        if state.profiles.iter().any(|p| p.user_id == user_id) {
            return Err(RepositoryError::Conflict("customer already exists".to_string()));
        }
        let now = Utc::now();
        let id = i32::try_from(state.profiles.len()).unwrap() + 1;
        let profile = CustomerProfile {
            id: CustomerId::new(id),
            user_id,
            first_name: input.first_name.clone(),
            last_name: input.last_name.clone(),
            email: input.email.clone(),
            phone: input.phone.clone(),
            country: input.country.clone(),
            created_at: now,
            updated_at: now,
        };
        state.profiles.push(profile.clone());
        Ok(profile)
    }

    async fn update(
        &self,
        customer_id: CustomerId,
        input: &ProfileInput,
    ) -> Result<CustomerProfile, RepositoryError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let profile = state
            .profiles
            .iter_mut()
            .find(|p| p.id == customer_id)
            .ok_or(RepositoryError::NotFound)?;
        profile.first_name.clone_from(&input.first_name);
        profile.last_name.clone_from(&input.last_name);
        profile.email = input.email.clone();
        profile.phone.clone_from(&input.phone);
        profile.country.clone_from(&input.country);
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }
}

impl FavouriteStore for InMemoryStore {
    async fn add_favourite(
        &self,
        customer_id: CustomerId,
        photo_id: PhotoId,
    ) -> Result<bool, RepositoryError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        if state.favourites.contains(&(customer_id, photo_id)) {
            return Ok(false);
        }
        state.favourites.push((customer_id, photo_id));
        Ok(true)
    }

    async fn remove_favourite(
        &self,
        customer_id: CustomerId,
        photo_id: PhotoId,
    ) -> Result<bool, RepositoryError> {
        self.check_writable()?;
        let mut state = self.state.lock().unwrap();
        let before = state.favourites.len();
        state.favourites.retain(|pair| *pair != (customer_id, photo_id));
        Ok(state.favourites.len() != before)
    }

    async fn list_favourites(
        &self,
        customer_id: CustomerId,
    ) -> Result<Vec<FavouritePhoto>, RepositoryError> {
        let state = self.state.lock().unwrap();
        Ok(state
            .favourites
            .iter()
            .rev()
            .filter(|(c, _)| *c == customer_id)
            .filter_map(|(_, photo_id)| {
                state.photos.get(photo_id).map(|p| FavouritePhoto {
                    photo_id: p.id,
                    caption: p.caption.clone(),
                    image_url: p.image_url.clone(),
                    favourited_at: Utc::now(),
                })
            })
            .collect())
    }
}

impl GroupDirectory for InMemoryStore {
    async fn is_member(&self, user_id: UserId, group: &str) -> Result<bool, RepositoryError> {
        self.group_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self
            .state
            .lock()
            .unwrap()
            .groups
            .contains(&(user_id, group.to_string())))
    }
}

/// Payment gateway that records requests and hands out fake hosted pages.
#[derive(Default)]
pub struct RecordingGateway {
    requests: Mutex<Vec<PaymentSessionRequest>>,
    fail: bool,
}

impl RecordingGateway {
    pub fn failing() -> Self {
        Self {
            requests: Mutex::default(),
            fail: true,
        }
    }

    pub fn requests(&self) -> Vec<PaymentSessionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl PaymentGateway for RecordingGateway {
    async fn create_session(
        &self,
        request: &PaymentSessionRequest,
    ) -> Result<ProviderSession, PaymentError> {
        if self.fail {
            return Err(PaymentError::Api {
                status: 402,
                message: "card declined".to_string(),
            });
        }
        let mut requests = self.requests.lock().unwrap();
        requests.push(request.clone());
        let id = format!("cs_test_{}", requests.len());
        Ok(ProviderSession {
            url: format!("https://checkout.stripe.test/{id}"),
            id,
        })
    }
}
