//! Read-through caches for server-owned collections (cart, wishlist, categories, admin lists).
//!
//! A cache fetches from one fixed resource with whatever token the session currently holds.
//! `refetch` never fails from the caller's point of view: errors are logged and the previous
//! value stays in place. Overlapping refetches are resolved by [`RefetchOrdering`].

use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use futures::future::BoxFuture;
use futures::FutureExt;
use log::{debug, warn};
use parking_lot::Mutex;

use crate::api::ApiClient;
use crate::error::Result;
use crate::models::{CartItem, CartSummary, Category, WishlistItem, WishlistSummary};
use crate::session::SessionStore;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefetchOrdering {
    /// Whichever response arrives last wins, even if it was issued first.
    #[default]
    LastResolved,
    /// Responses older than the newest applied one are dropped.
    LatestIssued,
}

impl FromStr for RefetchOrdering {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "last-resolved" => Ok(RefetchOrdering::LastResolved),
            "latest-issued" => Ok(RefetchOrdering::LatestIssued),
            other => Err(format!("unknown refetch ordering {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheScope {
    /// Fetched with or without a session.
    Public,
    /// Disabled until a token is present.
    User,
    /// Disabled unless the session belongs to an admin.
    Admin,
}

type Fetcher<T> = Box<dyn Fn(ApiClient, Option<String>) -> BoxFuture<'static, Result<T>> + Send + Sync>;

struct CacheState<T> {
    value: Option<T>,
    applied_seq: u64,
    epoch: u64,
    generation: u64,
}

pub struct CollectionCache<T> {
    name: &'static str,
    scope: CacheScope,
    ordering: RefetchOrdering,
    api: ApiClient,
    session: SessionStore,
    fetcher: Fetcher<T>,
    issued: AtomicU64,
    state: Mutex<CacheState<T>>,
}

impl<T: Clone + Send + 'static> CollectionCache<T> {
    pub fn new<F, Fut>(
        name: &'static str,
        scope: CacheScope,
        ordering: RefetchOrdering,
        api: ApiClient,
        session: SessionStore,
        fetch: F,
    ) -> Self
    where
        F: Fn(ApiClient, Option<String>) -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<T>> + Send + 'static,
    {
        CollectionCache {
            name,
            scope,
            ordering,
            api,
            session,
            fetcher: Box::new(move |api, token| fetch(api, token).boxed()),
            issued: AtomicU64::new(0),
            state: Mutex::new(CacheState {
                value: None,
                applied_seq: 0,
                epoch: 0,
                generation: 0,
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn enabled(&self, token: &Option<String>) -> bool {
        match self.scope {
            CacheScope::Public => true,
            CacheScope::User => token.is_some(),
            CacheScope::Admin => token.is_some() && self.session.is_admin(),
        }
    }

    /// Re-issues the fetch and returns once its response has been handled.
    pub async fn refetch(&self) {
        let token = self.session.token_for_request();
        if !self.enabled(&token) {
            debug!("{}: fetch disabled for current session", self.name);
            self.discard();
            return;
        }

        let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
        let epoch = self.state.lock().epoch;
        debug!("{}: fetch #{} issued", self.name, seq);

        match (self.fetcher)(self.api.clone(), token).await {
            Ok(value) => self.apply(seq, epoch, value),
            Err(e) => warn!("{}: refetch #{} failed: {}", self.name, seq, e),
        }
    }

    fn apply(&self, seq: u64, epoch: u64, value: T) {
        let mut state = self.state.lock();
        if state.epoch != epoch {
            debug!("{}: dropping fetch #{} issued before clear", self.name, seq);
            return;
        }
        if self.ordering == RefetchOrdering::LatestIssued && seq < state.applied_seq {
            debug!(
                "{}: dropping fetch #{}, #{} already applied",
                self.name, seq, state.applied_seq
            );
            return;
        }
        state.applied_seq = seq;
        state.value = Some(value);
        state.generation += 1;
    }

    fn discard(&self) {
        if self.scope != CacheScope::Public && self.state.lock().value.is_some() {
            debug!("{}: session ended, dropping cached value", self.name);
            self.clear();
        }
    }

    // The session can end without sign_out (token expiry); its data must not outlive it.
    fn expire_stale(&self) {
        if self.scope != CacheScope::Public && !self.enabled(&self.session.token_for_request()) {
            self.discard();
        }
    }

    /// Forgets the cached value; responses still in flight are discarded when they land.
    pub fn clear(&self) {
        let mut state = self.state.lock();
        state.value = None;
        state.epoch += 1;
        state.generation += 1;
    }

    pub fn snapshot(&self) -> Option<T> {
        self.expire_stale();
        self.state.lock().value.clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(Option<&T>) -> R) -> R {
        self.expire_stale();
        f(self.state.lock().value.as_ref())
    }

    /// Bumped on every change to the cached value.
    pub fn generation(&self) -> u64 {
        self.state.lock().generation
    }
}

pub struct CartCache {
    inner: CollectionCache<CartSummary>,
}

impl CartCache {
    pub fn new(api: ApiClient, session: SessionStore, ordering: RefetchOrdering) -> CartCache {
        CartCache {
            inner: CollectionCache::new(
                "cart",
                CacheScope::User,
                ordering,
                api,
                session,
                |api, token| async move {
                    match token {
                        Some(token) => api.cart(&token).await,
                        None => Ok(CartSummary::default()),
                    }
                },
            ),
        }
    }

    pub async fn refetch(&self) {
        self.inner.refetch().await
    }

    pub fn clear(&self) {
        self.inner.clear()
    }

    pub fn items(&self) -> Vec<CartItem> {
        self.inner
            .with(|cart| cart.map(|c| c.cart_items.clone()).unwrap_or_default())
    }

    pub fn item(&self, product_id: &str) -> Option<CartItem> {
        self.inner.with(|cart| {
            cart.and_then(|c| c.cart_items.iter().find(|i| i.product_id == product_id).cloned())
        })
    }

    /// Server-computed; never summed locally.
    pub fn total_price(&self) -> f64 {
        self.inner.with(|cart| cart.map_or(0.0, |c| c.total_price))
    }

    pub fn total_quantity(&self) -> u32 {
        self.inner.with(|cart| cart.map_or(0, |c| c.total_quantity))
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.item(product_id).is_some()
    }

    pub fn summary(&self) -> CartSummary {
        self.inner.snapshot().unwrap_or_default()
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation()
    }
}

pub struct WishlistCache {
    inner: CollectionCache<WishlistSummary>,
}

impl WishlistCache {
    pub fn new(api: ApiClient, session: SessionStore, ordering: RefetchOrdering) -> WishlistCache {
        WishlistCache {
            inner: CollectionCache::new(
                "wishlist",
                CacheScope::User,
                ordering,
                api,
                session,
                |api, token| async move {
                    match token {
                        Some(token) => api.wishlist(&token).await,
                        None => Ok(WishlistSummary::default()),
                    }
                },
            ),
        }
    }

    pub async fn refetch(&self) {
        self.inner.refetch().await
    }

    pub fn clear(&self) {
        self.inner.clear()
    }

    pub fn items(&self) -> Vec<WishlistItem> {
        self.inner
            .with(|list| list.map(|l| l.wishlist_items.clone()).unwrap_or_default())
    }

    pub fn total_quantity(&self) -> u32 {
        self.inner.with(|list| list.map_or(0, |l| l.total_quantity))
    }

    pub fn contains(&self, product_id: &str) -> bool {
        self.inner.with(|list| {
            list.map_or(false, |l| l.wishlist_items.iter().any(|i| i.product_id == product_id))
        })
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation()
    }
}

pub struct CategoryCache {
    inner: CollectionCache<Vec<Category>>,
}

impl CategoryCache {
    pub fn new(api: ApiClient, session: SessionStore, ordering: RefetchOrdering) -> CategoryCache {
        CategoryCache {
            inner: CollectionCache::new(
                "categories",
                CacheScope::Public,
                ordering,
                api,
                session,
                |api, token| async move { api.categories(token.as_deref()).await },
            ),
        }
    }

    pub async fn refetch(&self) {
        self.inner.refetch().await
    }

    pub fn categories(&self) -> Vec<Category> {
        self.inner.snapshot().unwrap_or_default()
    }

    pub fn find(&self, id: &str) -> Option<Category> {
        self.inner
            .with(|list| list.and_then(|l| l.iter().find(|c| c.id == id).cloned()))
    }

    pub fn generation(&self) -> u64 {
        self.inner.generation()
    }
}
