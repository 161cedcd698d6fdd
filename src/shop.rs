//! Customer-facing flows: sign in and out, browsing, cart, wishlist, reviews, profile.
//!
//! [`Storefront`] is the root every view is built from. It owns the API client, the session
//! and the shared caches, and hands out clones of them; nothing is looked up globally.

use std::collections::HashMap;
use std::sync::Arc;

use log::{debug, info};
use parking_lot::Mutex;

use crate::api::ApiClient;
use crate::cache::{CartCache, CategoryCache, RefetchOrdering, WishlistCache};
use crate::config::Config;
use crate::error::{ApiError, Result, FALLBACK_MESSAGE};
use crate::guard::post_login_target;
use crate::models::{
    CartItem, CartLine, ChangePasswordForm, Comment, NewComment, Product, ReviewDraft,
    ReviewEligibility, SignInForm, SignUpForm, User, WishlistItem,
};
use crate::notify::Notifications;
use crate::rows::RowEditor;
use crate::session::{decode_expiry, SessionStore};
use crate::storage::KeyValueStore;
use crate::validation::{
    validate_cart_quantity, validate_change_password, validate_contact_message,
    validate_display_name, validate_review, validate_sign_in, validate_sign_up,
};

pub const NOT_PURCHASED_MESSAGE: &str = "You need to buy this book first to comment.";
pub const ALREADY_REVIEWED_MESSAGE: &str = "You have already reviewed this book.";

/// Whether the review box for a book may be opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewGate {
    /// Anonymous visitors and admins never review.
    NotAllowed,
    NotPurchased,
    AlreadyReviewed,
    Open,
}

#[derive(Clone)]
pub struct Storefront {
    api: ApiClient,
    session: SessionStore,
    cart: Arc<CartCache>,
    wishlist: Arc<WishlistCache>,
    categories: Arc<CategoryCache>,
    notifications: Notifications,
    reviews: Arc<Mutex<HashMap<String, ReviewEligibility>>>,
    ordering: RefetchOrdering,
}

impl Storefront {
    pub fn new(config: &Config, store: Arc<dyn KeyValueStore>) -> Result<Storefront> {
        let api = ApiClient::new(config)?;
        let session = SessionStore::new(store);
        let ordering = config.refetch_ordering;

        Ok(Storefront {
            cart: Arc::new(CartCache::new(api.clone(), session.clone(), ordering)),
            wishlist: Arc::new(WishlistCache::new(api.clone(), session.clone(), ordering)),
            categories: Arc::new(CategoryCache::new(api.clone(), session.clone(), ordering)),
            api,
            session,
            notifications: Notifications::new(),
            reviews: Arc::new(Mutex::new(HashMap::new())),
            ordering,
        })
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn cart(&self) -> &CartCache {
        &self.cart
    }

    pub fn wishlist(&self) -> &WishlistCache {
        &self.wishlist
    }

    pub fn categories(&self) -> &CategoryCache {
        &self.categories
    }

    pub fn notifications(&self) -> &Notifications {
        &self.notifications
    }

    /// Ordering policy for caches built on top of this storefront.
    pub fn refetch_ordering(&self) -> RefetchOrdering {
        self.ordering
    }

    /// Restores the session, then loads categories and, with a token, the user's collections.
    pub async fn start(&self) {
        self.session.initialize();
        if self.session.token().is_some() {
            futures::join!(
                self.categories.refetch(),
                self.cart.refetch(),
                self.wishlist.refetch()
            );
        } else {
            self.categories.refetch().await;
        }
    }

    pub(crate) fn require_token(&self) -> Result<String> {
        self.session
            .token_for_request()
            .ok_or(ApiError::NotAuthenticated)
    }

    fn require_user(&self) -> Result<(User, String)> {
        let token = self.require_token()?;
        let user = self.session.user().ok_or(ApiError::NotAuthenticated)?;
        Ok((user, token))
    }

    // ---- authentication ----

    /// Returns where to go next: the page that sent the user to sign in, or home.
    pub async fn sign_in(&self, form: &SignInForm, from: Option<&str>) -> Result<String> {
        validate_sign_in(form)?;

        let response = self
            .notifications
            .report(self.api.login(form).await, FALLBACK_MESSAGE)?;
        let expiry = self
            .notifications
            .report(decode_expiry(&response.token), FALLBACK_MESSAGE)?;

        self.session.login(response.data.user, response.token, expiry);
        self.notifications.success("Login successful");
        futures::join!(self.cart.refetch(), self.wishlist.refetch());

        Ok(post_login_target(from))
    }

    pub async fn sign_up(&self, form: &SignUpForm) -> Result<String> {
        validate_sign_up(form)?;

        let response = self
            .notifications
            .report(self.api.signup(form).await, FALLBACK_MESSAGE)?;
        let message = response
            .message
            .unwrap_or_else(|| "Account created, you can sign in now.".to_string());
        self.notifications.success(message.clone());
        Ok(message)
    }

    pub fn sign_out(&self) {
        self.session.logout();
        self.cart.clear();
        self.wishlist.clear();
        self.reviews.lock().clear();
    }

    // ---- browsing ----

    pub async fn products(&self) -> Result<Vec<Product>> {
        let token = self.session.token_for_request();
        self.api.products(token.as_deref()).await
    }

    pub fn is_in_cart(&self, product_id: &str) -> bool {
        self.cart.contains(product_id)
    }

    pub fn is_in_wishlist(&self, product_id: &str) -> bool {
        self.wishlist.contains(product_id)
    }

    pub async fn add_to_cart(&self, product_id: &str, quantity: u32) -> Result<()> {
        validate_cart_quantity(quantity)?;
        let token = self.require_token()?;

        let line = CartLine {
            product_id: product_id.to_string(),
            quantity,
        };
        self.notifications
            .report(self.api.add_to_cart(&token, &line).await, FALLBACK_MESSAGE)?;
        self.cart.refetch().await;
        Ok(())
    }

    /// Removes the book when it is already wishlisted, adds it otherwise. Returns the new
    /// membership.
    pub async fn toggle_wishlist(&self, product_id: &str) -> Result<bool> {
        let token = self.require_token()?;

        let listed = self.wishlist.contains(product_id);
        let result = if listed {
            self.api.remove_from_wishlist(&token, product_id).await
        } else {
            self.api.add_to_wishlist(&token, product_id).await
        };
        self.notifications.report(result, FALLBACK_MESSAGE)?;

        self.wishlist.refetch().await;
        Ok(!listed)
    }

    pub async fn book_comments(&self, book_id: &str) -> Result<Vec<Comment>> {
        Ok(self.api.book_comments(book_id).await?.comments)
    }

    // ---- reviews ----

    pub fn review_eligibility(&self, book_id: &str) -> Option<ReviewEligibility> {
        self.reviews.lock().get(book_id).copied()
    }

    pub async fn open_review(&self, book_id: &str) -> Result<ReviewGate> {
        let token = match self.session.token_for_request() {
            Some(token) if !self.session.is_admin() => token,
            _ => return Ok(ReviewGate::NotAllowed),
        };

        let eligibility = self.notifications.report(
            self.api.check_comment_eligibility(&token, book_id).await,
            FALLBACK_MESSAGE,
        )?;
        self.reviews.lock().insert(book_id.to_string(), eligibility);

        if !eligibility.is_bought {
            self.notifications.error(NOT_PURCHASED_MESSAGE);
            return Ok(ReviewGate::NotPurchased);
        }
        if eligibility.is_reviewed {
            self.notifications.error(ALREADY_REVIEWED_MESSAGE);
            return Ok(ReviewGate::AlreadyReviewed);
        }
        Ok(ReviewGate::Open)
    }

    /// Posts the review; it stays hidden until an admin approves it.
    pub async fn submit_review(&self, book_id: &str, draft: &ReviewDraft) -> Result<String> {
        if self.session.is_admin() {
            return Err(ApiError::Forbidden);
        }
        let (user, token) = self.require_user()?;
        validate_review(draft)?;

        let comment = NewComment {
            user_id: user.id,
            book_id: book_id.to_string(),
            comment: draft.comment.clone(),
            rate: draft.rating,
        };
        let response = self.notifications.report(
            self.api.create_comment(&token, &comment).await,
            "Failed to send comment",
        )?;

        self.reviews.lock().insert(
            book_id.to_string(),
            ReviewEligibility {
                is_bought: true,
                is_reviewed: true,
            },
        );
        let message = match response.message {
            Some(message) => format!("{}, your comment is pending approval", message),
            None => "Your comment is pending approval".to_string(),
        };
        self.notifications.success(message.clone());
        Ok(message)
    }

    // ---- profile ----

    pub async fn profile(&self) -> Result<User> {
        let token = self.require_token()?;
        self.api.me(&token).await
    }

    /// Renames the signed-in user and returns the refreshed profile.
    pub async fn change_name(&self, name: &str) -> Result<User> {
        let validated = validate_display_name(name);
        if let Err(errors) = &validated {
            self.notifications.error(errors.to_string());
        }
        validated?;
        let (user, token) = self.require_user()?;

        let response = self.notifications.report(
            self.api.update_name(&token, &user.id, name.trim()).await,
            FALLBACK_MESSAGE,
        )?;
        self.notifications.success(
            response
                .message
                .unwrap_or_else(|| "Name changed successfully".to_string()),
        );
        self.api.me(&token).await
    }

    pub async fn change_password(&self, form: &ChangePasswordForm) -> Result<()> {
        validate_change_password(form)?;
        let (user, token) = self.require_user()?;

        let response = self.notifications.report(
            self.api.change_password(&token, &user.id, form).await,
            FALLBACK_MESSAGE,
        )?;
        self.notifications.success(
            response
                .message
                .unwrap_or_else(|| "password changed successfully.".to_string()),
        );
        Ok(())
    }

    // ---- contact ----

    /// Messages are sent with the account's identity; admins have no one to write to.
    pub async fn send_contact(&self, message: &str) -> Result<()> {
        if self.session.is_admin() {
            return Err(ApiError::Forbidden);
        }
        validate_contact_message(message)?;
        let token = self.require_token()?;

        self.notifications.report(
            self.api.send_contact(&token, message).await,
            "An error occurred while sending your message",
        )?;
        self.notifications
            .success("Your message has been sent successfully");
        Ok(())
    }

    pub fn cart_page(&self) -> CartPage {
        CartPage::new(self.clone())
    }

    pub fn wishlist_page(&self) -> WishlistPage {
        WishlistPage::new(self.clone())
    }
}

/// Cart lines with quantity editing and delete confirmation.
pub struct CartPage {
    shop: Storefront,
    rows: RowEditor<String, u32>,
}

impl CartPage {
    pub fn new(shop: Storefront) -> CartPage {
        let rows = RowEditor::new(shop.notifications.clone());
        CartPage { shop, rows }
    }

    pub fn storefront(&self) -> &Storefront {
        &self.shop
    }

    pub fn items(&self) -> Vec<CartItem> {
        self.shop.cart.items()
    }

    pub fn total_price(&self) -> f64 {
        self.shop.cart.total_price()
    }

    pub fn total_quantity(&self) -> u32 {
        self.shop.cart.total_quantity()
    }

    pub fn rows(&self) -> &RowEditor<String, u32> {
        &self.rows
    }

    /// Returns false when the product is not in the cart.
    pub fn begin_edit(&mut self, product_id: &str) -> bool {
        match self.shop.cart.item(product_id) {
            Some(item) => {
                self.rows.begin_edit(item.product_id, item.quantity);
                true
            }
            None => false,
        }
    }

    pub fn set_quantity(&mut self, quantity: u32) -> bool {
        self.rows.update_draft(quantity)
    }

    pub fn begin_delete(&mut self, product_id: &str) {
        self.rows.begin_delete(product_id.to_string());
    }

    pub fn cancel(&mut self) {
        self.rows.cancel();
    }

    pub async fn save_edit(&mut self) -> Result<()> {
        let draft = self.rows.active_id().and_then(|id| self.rows.draft(id)).copied();
        if let Some(quantity) = draft {
            validate_cart_quantity(quantity)?;
        }
        let token = self.shop.require_token()?;

        let api = self.shop.api.clone();
        let saved = self
            .rows
            .commit_edit(move |id, quantity| async move {
                api.update_cart_item(&token, &id, quantity).await
            })
            .await?;
        if saved.is_some() {
            self.shop.cart.refetch().await;
        }
        Ok(())
    }

    pub async fn confirm_delete(&mut self) -> Result<()> {
        let token = self.shop.require_token()?;

        let api = self.shop.api.clone();
        let deleted = self
            .rows
            .confirm_delete(move |id| async move { api.remove_cart_item(&token, &id).await })
            .await?;
        if deleted.is_some() {
            debug!("cart line removed");
            self.shop.cart.refetch().await;
        }
        Ok(())
    }
}

/// Wishlist entries with delete confirmation and an add-to-cart quantity row.
pub struct WishlistPage {
    shop: Storefront,
    deletes: RowEditor<String, ()>,
    additions: RowEditor<String, u32>,
}

impl WishlistPage {
    pub fn new(shop: Storefront) -> WishlistPage {
        WishlistPage {
            deletes: RowEditor::new(shop.notifications.clone()),
            additions: RowEditor::new(shop.notifications.clone()),
            shop,
        }
    }

    pub fn items(&self) -> Vec<WishlistItem> {
        self.shop.wishlist.items()
    }

    pub fn in_cart(&self, product_id: &str) -> bool {
        self.shop.cart.contains(product_id)
    }

    pub fn deletes(&self) -> &RowEditor<String, ()> {
        &self.deletes
    }

    pub fn additions(&self) -> &RowEditor<String, u32> {
        &self.additions
    }

    pub fn begin_delete(&mut self, product_id: &str) {
        self.additions.cancel();
        self.deletes.begin_delete(product_id.to_string());
    }

    pub async fn confirm_delete(&mut self) -> Result<()> {
        let token = self.shop.require_token()?;

        let api = self.shop.api.clone();
        let deleted = self
            .deletes
            .confirm_delete(move |id| async move { api.remove_from_wishlist(&token, &id).await })
            .await?;
        if deleted.is_some() {
            self.shop.wishlist.refetch().await;
        }
        Ok(())
    }

    /// Opens the quantity row for a book; the quantity starts at one.
    pub fn begin_add_to_cart(&mut self, product_id: &str) {
        self.deletes.cancel();
        self.additions.begin_edit(product_id.to_string(), 1);
    }

    pub fn set_quantity(&mut self, quantity: u32) -> bool {
        self.additions.update_draft(quantity)
    }

    pub fn cancel(&mut self) {
        self.deletes.cancel();
        self.additions.cancel();
    }

    pub async fn confirm_add_to_cart(&mut self) -> Result<()> {
        let draft = self
            .additions
            .active_id()
            .and_then(|id| self.additions.draft(id))
            .copied();
        if let Some(quantity) = draft {
            validate_cart_quantity(quantity)?;
        }
        let token = self.shop.require_token()?;

        let api = self.shop.api.clone();
        let added = self
            .additions
            .commit_edit(move |product_id, quantity| async move {
                let line = CartLine {
                    product_id,
                    quantity,
                };
                api.add_to_cart(&token, &line).await
            })
            .await?;
        if added.is_some() {
            info!("wishlist item moved to cart");
            self.shop.cart.refetch().await;
        }
        Ok(())
    }
}
