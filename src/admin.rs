//! Back-office: books, categories, users, comment moderation, orders, contact messages.
//!
//! Every operation checks the admin role before anything is sent; a non-admin gets
//! [`ApiError::Forbidden`] without a request being issued.

use std::collections::HashMap;

use log::{debug, info, warn};

use crate::cache::{CacheScope, CollectionCache};
use crate::error::{ApiError, Result, FALLBACK_MESSAGE};
use crate::models::{
    CategoryStats, Comment, CommentStatus, CommentsPage, ContactMessage, Order, OrderCustomer,
    Pagination, Product, ProductForm, User,
};
use crate::rows::{ConfirmDialog, RowEditor};
use crate::shop::Storefront;
use crate::validation::{validate_category_name, validate_new_product, validate_product_edit};

pub const COMMENTS_PAGE_SIZE: u32 = 10;
pub const UNKNOWN_USER: &str = "Unknown User";

/// Token of the signed-in admin, or `Forbidden`.
pub fn ensure_admin(shop: &Storefront) -> Result<String> {
    if !shop.session().is_admin() {
        return Err(ApiError::Forbidden);
    }
    shop.require_token()
}

// ---- books ----

pub struct BooksAdmin {
    shop: Storefront,
    products: CollectionCache<Vec<Product>>,
    rows: RowEditor<String, ProductForm>,
}

impl BooksAdmin {
    pub fn new(shop: Storefront) -> BooksAdmin {
        let products = CollectionCache::new(
            "admin-products",
            CacheScope::Admin,
            shop.refetch_ordering(),
            shop.api().clone(),
            shop.session().clone(),
            |api, token| async move { api.products(token.as_deref()).await },
        );
        let rows = RowEditor::new(shop.notifications().clone()).with_fallback("Operation failed");
        BooksAdmin {
            shop,
            products,
            rows,
        }
    }

    pub async fn refresh(&self) {
        self.products.refetch().await
    }

    pub fn products(&self) -> Vec<Product> {
        self.products.snapshot().unwrap_or_default()
    }

    pub fn rows(&self) -> &RowEditor<String, ProductForm> {
        &self.rows
    }

    pub async fn create(&self, form: &ProductForm) -> Result<()> {
        let token = ensure_admin(&self.shop)?;
        validate_new_product(form)?;

        self.shop.notifications().report(
            self.shop.api().create_product(&token, form).await,
            "Operation failed",
        )?;
        self.shop.notifications().success("Book added successfully");
        self.products.refetch().await;
        Ok(())
    }

    /// Opens the edit form pre-filled from the listed book. False when it is not listed.
    pub fn begin_edit(&mut self, product_id: &str) -> bool {
        let product = self
            .products
            .with(|list| list.and_then(|l| l.iter().find(|p| p.id == product_id).cloned()));
        match product {
            Some(product) => {
                self.rows
                    .begin_edit(product.id.clone(), ProductForm::from_product(&product));
                true
            }
            None => false,
        }
    }

    pub fn update_form(&mut self, form: ProductForm) -> bool {
        self.rows.update_draft(form)
    }

    pub fn cancel(&mut self) {
        self.rows.cancel();
    }

    pub async fn submit_edit(&mut self) -> Result<()> {
        let token = ensure_admin(&self.shop)?;
        if let Some(form) = self.rows.active_id().and_then(|id| self.rows.draft(id)) {
            validate_product_edit(form)?;
        }

        let api = self.shop.api().clone();
        let saved = self
            .rows
            .commit_edit(move |id, form| async move { api.update_product(&token, &id, &form).await })
            .await?;
        if saved.is_some() {
            self.shop.notifications().success("Book updated successfully");
            self.products.refetch().await;
        }
        Ok(())
    }

    pub fn begin_delete(&mut self, product_id: &str) {
        self.rows.begin_delete(product_id.to_string());
    }

    pub async fn confirm_delete(&mut self) -> Result<()> {
        let token = ensure_admin(&self.shop)?;

        let api = self.shop.api().clone();
        let deleted = self
            .rows
            .confirm_delete(move |id| async move { api.delete_product(&token, &id).await })
            .await?;
        if let Some(response) = deleted {
            self.shop.notifications().success(
                response
                    .message
                    .unwrap_or_else(|| "Book deleted successfully".to_string()),
            );
            self.products.refetch().await;
        }
        Ok(())
    }
}

// ---- categories ----

pub struct CategoriesAdmin {
    shop: Storefront,
    rows: RowEditor<String, String>,
}

impl CategoriesAdmin {
    pub fn new(shop: Storefront) -> CategoriesAdmin {
        let rows = RowEditor::new(shop.notifications().clone());
        CategoriesAdmin { shop, rows }
    }

    pub fn rows(&self) -> &RowEditor<String, String> {
        &self.rows
    }

    pub async fn create(&self, name: &str) -> Result<()> {
        let token = ensure_admin(&self.shop)?;
        validate_category_name(name)?;

        self.shop.notifications().report(
            self.shop.api().create_category(&token, name.trim()).await,
            FALLBACK_MESSAGE,
        )?;
        self.shop.notifications().success("Category added successfully");
        self.shop.categories().refetch().await;
        Ok(())
    }

    pub fn begin_edit(&mut self, category_id: &str) -> bool {
        match self.shop.categories().find(category_id) {
            Some(category) => {
                self.rows.begin_edit(category.id, category.name);
                true
            }
            None => false,
        }
    }

    pub fn rename(&mut self, name: &str) -> bool {
        self.rows.update_draft(name.to_string())
    }

    pub fn cancel(&mut self) {
        self.rows.cancel();
    }

    pub async fn submit_edit(&mut self) -> Result<()> {
        let token = ensure_admin(&self.shop)?;
        if let Some(name) = self.rows.active_id().and_then(|id| self.rows.draft(id)) {
            validate_category_name(name)?;
        }

        let api = self.shop.api().clone();
        let saved = self
            .rows
            .commit_edit(move |id, name| async move {
                api.update_category(&token, &id, name.trim()).await
            })
            .await?;
        if saved.is_some() {
            self.shop.notifications().success("Category updated successfully");
            self.shop.categories().refetch().await;
        }
        Ok(())
    }

    pub fn begin_delete(&mut self, category_id: &str) {
        self.rows.begin_delete(category_id.to_string());
    }

    pub async fn confirm_delete(&mut self) -> Result<()> {
        let token = ensure_admin(&self.shop)?;

        let api = self.shop.api().clone();
        let deleted = self
            .rows
            .confirm_delete(move |id| async move { api.delete_category(&token, &id).await })
            .await?;
        if deleted.is_some() {
            self.shop.notifications().success("Category deleted successfully");
            self.shop.categories().refetch().await;
        }
        Ok(())
    }
}

// ---- users ----

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserAction {
    Deactivate,
    Reactivate,
    ChangeRole,
}

impl UserAction {
    fn success_message(self) -> &'static str {
        match self {
            UserAction::Deactivate => "User deactivated",
            UserAction::Reactivate => "User reactivated",
            UserAction::ChangeRole => "Role changed successfully",
        }
    }

    fn failure_message(self) -> &'static str {
        match self {
            UserAction::Deactivate => "Failed to deactivate user",
            UserAction::Reactivate => "Failed to reactivate user",
            UserAction::ChangeRole => "Failed to change role",
        }
    }
}

pub struct UsersAdmin {
    shop: Storefront,
    users: CollectionCache<Vec<User>>,
    dialog: ConfirmDialog<String, UserAction>,
}

impl UsersAdmin {
    pub fn new(shop: Storefront) -> UsersAdmin {
        let users = users_cache(&shop);
        let dialog = ConfirmDialog::new(shop.notifications().clone());
        UsersAdmin {
            shop,
            users,
            dialog,
        }
    }

    pub async fn refresh(&self) {
        self.users.refetch().await
    }

    pub fn users(&self) -> Vec<User> {
        self.users.snapshot().unwrap_or_default()
    }

    pub fn dialog(&self) -> &ConfirmDialog<String, UserAction> {
        &self.dialog
    }

    pub fn open(&mut self, user_id: &str, action: UserAction) {
        self.dialog.open(user_id.to_string(), action);
    }

    pub fn close(&mut self) {
        self.dialog.close();
    }

    pub async fn confirm(&mut self) -> Result<()> {
        let token = ensure_admin(&self.shop)?;
        let fallback = match self.dialog.pending() {
            Some((_, action)) => action.failure_message(),
            None => return Ok(()),
        };

        let api = self.shop.api().clone();
        let done = self
            .dialog
            .confirm(fallback, move |id, action| async move {
                match action {
                    UserAction::Deactivate => api.deactivate_user(&token, &id).await?,
                    UserAction::Reactivate => api.reactivate_user(&token, &id).await?,
                    UserAction::ChangeRole => api.change_role(&token, &id).await?,
                };
                Ok(action)
            })
            .await?;
        if let Some(action) = done {
            self.shop.notifications().success(action.success_message());
            self.users.refetch().await;
        }
        Ok(())
    }
}

fn users_cache(shop: &Storefront) -> CollectionCache<Vec<User>> {
    CollectionCache::new(
        "admin-users",
        CacheScope::Admin,
        shop.refetch_ordering(),
        shop.api().clone(),
        shop.session().clone(),
        |api, token| async move {
            match token {
                Some(token) => api.list_users(&token).await,
                None => Ok(Vec::new()),
            }
        },
    )
}

// ---- comments ----

pub struct CommentsAdmin {
    shop: Storefront,
    filter: Option<CommentStatus>,
    page: u32,
    current: CommentsPage,
    rows: RowEditor<String, ()>,
}

impl CommentsAdmin {
    pub fn new(shop: Storefront) -> CommentsAdmin {
        let rows = RowEditor::new(shop.notifications().clone()).with_fallback("Failed to delete comment");
        CommentsAdmin {
            shop,
            filter: None,
            page: 1,
            current: CommentsPage::default(),
            rows,
        }
    }

    pub fn filter(&self) -> Option<CommentStatus> {
        self.filter
    }

    /// `None` lists every status. Changing the filter goes back to the first page.
    pub fn set_filter(&mut self, filter: Option<CommentStatus>) {
        if self.filter != filter {
            self.filter = filter;
            self.page = 1;
        }
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn comments(&self) -> &[Comment] {
        &self.current.data
    }

    pub fn pagination(&self) -> &Pagination {
        &self.current.pagination
    }

    pub fn rows(&self) -> &RowEditor<String, ()> {
        &self.rows
    }

    pub async fn load(&mut self) -> Result<()> {
        let token = ensure_admin(&self.shop)?;
        debug!("loading comments page {} ({:?})", self.page, self.filter);
        self.current = self
            .shop
            .api()
            .admin_comments(&token, self.filter, self.page, COMMENTS_PAGE_SIZE)
            .await?;
        Ok(())
    }

    pub fn has_next_page(&self) -> bool {
        self.page < self.current.pagination.total_pages
    }

    pub fn has_previous_page(&self) -> bool {
        self.page > 1
    }

    pub async fn next_page(&mut self) -> Result<()> {
        if self.has_next_page() {
            self.page += 1;
            self.load().await?;
        }
        Ok(())
    }

    pub async fn previous_page(&mut self) -> Result<()> {
        if self.has_previous_page() {
            self.page -= 1;
            self.load().await?;
        }
        Ok(())
    }

    pub async fn set_status(&mut self, comment_id: &str, status: CommentStatus) -> Result<()> {
        let token = ensure_admin(&self.shop)?;

        let response = self.shop.notifications().report(
            self.shop
                .api()
                .set_comment_status(&token, comment_id, status)
                .await,
            "Failed to update status",
        )?;
        self.shop.notifications().success(
            response
                .message
                .unwrap_or_else(|| "Comment status updated".to_string()),
        );
        self.load().await
    }

    pub fn begin_delete(&mut self, comment_id: &str) {
        self.rows.begin_delete(comment_id.to_string());
    }

    pub fn cancel(&mut self) {
        self.rows.cancel();
    }

    pub async fn confirm_delete(&mut self) -> Result<()> {
        let token = ensure_admin(&self.shop)?;

        let api = self.shop.api().clone();
        let deleted = self
            .rows
            .confirm_delete(move |id| async move { api.delete_comment(&token, &id).await })
            .await?;
        if deleted.is_some() {
            self.shop.notifications().success("Comment deleted successfully");
            self.load().await?;
        }
        Ok(())
    }
}

// ---- orders ----

#[derive(Debug, Clone, PartialEq)]
pub struct OrderRow {
    pub order: Order,
    pub customer_name: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OrdersOverview {
    pub orders: Vec<OrderRow>,
    pub stats: Vec<CategoryStats>,
}

/// Orders either embed their customer or carry only the id; the latter is resolved against
/// the user list.
pub fn customer_name(customer: &OrderCustomer, users: &HashMap<&str, &User>) -> String {
    match customer {
        OrderCustomer::User { name, .. } if !name.is_empty() => name.clone(),
        other => users
            .get(other.id())
            .map(|user| user.name.clone())
            .unwrap_or_else(|| UNKNOWN_USER.to_string()),
    }
}

pub struct OrdersAdmin {
    shop: Storefront,
}

impl OrdersAdmin {
    pub fn new(shop: Storefront) -> OrdersAdmin {
        OrdersAdmin { shop }
    }

    pub async fn load(&self) -> Result<OrdersOverview> {
        let token = ensure_admin(&self.shop)?;
        let api = self.shop.api();

        let (overview, users) = futures::join!(
            async { futures::try_join!(api.all_orders(&token), api.orders_per_category(&token)) },
            api.list_users(&token)
        );
        let (orders, stats) = self
            .shop
            .notifications()
            .report(overview, "Failed to load orders")?;
        // Names are cosmetic: without the user list every bare id shows as unknown.
        let users = users.unwrap_or_else(|e| {
            warn!("user list unavailable, customer names unresolved: {}", e);
            Vec::new()
        });
        info!("loaded {} orders", orders.len());

        let by_id: HashMap<&str, &User> = users.iter().map(|u| (u.id.as_str(), u)).collect();
        let orders = orders
            .into_iter()
            .map(|order| OrderRow {
                customer_name: customer_name(&order.customer, &by_id),
                order,
            })
            .collect();
        Ok(OrdersOverview { orders, stats })
    }
}

// ---- contact messages ----

pub struct ContactAdmin {
    shop: Storefront,
}

impl ContactAdmin {
    pub fn new(shop: Storefront) -> ContactAdmin {
        ContactAdmin { shop }
    }

    pub async fn messages(&self) -> Result<Vec<ContactMessage>> {
        let token = ensure_admin(&self.shop)?;
        self.shop.api().contact_messages(&token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, name: &str) -> User {
        User {
            id: id.into(),
            name: name.into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_customer_name_resolution() {
        let sara = user("u1", "Sara");
        let users: HashMap<&str, &User> = [("u1", &sara)].into_iter().collect();

        assert_eq!(customer_name(&OrderCustomer::Id("u1".into()), &users), "Sara");
        assert_eq!(customer_name(&OrderCustomer::Id("u9".into()), &users), UNKNOWN_USER);
        let embedded = OrderCustomer::User {
            id: "u2".into(),
            name: "Omar".into(),
            email: None,
        };
        assert_eq!(customer_name(&embedded, &users), "Omar");
    }

    #[test]
    fn test_user_action_messages() {
        assert_eq!(UserAction::ChangeRole.success_message(), "Role changed successfully");
        assert_eq!(UserAction::Reactivate.failure_message(), "Failed to reactivate user");
    }
}
