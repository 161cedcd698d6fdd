//! HTTP client for the bookstore REST API.
//!
//! The bearer token is passed per call; nothing is attached by default. User-scoped calls
//! take a `&str` token, calls that merely forward a token when present take `Option<&str>`.

use std::time::Duration;

use log::debug;
use reqwest::multipart::{Form, Part};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};

use crate::config::Config;
use crate::error::{ApiError, Result};
use crate::models::{
    BookComments, CartLine, CartSummary, Category, CategoryStats, ChangePasswordForm,
    CommentStatus, CommentsPage, ConfirmResponse, ContactMessage, DataOrBare, Envelope,
    FileUpload, LoginResponse, MessageResponse, NewComment, Order, OrderRequest, Product,
    ProductForm, ProfileData, ReviewEligibility, SignInForm, SignUpForm, User, WishlistEntry,
    WishlistSummary,
};

#[derive(Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base_url: String,
    payment_base_url: String,
    upload_timeout: Duration,
    confirm_timeout: Duration,
}

#[derive(Serialize)]
struct AdminCommentsQuery {
    #[serde(skip_serializing_if = "Option::is_none")]
    status: Option<CommentStatus>,
    page: u32,
    limit: u32,
}

/// Pulls the human-readable message out of an error body: `message`, else `errors[0].msg`.
pub fn extract_message(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    if let Some(message) = value.get("message").and_then(Value::as_str) {
        return Some(message.to_string());
    }
    value
        .get("errors")?
        .get(0)?
        .get("msg")?
        .as_str()
        .map(str::to_string)
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()?;

        Ok(ApiClient {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            payment_base_url: config.payment_base_url.trim_end_matches('/').to_string(),
            upload_timeout: config.upload_timeout,
            confirm_timeout: config.confirm_timeout,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, method: Method, path: &str, token: Option<&str>) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, url);
        let builder = self.client.request(method, url);
        match token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T> {
        let response = builder.send().await?;
        Self::read(response).await
    }

    async fn read<T: DeserializeOwned>(response: Response) -> Result<T> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Server {
                status: status.as_u16(),
                message: extract_message(&body),
            });
        }

        let bytes = response.bytes().await?;
        let body: &[u8] = if bytes.iter().all(u8::is_ascii_whitespace) {
            b"{}"
        } else {
            &bytes
        };
        serde_json::from_slice(body).map_err(|e| ApiError::Decode(e.to_string()))
    }

    // ---- auth ----

    pub async fn login(&self, form: &SignInForm) -> Result<LoginResponse> {
        Self::send(self.request(Method::POST, "/auth/login", None).json(form)).await
    }

    pub async fn signup(&self, form: &SignUpForm) -> Result<MessageResponse> {
        Self::send(self.request(Method::POST, "/auth/signup", None).json(form)).await
    }

    pub async fn verify_email(&self, verification_token: &str) -> Result<MessageResponse> {
        let path = format!("/auth/verifyEmail/{}", verification_token);
        Self::send(self.request(Method::GET, &path, None)).await
    }

    // ---- users ----

    pub async fn me(&self, token: &str) -> Result<User> {
        let envelope: Envelope<ProfileData> =
            Self::send(self.request(Method::GET, "/users/me", Some(token))).await?;
        envelope
            .data
            .map(|data| data.user)
            .ok_or_else(|| ApiError::Decode("profile response without user".into()))
    }

    pub async fn list_users(&self, token: &str) -> Result<Vec<User>> {
        let users: DataOrBare<Vec<User>> =
            Self::send(self.request(Method::GET, "/users", Some(token))).await?;
        Ok(users.into_inner())
    }

    pub async fn update_name(&self, token: &str, user_id: &str, name: &str) -> Result<MessageResponse> {
        let path = format!("/users/{}", user_id);
        Self::send(
            self.request(Method::PATCH, &path, Some(token))
                .json(&json!({ "name": name })),
        )
        .await
    }

    pub async fn change_password(
        &self,
        token: &str,
        user_id: &str,
        form: &ChangePasswordForm,
    ) -> Result<MessageResponse> {
        let path = format!("/users/changePassword/{}", user_id);
        Self::send(self.request(Method::PATCH, &path, Some(token)).json(form)).await
    }

    pub async fn change_role(&self, token: &str, user_id: &str) -> Result<MessageResponse> {
        let path = format!("/users/changerole/{}", user_id);
        Self::send(self.request(Method::POST, &path, Some(token)).json(&json!({}))).await
    }

    pub async fn deactivate_user(&self, token: &str, user_id: &str) -> Result<MessageResponse> {
        let path = format!("/users/deactivate/{}", user_id);
        Self::send(self.request(Method::PATCH, &path, Some(token)).json(&json!({}))).await
    }

    pub async fn reactivate_user(&self, token: &str, user_id: &str) -> Result<MessageResponse> {
        let path = format!("/users/reactivate/{}", user_id);
        Self::send(self.request(Method::PATCH, &path, Some(token)).json(&json!({}))).await
    }

    // ---- categories ----

    pub async fn categories(&self, token: Option<&str>) -> Result<Vec<Category>> {
        let envelope: Envelope<Vec<Category>> =
            Self::send(self.request(Method::GET, "/categories", token)).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn create_category(&self, token: &str, name: &str) -> Result<MessageResponse> {
        Self::send(
            self.request(Method::POST, "/categories", Some(token))
                .json(&json!({ "name": name })),
        )
        .await
    }

    pub async fn update_category(&self, token: &str, id: &str, name: &str) -> Result<MessageResponse> {
        let path = format!("/categories/{}", id);
        Self::send(
            self.request(Method::PUT, &path, Some(token))
                .json(&json!({ "name": name })),
        )
        .await
    }

    pub async fn delete_category(&self, token: &str, id: &str) -> Result<MessageResponse> {
        let path = format!("/categories/{}", id);
        Self::send(self.request(Method::DELETE, &path, Some(token))).await
    }

    // ---- products ----

    pub async fn products(&self, token: Option<&str>) -> Result<Vec<Product>> {
        let envelope: Envelope<Vec<Product>> =
            Self::send(self.request(Method::GET, "/products", token)).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn create_product(&self, token: &str, form: &ProductForm) -> Result<MessageResponse> {
        let builder = self
            .request(Method::POST, "/products", Some(token))
            .multipart(product_multipart(form)?)
            .timeout(self.upload_timeout);
        Self::send(builder).await
    }

    pub async fn update_product(
        &self,
        token: &str,
        id: &str,
        form: &ProductForm,
    ) -> Result<MessageResponse> {
        let path = format!("/products/{}", id);
        let builder = self
            .request(Method::PUT, &path, Some(token))
            .multipart(product_multipart(form)?)
            .timeout(self.upload_timeout);
        Self::send(builder).await
    }

    pub async fn delete_product(&self, token: &str, id: &str) -> Result<MessageResponse> {
        let path = format!("/products/{}", id);
        Self::send(self.request(Method::DELETE, &path, Some(token))).await
    }

    // ---- cart ----

    pub async fn cart(&self, token: &str) -> Result<CartSummary> {
        let envelope: Envelope<CartSummary> =
            Self::send(self.request(Method::GET, "/cart", Some(token))).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn add_to_cart(&self, token: &str, line: &CartLine) -> Result<MessageResponse> {
        Self::send(self.request(Method::POST, "/cart", Some(token)).json(line)).await
    }

    pub async fn update_cart_item(
        &self,
        token: &str,
        product_id: &str,
        quantity: u32,
    ) -> Result<MessageResponse> {
        let path = format!("/cart/{}", product_id);
        Self::send(
            self.request(Method::PATCH, &path, Some(token))
                .json(&json!({ "quantity": quantity })),
        )
        .await
    }

    pub async fn remove_cart_item(&self, token: &str, product_id: &str) -> Result<MessageResponse> {
        let path = format!("/cart/{}", product_id);
        Self::send(self.request(Method::DELETE, &path, Some(token))).await
    }

    // ---- wishlist ----

    pub async fn wishlist(&self, token: &str) -> Result<WishlistSummary> {
        let envelope: Envelope<WishlistSummary> =
            Self::send(self.request(Method::GET, "/wishlist", Some(token))).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn add_to_wishlist(&self, token: &str, product_id: &str) -> Result<MessageResponse> {
        let entry = WishlistEntry {
            product_id: product_id.to_string(),
        };
        Self::send(self.request(Method::POST, "/wishlist", Some(token)).json(&entry)).await
    }

    pub async fn remove_from_wishlist(&self, token: &str, product_id: &str) -> Result<MessageResponse> {
        let entry = WishlistEntry {
            product_id: product_id.to_string(),
        };
        Self::send(self.request(Method::DELETE, "/wishlist", Some(token)).json(&entry)).await
    }

    // ---- comments ----

    pub async fn book_comments(&self, book_id: &str) -> Result<BookComments> {
        let path = format!("/comments/{}", book_id);
        Self::send(self.request(Method::GET, &path, None)).await
    }

    pub async fn check_comment_eligibility(&self, token: &str, book_id: &str) -> Result<ReviewEligibility> {
        let path = format!("/comments/check/{}", book_id);
        Self::send(self.request(Method::GET, &path, Some(token))).await
    }

    pub async fn create_comment(&self, token: &str, comment: &NewComment) -> Result<MessageResponse> {
        Self::send(self.request(Method::POST, "/comments/crea", Some(token)).json(comment)).await
    }

    pub async fn admin_comments(
        &self,
        token: &str,
        status: Option<CommentStatus>,
        page: u32,
        limit: u32,
    ) -> Result<CommentsPage> {
        let query = AdminCommentsQuery {
            status,
            page,
            limit,
        };
        Self::send(
            self.request(Method::GET, "/comments/admin/comments", Some(token))
                .query(&query),
        )
        .await
    }

    pub async fn set_comment_status(
        &self,
        token: &str,
        id: &str,
        status: CommentStatus,
    ) -> Result<MessageResponse> {
        let path = format!("/comments/admin/comments/{}", id);
        Self::send(
            self.request(Method::PATCH, &path, Some(token))
                .json(&json!({ "status": status })),
        )
        .await
    }

    pub async fn delete_comment(&self, token: &str, id: &str) -> Result<MessageResponse> {
        let path = format!("/comments/{}", id);
        Self::send(self.request(Method::DELETE, &path, Some(token))).await
    }

    // ---- contact ----

    pub async fn send_contact(&self, token: &str, message: &str) -> Result<MessageResponse> {
        Self::send(
            self.request(Method::POST, "/contact", Some(token))
                .json(&json!({ "message": message })),
        )
        .await
    }

    pub async fn contact_messages(&self, token: &str) -> Result<Vec<ContactMessage>> {
        let envelope: Envelope<Vec<ContactMessage>> =
            Self::send(self.request(Method::GET, "/contact", Some(token))).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    // ---- orders ----

    pub async fn all_orders(&self, token: &str) -> Result<Vec<Order>> {
        let envelope: Envelope<Vec<Order>> =
            Self::send(self.request(Method::GET, "/orders/all-orders", Some(token))).await?;
        Ok(envelope.data.unwrap_or_default())
    }

    pub async fn orders_per_category(&self, token: &str) -> Result<Vec<CategoryStats>> {
        let envelope: Envelope<Vec<CategoryStats>> = Self::send(self.request(
            Method::GET,
            "/orders/noofordersincategory",
            Some(token),
        ))
        .await?;
        Ok(envelope.data.unwrap_or_default())
    }

    // ---- payment (outside the versioned prefix) ----

    pub async fn create_test_order(&self, token: &str, order: &OrderRequest) -> Result<Value> {
        let url = format!("{}/buy/create-test-order", self.payment_base_url);
        debug!("POST {}", url);
        Self::send(self.client.post(url).bearer_auth(token).json(order)).await
    }

    pub async fn confirm_payment(&self, payment_token: &str) -> Result<ConfirmResponse> {
        let url = format!("{}/buy/confirm", self.payment_base_url);
        debug!("GET {}", url);
        Self::send(
            self.client
                .get(url)
                .query(&[("token", payment_token)])
                .timeout(self.confirm_timeout),
        )
        .await
    }
}

fn file_part(upload: &FileUpload) -> Result<Part> {
    Ok(Part::bytes(upload.bytes.clone())
        .file_name(upload.file_name.clone())
        .mime_str(&upload.content_type)?)
}

/// Only fields that carry a value are sent, so an edit leaves the rest untouched.
fn product_multipart(form: &ProductForm) -> Result<Form> {
    let mut multipart = Form::new();
    let text_fields = [
        ("title", form.title.clone()),
        ("author", form.author.clone()),
        ("description", form.description.clone()),
        ("price", form.price.map(|p| p.to_string())),
        ("quantity", form.quantity.map(|q| q.to_string())),
        ("category", form.category.clone()),
    ];
    for (name, value) in text_fields {
        if let Some(value) = value.filter(|v| !v.is_empty()) {
            multipart = multipart.text(name, value);
        }
    }
    if let Some(image) = &form.image_cover {
        multipart = multipart.part("imageCover", file_part(image)?);
    }
    if let Some(pdf) = &form.pdf {
        multipart = multipart.part("pdfLink", file_part(pdf)?);
    }
    Ok(multipart)
}
