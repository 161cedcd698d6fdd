use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const ADMIN_ROLE: &str = "admin";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_verified: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
    // Anything else the server sends is kept so a restored session is byte-for-byte the
    // user that logged in.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.as_deref() == Some(ADMIN_ROLE)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Category {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slug: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub slug: Option<String>,
    pub description: String,
    pub author: String,
    pub category: Option<Category>,
    pub image_cover: Option<String>,
    pub images: Vec<String>,
    pub pdf_link: Option<String>,
    pub price: f64,
    pub price_after_discount: Option<f64>,
    pub quantity: i64,
    pub rating_average: Option<f64>,
    pub rating_quantity: Option<u32>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CartItem {
    pub product_id: String,
    pub title: String,
    pub author: String,
    pub image: Option<String>,
    pub price: Option<f64>,
    pub quantity: u32,
    pub sub_total: f64,
}

impl CartItem {
    /// Unit price, falling back to the subtotal split over the quantity.
    pub fn unit_price(&self) -> f64 {
        match self.price {
            Some(price) => price,
            None if self.quantity > 0 => self.sub_total / f64::from(self.quantity),
            None => 0.0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CartSummary {
    pub cart_items: Vec<CartItem>,
    pub total_price: f64,
    pub total_quantity: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WishlistItem {
    pub product_id: String,
    pub title: String,
    pub author: String,
    pub image: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WishlistSummary {
    pub wishlist_items: Vec<WishlistItem>,
    pub total_quantity: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CommentStatus {
    Pending,
    Approved,
    Rejected,
}

impl CommentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CommentStatus::Pending => "pending",
            CommentStatus::Approved => "approved",
            CommentStatus::Rejected => "rejected",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentAuthor {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentBook {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    pub author: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub author: CommentAuthor,
    #[serde(rename = "bookId")]
    pub book: Option<CommentBook>,
    pub comment: String,
    pub rate: u8,
    pub status: Option<CommentStatus>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub page: u32,
    pub total_pages: u32,
    pub total: u64,
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            page: 1,
            total_pages: 1,
            total: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommentsPage {
    pub data: Vec<Comment>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReviewEligibility {
    pub is_bought: bool,
    pub is_reviewed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContactMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    pub message: String,
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OrderCustomer {
    Id(String),
    User {
        #[serde(rename = "_id")]
        id: String,
        name: String,
        #[serde(default)]
        email: Option<String>,
    },
}

impl OrderCustomer {
    pub fn id(&self) -> &str {
        match self {
            OrderCustomer::Id(id) => id,
            OrderCustomer::User { id, .. } => id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(rename = "userId")]
    pub customer: OrderCustomer,
    pub total_price: f64,
    pub status: String,
    #[serde(default)]
    pub transaction_ref: Option<String>,
    #[serde(default)]
    pub paypal_order_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CategoryStats {
    #[serde(rename = "categoryid")]
    pub category_id: Option<String>,
    #[serde(rename = "categoryname")]
    pub category_name: String,
    pub total_sold: u64,
}

// ---- request payloads ----

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SignInForm {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    pub product_id: String,
    pub quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WishlistEntry {
    pub product_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub user_id: String,
    pub book_id: String,
    pub comment: String,
    pub rate: u8,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReviewDraft {
    pub comment: String,
    pub rating: u8,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FileUpload {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// Book form shared by the add and edit dialogs; the add path requires every field.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductForm {
    pub title: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<i64>,
    pub category: Option<String>,
    pub image_cover: Option<FileUpload>,
    pub pdf: Option<FileUpload>,
}

impl ProductForm {
    pub fn from_product(product: &Product) -> ProductForm {
        ProductForm {
            title: Some(product.title.clone()),
            author: Some(product.author.clone()),
            description: Some(product.description.clone()),
            price: Some(product.price),
            quantity: Some(product.quantity),
            category: product.category.as_ref().map(|c| c.id.clone()),
            image_cover: None,
            pdf: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub book: String,
    pub quantity: u32,
    pub price: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRequest {
    pub books: Vec<OrderLine>,
    pub total_price: f64,
    pub payment_method: String,
}

// ---- response envelopes ----

#[derive(Debug, Deserialize)]
pub struct Envelope<T> {
    #[serde(default = "Option::default")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct MessageResponse {
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginData {
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub data: LoginData,
    pub token: String,
}

#[derive(Debug, Deserialize)]
pub struct ProfileData {
    pub user: User,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct BookComments {
    pub comments: Vec<Comment>,
}

/// Some list endpoints wrap their payload in `data`, others return it bare.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum DataOrBare<T> {
    Wrapped { data: T },
    Bare(T),
}

impl<T> DataOrBare<T> {
    pub fn into_inner(self) -> T {
        match self {
            DataOrBare::Wrapped { data } => data,
            DataOrBare::Bare(data) => data,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ConfirmResponse {
    pub success: bool,
    pub message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_user_role_only_payload() {
        let user: User = serde_json::from_value(json!({ "role": "user" })).unwrap();
        assert!(!user.is_admin());
        assert_eq!(user.id, "");

        let admin: User = serde_json::from_value(json!({ "_id": "1", "role": "admin" })).unwrap();
        assert!(admin.is_admin());

        let no_role: User = serde_json::from_value(json!({ "_id": "2" })).unwrap();
        assert!(!no_role.is_admin());

        let upper: User = serde_json::from_value(json!({ "role": "Admin" })).unwrap();
        assert!(!upper.is_admin());
    }

    #[test]
    fn test_user_keeps_unknown_fields() {
        let raw = json!({ "_id": "u1", "name": "Mona", "email": "m@x.io", "role": "user", "__v": 0 });
        let user: User = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(serde_json::to_value(&user).unwrap(), raw);
    }

    #[test]
    fn test_order_customer_variants() {
        let bare: Order = serde_json::from_value(json!({
            "_id": "o1", "userId": "u1", "totalPrice": 10.0, "status": "paid"
        }))
        .unwrap();
        assert_eq!(bare.customer, OrderCustomer::Id("u1".into()));

        let populated: Order = serde_json::from_value(json!({
            "_id": "o2", "userId": { "_id": "u2", "name": "Omar" }, "totalPrice": 5.5, "status": "pending"
        }))
        .unwrap();
        assert_eq!(populated.customer.id(), "u2");
    }

    #[test]
    fn test_unit_price_falls_back_to_subtotal() {
        let item = CartItem {
            price: None,
            quantity: 4,
            sub_total: 100.0,
            ..Default::default()
        };
        assert_eq!(item.unit_price(), 25.0);
    }
}
