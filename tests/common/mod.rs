#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use actix_web::dev::{Service as _, ServerHandle};
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use jsonwebtoken::{encode, EncodingKey, Header};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::{json, Value};

use novel_shelf::storage::{KeyValueStore, MemoryStore};
use novel_shelf::{Config, Storefront};

pub const SECRET: &[u8] = b"mock-api-secret";

#[derive(Debug, Serialize)]
struct Claims {
    sub: String,
    exp: usize,
}

pub fn mint_token(sub: &str, exp: i64) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: exp as usize,
    };
    encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap()
}

#[derive(Debug, Clone)]
pub struct CartEntry {
    pub product_id: String,
    pub title: String,
    pub price: f64,
    pub quantity: u32,
}

#[derive(Default)]
pub struct MockState {
    /// "METHOD /path" for every request received, in arrival order.
    pub requests: Mutex<Vec<String>>,
    pub cart_hits: AtomicUsize,
    /// Delay applied to successive `GET /cart` requests; empty means no delay.
    pub cart_delays: Mutex<VecDeque<Duration>>,
    pub cart: Mutex<Vec<CartEntry>>,
    pub fail_cart_delete: AtomicBool,
    pub fail_cart_fetch: AtomicBool,
    pub fail_users: AtomicBool,
    pub fail_orders: AtomicBool,
    pub wishlist: Mutex<Vec<String>>,
    pub orders_created: AtomicUsize,
}

impl MockState {
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }

    pub fn request_count(&self, prefix: &str) -> usize {
        self.requests
            .lock()
            .iter()
            .filter(|r| r.starts_with(prefix))
            .count()
    }

    pub fn put_in_cart(&self, product_id: &str, price: f64, quantity: u32) {
        self.cart.lock().push(CartEntry {
            product_id: product_id.to_string(),
            title: format!("Book {}", product_id),
            price,
            quantity,
        });
    }
}

fn bearer(req: &HttpRequest) -> Option<String> {
    let header = req.headers().get("Authorization")?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(str::to_string)
}

fn unauthorized() -> HttpResponse {
    HttpResponse::Unauthorized().json(json!({ "message": "Login required" }))
}

fn user_json(email: &str) -> Value {
    let admin = email.starts_with("admin");
    json!({
        "_id": if admin { "admin-1" } else { "user-1" },
        "name": if admin { "Admin Person" } else { "Reader Person" },
        "email": email,
        "role": if admin { "admin" } else { "user" },
        "active": true,
        "isVerified": true
    })
}

async fn login(body: web::Json<Value>) -> HttpResponse {
    let email = body["email"].as_str().unwrap_or_default();
    if body["password"].as_str() == Some("Wrong#Pass1") {
        return HttpResponse::Unauthorized().json(json!({ "message": "Invalid credentials" }));
    }
    let user = user_json(email);
    let exp = chrono::Utc::now().timestamp() + 3600;
    let token = mint_token(user["_id"].as_str().unwrap_or_default(), exp);
    HttpResponse::Ok().json(json!({ "data": { "user": user }, "token": token }))
}

async fn signup() -> HttpResponse {
    HttpResponse::Created().json(json!({ "message": "Check your email to verify your account" }))
}

async fn verify_email(token: web::Path<String>) -> HttpResponse {
    match token.as_str() {
        "slow" => {
            actix_web::rt::time::sleep(Duration::from_secs(3)).await;
            HttpResponse::Ok().json(json!({ "message": "Email verified" }))
        }
        "bad" => HttpResponse::BadRequest().json(json!({ "message": "Invalid or expired token" })),
        _ => HttpResponse::Ok().json(json!({})),
    }
}

async fn me(req: HttpRequest) -> HttpResponse {
    match bearer(&req) {
        Some(_) => HttpResponse::Ok().json(json!({ "data": { "user": user_json("reader@example.com") } })),
        None => unauthorized(),
    }
}

async fn list_users(state: web::Data<MockState>, req: HttpRequest) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    if state.fail_users.load(Ordering::SeqCst) {
        return HttpResponse::InternalServerError().json(json!({ "message": "users down" }));
    }
    HttpResponse::Ok().json(json!({
        "data": [
            { "_id": "user-1", "name": "Reader Person", "email": "reader@example.com", "role": "user", "active": true },
            { "_id": "user-2", "name": "Second Reader", "email": "second@example.com", "role": "user", "active": false }
        ]
    }))
}

async fn user_action(req: HttpRequest, id: web::Path<String>) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    if id.as_str() == "missing" {
        return HttpResponse::NotFound().json(json!({ "message": "User not found" }));
    }
    HttpResponse::Ok().json(json!({ "message": "done" }))
}

async fn categories() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "data": [
            { "_id": "c1", "name": "Fiction", "slug": "fiction" },
            { "_id": "c2", "name": "History", "slug": "history" }
        ]
    }))
}

async fn admin_write(req: HttpRequest) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    HttpResponse::Ok().json(json!({}))
}

async fn delete_product(req: HttpRequest, id: web::Path<String>) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    HttpResponse::Ok().json(json!({ "message": format!("Book {} removed", id) }))
}

async fn book_comments(book_id: web::Path<String>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "comments": [{
            "_id": format!("cm-{}", book_id),
            "userId": { "_id": "user-2", "name": "Second Reader" },
            "comment": "Loved it",
            "rate": 4,
            "status": "approved"
        }]
    }))
}

async fn products() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "data": [
            { "_id": "p1", "title": "Dune", "author": "Frank Herbert", "description": "Spice",
              "price": 10.0, "quantity": 5, "category": { "_id": "c1", "name": "Fiction" } },
            { "_id": "p2", "title": "SPQR", "author": "Mary Beard", "description": "Rome",
              "price": 150.0, "quantity": 2, "category": { "_id": "c2", "name": "History" } }
        ]
    }))
}

async fn get_cart(state: web::Data<MockState>, req: HttpRequest) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    let request_number = state.cart_hits.fetch_add(1, Ordering::SeqCst) + 1;
    if state.fail_cart_fetch.load(Ordering::SeqCst) {
        return HttpResponse::InternalServerError().json(json!({ "message": "Cart unavailable" }));
    }
    let delay = state.cart_delays.lock().pop_front();
    if let Some(delay) = delay {
        actix_web::rt::time::sleep(delay).await;
    }

    let cart = state.cart.lock().clone();
    let items: Vec<Value> = cart
        .iter()
        .map(|e| {
            json!({
                "productId": e.product_id,
                "title": e.title,
                "author": "Someone",
                "price": e.price,
                "quantity": e.quantity,
                "subTotal": e.price * f64::from(e.quantity)
            })
        })
        .collect();
    let total_price: f64 = cart.iter().map(|e| e.price * f64::from(e.quantity)).sum();
    // totalQuantity echoes the request number so overlapping responses can be told apart.
    HttpResponse::Ok().json(json!({
        "data": { "cartItems": items, "totalPrice": total_price, "totalQuantity": request_number }
    }))
}

async fn add_to_cart(state: web::Data<MockState>, req: HttpRequest, body: web::Json<Value>) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    let product_id = body["productId"].as_str().unwrap_or_default().to_string();
    let quantity = body["quantity"].as_u64().unwrap_or(1) as u32;
    state.put_in_cart(&product_id, 10.0, quantity);
    HttpResponse::Ok().json(json!({ "message": "Added to cart" }))
}

async fn update_cart_item(
    state: web::Data<MockState>,
    req: HttpRequest,
    id: web::Path<String>,
    body: web::Json<Value>,
) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    let quantity = body["quantity"].as_u64().unwrap_or(0) as u32;
    let mut cart = state.cart.lock();
    match cart.iter_mut().find(|e| e.product_id == id.as_str()) {
        Some(entry) => {
            entry.quantity = quantity;
            HttpResponse::Ok().json(json!({ "message": "Cart updated" }))
        }
        None => HttpResponse::NotFound().json(json!({ "message": "Item not in cart" })),
    }
}

async fn remove_cart_item(state: web::Data<MockState>, req: HttpRequest, id: web::Path<String>) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    if state.fail_cart_delete.load(Ordering::SeqCst) {
        return HttpResponse::InternalServerError().json(json!({ "message": "Could not remove item" }));
    }
    state.cart.lock().retain(|e| e.product_id != id.as_str());
    HttpResponse::Ok().json(json!({ "message": "Item removed" }))
}

async fn get_wishlist(state: web::Data<MockState>, req: HttpRequest) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    let list = state.wishlist.lock().clone();
    let items: Vec<Value> = list
        .iter()
        .map(|id| json!({ "productId": id, "title": format!("Book {}", id), "author": "Someone" }))
        .collect();
    HttpResponse::Ok().json(json!({ "data": { "wishlistItems": items, "totalQuantity": list.len() } }))
}

async fn add_to_wishlist(state: web::Data<MockState>, req: HttpRequest, body: web::Json<Value>) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    let product_id = body["productId"].as_str().unwrap_or_default().to_string();
    let mut list = state.wishlist.lock();
    if !list.contains(&product_id) {
        list.push(product_id);
    }
    HttpResponse::Ok().json(json!({ "message": "Added to wishlist" }))
}

async fn remove_from_wishlist(state: web::Data<MockState>, req: HttpRequest, body: web::Json<Value>) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    let product_id = body["productId"].as_str().unwrap_or_default();
    state.wishlist.lock().retain(|id| id != product_id);
    HttpResponse::Ok().json(json!({ "message": "Removed from wishlist" }))
}

async fn check_comment(req: HttpRequest, book_id: web::Path<String>) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    HttpResponse::Ok().json(json!({
        "isBought": book_id.as_str() != "p2",
        "isReviewed": book_id.as_str() == "reviewed"
    }))
}

async fn create_comment(req: HttpRequest) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    HttpResponse::Created().json(json!({ "message": "Comment created" }))
}

async fn admin_comments(req: HttpRequest, query: web::Query<HashMap<String, String>>) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    let page: u32 = query.get("page").and_then(|p| p.parse().ok()).unwrap_or(1);
    let status = query.get("status").cloned().unwrap_or_else(|| "pending".to_string());
    HttpResponse::Ok().json(json!({
        "data": [{
            "_id": format!("cm-{}", page),
            "userId": { "_id": "user-1", "name": "Reader Person" },
            "bookId": { "_id": "p1", "title": "Dune", "author": "Frank Herbert" },
            "comment": "Great read",
            "rate": 5,
            "status": status
        }],
        "pagination": { "page": page, "totalPages": 3, "total": 25 }
    }))
}

async fn comment_admin_action(req: HttpRequest) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    HttpResponse::Ok().json(json!({ "message": "Comment updated" }))
}

async fn all_orders(state: web::Data<MockState>, req: HttpRequest) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    if state.fail_orders.load(Ordering::SeqCst) {
        return HttpResponse::InternalServerError().json(json!({ "message": "Orders unavailable" }));
    }
    HttpResponse::Ok().json(json!({
        "data": [
            { "_id": "o1", "orderNumber": "N-1", "userId": "user-2", "totalPrice": 20.0, "status": "paid" },
            { "_id": "o2", "userId": { "_id": "user-9", "name": "Embedded Buyer" }, "totalPrice": 35.5, "status": "pending" },
            { "_id": "o3", "userId": "ghost", "totalPrice": 5.0, "status": "paid" }
        ]
    }))
}

async fn orders_per_category(req: HttpRequest) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    HttpResponse::Ok().json(json!({
        "data": [{ "categoryid": "c1", "categoryname": "Fiction", "totalSold": 7 }]
    }))
}

async fn contact_messages(req: HttpRequest) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    HttpResponse::Ok().json(json!({
        "data": [{ "_id": "m1", "name": "Reader Person", "email": "reader@example.com", "message": "Please stock more poetry" }]
    }))
}

async fn send_contact(req: HttpRequest) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    HttpResponse::Created().json(json!({ "message": "Message sent" }))
}

async fn create_test_order(state: web::Data<MockState>, req: HttpRequest, body: web::Json<Value>) -> HttpResponse {
    if bearer(&req).is_none() {
        return unauthorized();
    }
    state.orders_created.fetch_add(1, Ordering::SeqCst);
    let total = body["totalPrice"].as_f64().unwrap_or(0.0);
    if total > 100.0 {
        return HttpResponse::Ok().json(json!({ "data": { "approvalUrl": "https://pay.example/approve/EC-1" } }));
    }
    state.cart.lock().clear();
    HttpResponse::Ok().json(json!({ "success": true, "message": "Order placed" }))
}

async fn confirm_payment(query: web::Query<HashMap<String, String>>) -> HttpResponse {
    match query.get("token").map(String::as_str) {
        Some("EC-OK") => HttpResponse::Ok().json(json!({ "success": true, "message": "Payment captured" })),
        Some("EC-DEFAULT") => HttpResponse::Ok().json(json!({ "success": true })),
        Some("EC-500") => HttpResponse::InternalServerError().json(json!({ "message": "Capture failed upstream" })),
        _ => HttpResponse::Ok().json(json!({ "success": false })),
    }
}

pub struct MockApi {
    pub state: Arc<MockState>,
    pub api_base: String,
    pub payment_base: String,
    handle: ServerHandle,
}

impl MockApi {
    pub fn config(&self) -> Config {
        Config::with_base_urls(&self.api_base, &self.payment_base)
    }

    pub fn storefront(&self) -> Storefront {
        self.storefront_with(self.config(), Arc::new(MemoryStore::new()))
    }

    pub fn storefront_with(&self, config: Config, store: Arc<dyn KeyValueStore>) -> Storefront {
        let shop = Storefront::new(&config, store).unwrap();
        shop.session().initialize();
        shop
    }

    pub async fn stop(self) {
        self.handle.stop(false).await;
    }
}

pub async fn start() -> MockApi {
    let state = Arc::new(MockState::default());
    let data = web::Data::from(state.clone());
    let log_state = state.clone();

    let server = HttpServer::new(move || {
        let log_state = log_state.clone();
        App::new()
            .app_data(data.clone())
            .wrap_fn(move |req, srv| {
                log_state
                    .requests
                    .lock()
                    .push(format!("{} {}", req.method(), req.path()));
                srv.call(req)
            })
            .service(
                web::scope("/api/v1")
                    .route("/auth/login", web::post().to(login))
                    .route("/auth/signup", web::post().to(signup))
                    .route("/auth/verifyEmail/{token}", web::get().to(verify_email))
                    .route("/users/me", web::get().to(me))
                    .route("/users", web::get().to(list_users))
                    .route("/users/deactivate/{id}", web::patch().to(user_action))
                    .route("/users/reactivate/{id}", web::patch().to(user_action))
                    .route("/users/changerole/{id}", web::post().to(user_action))
                    .route("/users/changePassword/{id}", web::patch().to(user_action))
                    .route("/users/{id}", web::patch().to(user_action))
                    .route("/categories", web::get().to(categories))
                    .route("/categories", web::post().to(admin_write))
                    .route("/categories/{id}", web::put().to(admin_write))
                    .route("/categories/{id}", web::delete().to(admin_write))
                    .route("/products", web::get().to(products))
                    .route("/products", web::post().to(admin_write))
                    .route("/products/{id}", web::put().to(admin_write))
                    .route("/products/{id}", web::delete().to(delete_product))
                    .route("/cart", web::get().to(get_cart))
                    .route("/cart", web::post().to(add_to_cart))
                    .route("/cart/{id}", web::patch().to(update_cart_item))
                    .route("/cart/{id}", web::delete().to(remove_cart_item))
                    .route("/wishlist", web::get().to(get_wishlist))
                    .route("/wishlist", web::post().to(add_to_wishlist))
                    .route("/wishlist", web::delete().to(remove_from_wishlist))
                    .route("/comments/check/{book_id}", web::get().to(check_comment))
                    .route("/comments/crea", web::post().to(create_comment))
                    .route("/comments/admin/comments", web::get().to(admin_comments))
                    .route("/comments/admin/comments/{id}", web::patch().to(comment_admin_action))
                    .route("/comments/{id}", web::get().to(book_comments))
                    .route("/comments/{id}", web::delete().to(comment_admin_action))
                    .route("/orders/all-orders", web::get().to(all_orders))
                    .route("/orders/noofordersincategory", web::get().to(orders_per_category))
                    .route("/contact", web::get().to(contact_messages))
                    .route("/contact", web::post().to(send_contact)),
            )
            .route("/buy/create-test-order", web::post().to(create_test_order))
            .route("/buy/confirm", web::get().to(confirm_payment))
    })
    .workers(1)
    .disable_signals()
    .bind("127.0.0.1:0")
    .unwrap();

    let addr = server.addrs()[0];
    let server = server.run();
    let handle = server.handle();
    actix_web::rt::spawn(server);

    MockApi {
        state,
        api_base: format!("http://{}/api/v1", addr),
        payment_base: format!("http://{}", addr),
        handle,
    }
}

/// Polls until the mock has received `count` cart fetches.
pub async fn wait_for_cart_hits(state: &MockState, count: usize) {
    for _ in 0..400 {
        if state.cart_hits.load(Ordering::SeqCst) >= count {
            return;
        }
        actix_web::rt::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("cart was fetched fewer than {} times", count);
}

pub async fn sign_in(shop: &Storefront, email: &str) {
    let form = novel_shelf::models::SignInForm {
        email: email.to_string(),
        password: "Strong#Pass1".to_string(),
    };
    shop.sign_in(&form, None).await.unwrap();
}
