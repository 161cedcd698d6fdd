//! Form checks run before anything is sent. A form with errors never reaches the network.

use std::fmt;

use lazy_static::lazy_static;
use regex::Regex;

use crate::models::{ChangePasswordForm, FileUpload, ProductForm, ReviewDraft, SignInForm, SignUpForm};

lazy_static! {
    static ref EMAIL: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
    static ref LOWERCASE: Regex = Regex::new(r"[a-z]").unwrap();
    static ref UPPERCASE: Regex = Regex::new(r"[A-Z]").unwrap();
    static ref NUMBER: Regex = Regex::new(r"[0-9]").unwrap();
    static ref SPECIAL_CHAR: Regex = Regex::new(r#"[!@#$%^&*(),.?":{}|<>]"#).unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: String,
}

/// First failing rule per field, in form order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors {
    errors: Vec<FieldError>,
}

impl ValidationErrors {
    pub fn new() -> ValidationErrors {
        ValidationErrors::default()
    }

    pub fn add(&mut self, field: &'static str, message: impl Into<String>) {
        if self.field(field).is_none() {
            self.errors.push(FieldError {
                field,
                message: message.into(),
            });
        }
    }

    pub fn field(&self, field: &str) -> Option<&str> {
        self.errors
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.message.as_str())
    }

    pub fn errors(&self) -> &[FieldError] {
        &self.errors
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered: Vec<String> = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect();
        f.write_str(&rendered.join("; "))
    }
}

fn char_len(value: &str) -> usize {
    value.chars().count()
}

pub fn is_valid_email(value: &str) -> bool {
    EMAIL.is_match(value)
}

/// Character-class rules shared by sign-up and password change.
fn check_password_classes(errors: &mut ValidationErrors, field: &'static str, value: &str) {
    if !LOWERCASE.is_match(value) {
        errors.add(field, "password must contain at least one lowercase letter");
    }
    if !UPPERCASE.is_match(value) {
        errors.add(field, "password must contain at least one uppercase letter");
    }
    if !NUMBER.is_match(value) {
        errors.add(field, "password must contain at least one number");
    }
    if !SPECIAL_CHAR.is_match(value) {
        errors.add(field, "password must contain at least one special character");
    }
}

pub fn validate_sign_up(form: &SignUpForm) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let name_len = char_len(&form.name);
    if name_len == 0 {
        errors.add("name", "name is required");
    } else if name_len < 3 {
        errors.add("name", "name should be at least 3");
    } else if name_len > 32 {
        errors.add("name", "name should be less than 32");
    }

    if !is_valid_email(&form.email) {
        errors.add("email", "please include valid email");
    }

    let password_len = char_len(&form.password);
    if password_len < 8 {
        errors.add("password", "password should be 8 at least");
    } else if password_len > 32 {
        errors.add("password", "password should be less than 32");
    }
    check_password_classes(&mut errors, "password", &form.password);

    let confirm_len = char_len(&form.confirm_password);
    if confirm_len < 6 {
        errors.add(
            "confirmPassword",
            "Confirm Password must be at least 6 characters long",
        );
    } else if confirm_len > 32 {
        errors.add(
            "confirmPassword",
            "Confirm Password must be less than 32 characters long",
        );
    }

    // The cross-field check only runs once every field is individually valid.
    if errors.is_empty() && form.password != form.confirm_password {
        errors.add("confirmPassword", "Passwords do not match");
    }

    errors.into_result()
}

pub fn validate_sign_in(form: &SignInForm) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if !is_valid_email(&form.email) {
        errors.add("email", "Invalid email address");
    }
    errors.into_result()
}

pub fn validate_change_password(form: &ChangePasswordForm) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    if form.current_password.is_empty() {
        errors.add("currentPassword", "please include your password");
    }

    let new_len = char_len(&form.new_password);
    if new_len < 8 {
        errors.add("newPassword", "password should be at least 8 characters");
    } else if new_len > 20 {
        errors.add("newPassword", "password should be at most 20 characters");
    }
    check_password_classes(&mut errors, "newPassword", &form.new_password);

    if errors.is_empty() && form.new_password != form.confirm_password {
        errors.add("confirmPassword", "Passwords do not match");
    }

    errors.into_result()
}

pub fn validate_display_name(name: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let trimmed = name.trim();
    if trimmed.is_empty() {
        errors.add("name", "name can't be empty");
    } else if char_len(trimmed) < 6 {
        errors.add("name", "name should be at least 6 characters");
    }
    errors.into_result()
}

pub fn validate_contact_message(message: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let len = char_len(message);
    if len < 10 {
        errors.add("message", "message should be at least 10 characters");
    } else if len > 500 {
        errors.add("message", "message should be at most 500 characters");
    }
    errors.into_result()
}

pub fn validate_review(draft: &ReviewDraft) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if draft.comment.trim().is_empty() {
        errors.add("comment", "please write a comment");
    }
    if draft.rating < 1 {
        errors.add("rate", "please choose a rating");
    } else if draft.rating > 5 {
        errors.add("rate", "rating should be between 1 and 5");
    }
    errors.into_result()
}

pub fn validate_cart_quantity(quantity: u32) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if quantity < 1 {
        errors.add("quantity", "quantity must be at least 1");
    }
    errors.into_result()
}

pub fn validate_category_name(name: &str) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if name.trim().is_empty() {
        errors.add("name", "category name is required");
    }
    errors.into_result()
}

fn check_required_text(
    errors: &mut ValidationErrors,
    field: &'static str,
    value: &Option<String>,
    message: &str,
) {
    if value.as_deref().map_or(true, str::is_empty) {
        errors.add(field, message);
    }
}

fn check_image(errors: &mut ValidationErrors, upload: &FileUpload) {
    if !upload.content_type.starts_with("image/") {
        errors.add("imageCover", "image cover must be an image");
    }
}

fn check_pdf(errors: &mut ValidationErrors, upload: &FileUpload) {
    if upload.content_type != "application/pdf" {
        errors.add("pdfLink", "file must be a PDF");
    }
}

fn check_amounts(errors: &mut ValidationErrors, form: &ProductForm) {
    if matches!(form.price, Some(price) if price < 0.0 || price.is_nan()) {
        errors.add("price", "price must be positive");
    }
    if matches!(form.quantity, Some(quantity) if quantity < 0) {
        errors.add("quantity", "quantity must be positive");
    }
}

pub fn validate_new_product(form: &ProductForm) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    check_required_text(&mut errors, "title", &form.title, "title is required");
    check_required_text(&mut errors, "author", &form.author, "author name is required");
    check_required_text(
        &mut errors,
        "description",
        &form.description,
        "description is required",
    );
    if form.price.is_none() {
        errors.add("price", "price is required");
    }
    if form.quantity.is_none() {
        errors.add("quantity", "quantity is required");
    }
    check_amounts(&mut errors, form);
    check_required_text(&mut errors, "category", &form.category, "category is required");

    match &form.image_cover {
        Some(image) => check_image(&mut errors, image),
        None => errors.add("imageCover", "Image is required"),
    }
    match &form.pdf {
        Some(pdf) => check_pdf(&mut errors, pdf),
        None => errors.add("pdfLink", "PDF file is required"),
    }

    errors.into_result()
}

/// Every field is optional on edit; whatever is present must still make sense.
pub fn validate_product_edit(form: &ProductForm) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    check_amounts(&mut errors, form);
    if let Some(image) = &form.image_cover {
        check_image(&mut errors, image);
    }
    if let Some(pdf) = &form.pdf {
        check_pdf(&mut errors, pdf);
    }
    errors.into_result()
}
