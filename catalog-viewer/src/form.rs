//! Add-product form
//!
//! Holds the raw text of each field, validates it into a `NewProduct`, and
//! tracks the open/submitting/error state of the modal.

use catalog_client::{CatalogApi, ClientResult, HttpClient};
use shared::{NewProduct, Product, ProductRecord, Rating};
use thiserror::Error;

/// Form errors, displayed verbatim above the fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum FormError {
    #[error("Please enter all fields with valid data.")]
    Invalid,

    #[error("Failed to add product. Please try again.")]
    SubmitFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Price,
    Description,
    Category,
    Image,
    Rating,
}

impl FormField {
    /// Fields in display order
    pub const ALL: [FormField; 6] = [
        FormField::Title,
        FormField::Price,
        FormField::Description,
        FormField::Category,
        FormField::Image,
        FormField::Rating,
    ];

    pub fn placeholder(self) -> &'static str {
        match self {
            FormField::Title => "Product Title",
            FormField::Price => "Product Price",
            FormField::Description => "Product Description",
            FormField::Category => "Product Category",
            FormField::Image => "Product Image URL",
            FormField::Rating => "Product Rating",
        }
    }

    pub fn next(self) -> Self {
        let i = self.index();
        Self::ALL[(i + 1) % Self::ALL.len()]
    }

    pub fn prev(self) -> Self {
        let i = self.index();
        Self::ALL[(i + Self::ALL.len() - 1) % Self::ALL.len()]
    }

    fn index(self) -> usize {
        Self::ALL.iter().position(|f| *f == self).unwrap_or(0)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AddProductForm {
    open: bool,
    submitting: bool,
    title: String,
    price: String,
    description: String,
    category: String,
    image: String,
    rating: String,
    error: Option<FormError>,
}

impl AddProductForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self) {
        self.open = true;
    }

    /// Close without clearing what was typed
    pub fn cancel(&mut self) {
        self.open = false;
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn is_submitting(&self) -> bool {
        self.submitting
    }

    pub fn error(&self) -> Option<FormError> {
        self.error
    }

    pub fn value(&self, field: FormField) -> &str {
        match field {
            FormField::Title => &self.title,
            FormField::Price => &self.price,
            FormField::Description => &self.description,
            FormField::Category => &self.category,
            FormField::Image => &self.image,
            FormField::Rating => &self.rating,
        }
    }

    pub fn set(&mut self, field: FormField, value: impl Into<String>) {
        let value = value.into();
        match field {
            FormField::Title => self.title = value,
            FormField::Price => self.price = value,
            FormField::Description => self.description = value,
            FormField::Category => self.category = value,
            FormField::Image => self.image = value,
            FormField::Rating => self.rating = value,
        }
    }

    /// Parse the fields into a product to submit
    ///
    /// Text fields must be non-blank; price and rating must parse as
    /// positive finite numbers. New products start with no reviews.
    pub fn validate(&self) -> Result<NewProduct, FormError> {
        let text = |value: &str| {
            let value = value.trim();
            (!value.is_empty()).then(|| value.to_string())
        };
        let positive = |value: &str| {
            value
                .trim()
                .parse::<f64>()
                .ok()
                .filter(|n| n.is_finite() && *n > 0.0)
        };

        Ok(NewProduct {
            title: text(&self.title).ok_or(FormError::Invalid)?,
            price: positive(&self.price).ok_or(FormError::Invalid)?,
            description: text(&self.description).ok_or(FormError::Invalid)?,
            category: text(&self.category).ok_or(FormError::Invalid)?,
            image: text(&self.image).ok_or(FormError::Invalid)?,
            rating: Rating::unreviewed(positive(&self.rating).ok_or(FormError::Invalid)?),
        })
    }

    /// Start a submission
    ///
    /// Returns the product to send, or `None` if the input is invalid (the
    /// error is recorded) or a submission is already running.
    pub fn begin_submit(&mut self) -> Option<NewProduct> {
        if self.submitting {
            return None;
        }
        match self.validate() {
            Ok(product) => {
                self.submitting = true;
                self.error = None;
                Some(product)
            }
            Err(err) => {
                tracing::debug!("Add product form rejected: {}", err);
                self.error = Some(err);
                None
            }
        }
    }

    /// Finish a submission started by [`begin_submit`](Self::begin_submit)
    ///
    /// On success the form is reset and closed and the product to add
    /// locally is returned. On failure the form stays open with its values.
    pub fn finish_submit(
        &mut self,
        product: NewProduct,
        result: &ClientResult<ProductRecord>,
    ) -> Option<Product> {
        self.submitting = false;
        match result {
            Ok(_) => {
                self.reset();
                Some(product.into_product())
            }
            Err(err) => {
                tracing::error!("Failed to add product: {}", err);
                self.error = Some(FormError::SubmitFailed);
                None
            }
        }
    }

    /// Validate, create through `api` and finish
    pub async fn submit<H: HttpClient + 'static>(&mut self, api: &CatalogApi<H>) -> Option<Product> {
        let product = self.begin_submit()?;
        let result = api.create_product(&product).await;
        self.finish_submit(product, &result)
    }

    /// Clear every field and close
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
