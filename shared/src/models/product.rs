//! Product Model

use serde::{Deserialize, Serialize};

/// Review summary attached to a product
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Average rating, 0 when unknown
    #[serde(default)]
    pub rate: f64,
    /// Number of reviews, 0 for products the service has not persisted
    #[serde(default)]
    pub count: u32,
}

impl Rating {
    pub fn new(rate: f64, count: u32) -> Self {
        Self { rate, count }
    }

    /// Rating for a freshly created product (no reviews yet)
    pub fn unreviewed(rate: f64) -> Self {
        Self { rate, count: 0 }
    }

    /// Display label, e.g. `4 (2 reviews)`
    pub fn label(&self) -> String {
        format!("{} ({} reviews)", self.rate, self.count)
    }
}

/// Product entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    /// Assigned by the remote service; absent for local-only additions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub title: String,
    pub price: f64,
    pub description: String,
    pub category: String,
    /// Image URL
    pub image: String,
    #[serde(default)]
    pub rating: Rating,
}

impl Product {
    /// Price label, e.g. `$10` or `$109.95`
    pub fn price_label(&self) -> String {
        format!("${}", self.price)
    }

    /// Whether every displayed field is populated
    pub fn is_displayable(&self) -> bool {
        !self.title.is_empty()
            && self.price > 0.0
            && !self.description.is_empty()
            && !self.category.is_empty()
            && !self.image.is_empty()
    }

    /// Same product content, ignoring `id` and `rating`
    pub fn same_content(&self, other: &Product) -> bool {
        self.title == other.title
            && self.price == other.price
            && self.description == other.description
            && self.category == other.category
            && self.image == other.image
    }

    /// Overwrite the fields present in `update`
    pub fn apply(&mut self, update: &ProductUpdate) {
        if let Some(title) = &update.title {
            self.title = title.clone();
        }
        if let Some(price) = update.price {
            self.price = price;
        }
        if let Some(description) = &update.description {
            self.description = description.clone();
        }
        if let Some(category) = &update.category {
            self.category = category.clone();
        }
        if let Some(image) = &update.image {
            self.image = image.clone();
        }
        if let Some(rating) = update.rating {
            self.rating = rating;
        }
    }
}

/// Create product payload (a product without an id)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProduct {
    pub title: String,
    pub price: f64,
    pub description: String,
    pub category: String,
    pub image: String,
    pub rating: Rating,
}

impl NewProduct {
    /// Local representation before the service assigns an id
    pub fn into_product(self) -> Product {
        Product {
            id: None,
            title: self.title,
            price: self.price,
            description: self.description,
            category: self.category,
            image: self.image,
            rating: self.rating,
        }
    }
}

/// Update product payload
///
/// Only the fields that are set are sent, so `{ "price": 20 }` is a valid
/// partial replace.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
}

impl ProductUpdate {
    /// Price-only update
    pub fn price(price: f64) -> Self {
        Self {
            price: Some(price),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.price.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.image.is_none()
            && self.rating.is_none()
    }
}

/// Product as echoed back by the service after a mutation
///
/// The demo service does not always echo full products (a price-only PUT
/// comes back as `{"id":1,"price":20}`), so every field is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(flatten)]
    pub fields: ProductUpdate,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Product {
        Product {
            id: Some(1),
            title: "A".to_string(),
            price: 10.0,
            description: "desc".to_string(),
            category: "cat".to_string(),
            image: "https://img.example/a.png".to_string(),
            rating: Rating::new(4.0, 2),
        }
    }

    #[test]
    fn test_labels() {
        let mut product = sample();
        assert_eq!(product.price_label(), "$10");
        assert_eq!(product.rating.label(), "4 (2 reviews)");

        product.price = 109.95;
        product.rating = Rating::new(3.9, 120);
        assert_eq!(product.price_label(), "$109.95");
        assert_eq!(product.rating.label(), "3.9 (120 reviews)");
    }

    #[test]
    fn test_missing_rating_defaults_to_zero() {
        let json = r#"{"id":3,"title":"T","price":5,"description":"d","category":"c","image":"i"}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert_eq!(product.id, Some(3));
        assert_eq!(product.rating, Rating::default());
        assert_eq!(product.rating.rate, 0.0);
    }

    #[test]
    fn test_local_product_omits_id() {
        let local = NewProduct {
            title: "New".to_string(),
            price: 12.5,
            description: "d".to_string(),
            category: "c".to_string(),
            image: "i".to_string(),
            rating: Rating::unreviewed(4.5),
        }
        .into_product();

        let value = serde_json::to_value(&local).unwrap();
        assert!(value.get("id").is_none());
        assert_eq!(value["rating"]["count"], 0);
    }

    #[test]
    fn test_partial_update_serializes_only_set_fields() {
        let update = ProductUpdate::price(20.0);
        assert_eq!(serde_json::to_string(&update).unwrap(), r#"{"price":20.0}"#);
        assert!(!update.is_empty());
        assert!(ProductUpdate::default().is_empty());
    }

    #[test]
    fn test_apply_update_overwrites_present_fields() {
        let mut product = sample();
        let update = ProductUpdate {
            title: Some("B".to_string()),
            price: Some(20.0),
            ..Default::default()
        };
        product.apply(&update);

        assert_eq!(product.title, "B");
        assert_eq!(product.price, 20.0);
        assert_eq!(product.category, "cat");
        assert_eq!(product.rating, Rating::new(4.0, 2));
    }

    #[test]
    fn test_partial_record_from_service() {
        let record: ProductRecord = serde_json::from_str(r#"{"id":1,"price":20}"#).unwrap();
        assert_eq!(record.id, Some(1));
        assert_eq!(record.fields.price, Some(20.0));
        assert!(record.fields.title.is_none());
    }

    #[test]
    fn test_same_content_ignores_id_and_rating() {
        let remote = sample();
        let mut local = sample();
        local.id = None;
        local.rating = Rating::unreviewed(1.0);
        assert!(remote.same_content(&local));

        local.price = 11.0;
        assert!(!remote.same_content(&local));
    }
}
