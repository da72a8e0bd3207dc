//! Product service (write side + single-product reads)
//!
//! Sellers list their own products; checkout is the only thing that
//! decrements stock (see [`crate::inventory`]).

mod sku;

pub use sku::{generate_sku, verify_sku};

use serde::{Deserialize, Serialize};
use shared::models::{Product, ProductCreate, ProductStatus, ProductUpdate};
use shared::{AppError, AppResult, ErrorCode};

use crate::auth::CurrentUser;
use crate::security_log;
use crate::storage::{MarketStorage, StorageError};
use crate::utils::validation::{
    MAX_DESCRIPTION_LEN, MAX_IMAGES, MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, MAX_TAGS,
    validate_optional_text, validate_price, validate_required_text,
};

/// Result of a like toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeState {
    pub liked: bool,
    pub like_count: usize,
}

#[derive(Debug, Clone)]
pub struct ProductService {
    storage: MarketStorage,
    seed: String,
}

impl ProductService {
    pub fn new(storage: MarketStorage, seed: impl Into<String>) -> Self {
        Self {
            storage,
            seed: seed.into(),
        }
    }

    /// Create a listing owned by `seller_id`
    pub fn create(&self, seller_id: &str, payload: ProductCreate) -> AppResult<Product> {
        validate_create(&payload)?;

        let quantity = payload.quantity.unwrap_or(1);
        if quantity == 0 {
            return Err(AppError::validation("quantity must be at least 1"));
        }

        let now = shared::util::now_millis();
        let mut product = Product {
            id: shared::util::snowflake_id(),
            sku: generate_sku(&payload.name, payload.category, &self.seed, now),
            name: payload.name.trim().to_string(),
            description: payload.description.trim().to_string(),
            price: payload.price,
            original_price: payload.original_price,
            category: payload.category,
            condition: payload.condition,
            images: payload.images,
            seller_id: seller_id.to_string(),
            status: ProductStatus::Available,
            quantity,
            location: payload.location,
            tags: payload.tags,
            view_count: 0,
            likes: Vec::new(),
            created_at: now,
            updated_at: now,
        };

        let txn = self.storage.begin_write()?;
        self.storage.insert_product(&txn, &mut product)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(product_id = product.id, sku = %product.sku, seller_id = %seller_id, "Product created");
        Ok(product)
    }

    /// Get a product, counting the view
    pub fn get(&self, id: i64) -> AppResult<Product> {
        let txn = self.storage.begin_write()?;
        let mut product = self
            .storage
            .get_product_txn(&txn, id)?
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;
        product.view_count = product.view_count.saturating_add(1);
        self.storage.put_product(&txn, &product)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(product)
    }

    /// Owner-only edit
    ///
    /// Status only changes when given explicitly, except that setting the
    /// quantity to 0 marks the product Sold.
    pub fn update(&self, user_id: &str, id: i64, update: ProductUpdate) -> AppResult<Product> {
        validate_update(&update)?;

        let txn = self.storage.begin_write()?;
        let mut product = self
            .storage
            .get_product_txn(&txn, id)?
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

        if product.seller_id != user_id {
            security_log!("WARN", "product_update_denied", user_id = user_id, product_id = id);
            return Err(AppError::with_message(
                ErrorCode::NotResourceOwner,
                "Not authorized to update this product",
            ));
        }

        if let Some(name) = update.name {
            product.name = name.trim().to_string();
        }
        if let Some(description) = update.description {
            product.description = description.trim().to_string();
        }
        if let Some(price) = update.price {
            product.price = price;
        }
        if update.original_price.is_some() {
            product.original_price = update.original_price;
        }
        if let Some(category) = update.category {
            product.category = category;
        }
        if let Some(condition) = update.condition {
            product.condition = condition;
        }
        if let Some(images) = update.images {
            product.images = images;
        }
        if let Some(location) = update.location {
            product.location = Some(location);
        }
        if let Some(tags) = update.tags {
            product.tags = tags;
        }
        if let Some(quantity) = update.quantity {
            product.quantity = quantity;
            if quantity == 0 && update.status.is_none() {
                product.status = ProductStatus::Sold;
            }
        }
        if let Some(status) = update.status {
            product.status = status;
        }
        product.updated_at = shared::util::now_millis();

        self.storage.put_product(&txn, &product)?;
        txn.commit().map_err(StorageError::from)?;
        Ok(product)
    }

    /// Owner or admin
    pub fn delete(&self, user: &CurrentUser, id: i64) -> AppResult<()> {
        let txn = self.storage.begin_write()?;
        let product = self
            .storage
            .get_product_txn(&txn, id)?
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

        if !user.can_manage(&product.seller_id) {
            security_log!("WARN", "product_delete_denied", user_id = user.id.as_str(), product_id = id);
            return Err(AppError::with_message(
                ErrorCode::NotResourceOwner,
                "Not authorized to delete this product",
            ));
        }

        self.storage.remove_product(&txn, id)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(product_id = id, user_id = %user.id, "Product deleted");
        Ok(())
    }

    /// Add or remove `user_id` from the product's likes
    pub fn toggle_like(&self, user_id: &str, id: i64) -> AppResult<LikeState> {
        let txn = self.storage.begin_write()?;
        let mut product = self
            .storage
            .get_product_txn(&txn, id)?
            .ok_or_else(|| AppError::new(ErrorCode::ProductNotFound))?;

        let liked = match product.likes.iter().position(|u| u == user_id) {
            Some(pos) => {
                product.likes.remove(pos);
                false
            }
            None => {
                product.likes.push(user_id.to_string());
                true
            }
        };
        self.storage.put_product(&txn, &product)?;
        txn.commit().map_err(StorageError::from)?;

        Ok(LikeState {
            liked,
            like_count: product.like_count(),
        })
    }
}

fn validate_create(payload: &ProductCreate) -> AppResult<()> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_required_text(&payload.description, "description", MAX_DESCRIPTION_LEN)?;
    validate_price(payload.price, "price")?;
    if let Some(original) = payload.original_price {
        validate_price(original, "originalPrice")?;
    }
    validate_optional_text(&payload.location, "location", MAX_SHORT_TEXT_LEN)?;
    validate_lists(Some(&payload.images), Some(&payload.tags))
}

fn validate_update(update: &ProductUpdate) -> AppResult<()> {
    if let Some(name) = &update.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    if let Some(description) = &update.description {
        validate_required_text(description, "description", MAX_DESCRIPTION_LEN)?;
    }
    if let Some(price) = update.price {
        validate_price(price, "price")?;
    }
    if let Some(original) = update.original_price {
        validate_price(original, "originalPrice")?;
    }
    validate_optional_text(&update.location, "location", MAX_SHORT_TEXT_LEN)?;
    validate_lists(update.images.as_ref(), update.tags.as_ref())
}

fn validate_lists(images: Option<&Vec<String>>, tags: Option<&Vec<String>>) -> AppResult<()> {
    if let Some(images) = images
        && images.len() > MAX_IMAGES
    {
        return Err(AppError::validation(format!("At most {MAX_IMAGES} images allowed")));
    }
    if let Some(tags) = tags {
        if tags.len() > MAX_TAGS {
            return Err(AppError::validation(format!("At most {MAX_TAGS} tags allowed")));
        }
        for tag in tags {
            validate_required_text(tag, "tag", MAX_SHORT_TEXT_LEN)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::{ProductCategory, ProductCondition};

    fn service() -> ProductService {
        ProductService::new(MarketStorage::open_in_memory().unwrap(), "default-seed")
    }

    fn payload() -> ProductCreate {
        ProductCreate {
            name: "Road Bike".into(),
            description: "Barely ridden".into(),
            price: Decimal::new(25000, 2),
            original_price: Some(Decimal::new(60000, 2)),
            category: ProductCategory::Sports,
            condition: ProductCondition::LikeNew,
            images: vec!["/img/bike.jpg".into()],
            quantity: None,
            location: Some("Berlin".into()),
            tags: vec!["bike".into()],
        }
    }

    fn user(id: &str, role: &str) -> CurrentUser {
        CurrentUser {
            id: id.into(),
            username: id.into(),
            role: role.into(),
        }
    }

    #[test]
    fn test_create_defaults() {
        let service = service();
        let product = service.create("seller", payload()).unwrap();

        assert_eq!(product.quantity, 1);
        assert_eq!(product.status, ProductStatus::Available);
        assert!(product.sku.starts_with("SPO-"));
        assert_eq!(product.seller_id, "seller");
    }

    #[test]
    fn test_create_validation() {
        let service = service();

        let mut bad = payload();
        bad.name = " ".into();
        assert_eq!(service.create("s", bad).unwrap_err().code, ErrorCode::ValidationFailed);

        let mut bad = payload();
        bad.price = Decimal::new(-1, 0);
        assert_eq!(service.create("s", bad).unwrap_err().code, ErrorCode::ProductInvalidPrice);

        let mut bad = payload();
        bad.quantity = Some(0);
        assert!(service.create("s", bad).is_err());

        let mut bad = payload();
        bad.images = vec!["x".into(); MAX_IMAGES + 1];
        assert!(service.create("s", bad).is_err());
    }

    #[test]
    fn test_get_counts_views() {
        let service = service();
        let id = service.create("s", payload()).unwrap().id;
        service.get(id).unwrap();
        assert_eq!(service.get(id).unwrap().view_count, 2);
        assert_eq!(service.get(id + 1).unwrap_err().code, ErrorCode::ProductNotFound);
    }

    #[test]
    fn test_update_owner_only_and_zero_quantity_sells_out() {
        let service = service();
        let id = service.create("s", payload()).unwrap().id;

        let err = service
            .update("intruder", id, ProductUpdate::default())
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotResourceOwner);

        let updated = service
            .update(
                "s",
                id,
                ProductUpdate {
                    quantity: Some(0),
                    price: Some(Decimal::new(20000, 2)),
                    ..Default::default()
                },
            )
            .unwrap();
        assert_eq!(updated.status, ProductStatus::Sold);
        assert_eq!(updated.price, Decimal::new(20000, 2));

        let restocked = service
            .update(
                "s",
                id,
                ProductUpdate {
                    quantity: Some(2),
                    status: Some(ProductStatus::Available),
                    ..Default::default()
                },
            )
            .unwrap();
        assert!(restocked.is_available());
    }

    #[test]
    fn test_delete_owner_or_admin() {
        let service = service();
        let a = service.create("s", payload()).unwrap().id;
        let b = service.create("s", payload()).unwrap().id;

        assert_eq!(
            service.delete(&user("other", "user"), a).unwrap_err().code,
            ErrorCode::NotResourceOwner
        );
        service.delete(&user("s", "user"), a).unwrap();
        service.delete(&user("root", "admin"), b).unwrap();
        assert_eq!(
            service.delete(&user("s", "user"), a).unwrap_err().code,
            ErrorCode::ProductNotFound
        );
    }

    #[test]
    fn test_toggle_like() {
        let service = service();
        let id = service.create("s", payload()).unwrap().id;

        let on = service.toggle_like("u1", id).unwrap();
        assert!(on.liked);
        assert_eq!(on.like_count, 1);

        service.toggle_like("u2", id).unwrap();
        let off = service.toggle_like("u1", id).unwrap();
        assert!(!off.liked);
        assert_eq!(off.like_count, 1);
    }
}
