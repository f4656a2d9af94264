//! Product Repository

use super::{RepoError, RepoResult, validate_cash_amount, validate_positive_amount};
use crate::store::{Collection, LocalStore, StoreError};
use shared::models::{Product, StockMovement, StockMovementKind, SyncStatus};
use shared::util;

#[derive(Debug, Clone)]
pub struct ProductCreate {
    pub name: String,
    pub barcode: Option<String>,
    pub category_id: Option<String>,
    pub brand_id: Option<String>,
    pub supplier_id: Option<String>,
    pub price: f64,
    pub cost: f64,
    pub stock: f64,
}

#[derive(Debug, Clone, Default)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub barcode: Option<String>,
    pub category_id: Option<String>,
    pub brand_id: Option<String>,
    pub supplier_id: Option<String>,
    pub price: Option<f64>,
    pub cost: Option<f64>,
}

#[derive(Clone)]
pub struct ProductRepository {
    store: LocalStore,
}

impl ProductRepository {
    pub fn new(store: LocalStore) -> Self {
        Self { store }
    }

    pub fn find_by_id(&self, id: &str) -> RepoResult<Option<Product>> {
        Ok(self.store.get(Collection::Products, id)?)
    }

    pub fn find_all(&self) -> RepoResult<Vec<Product>> {
        let mut products: Vec<Product> = self.store.get_all(Collection::Products)?;
        products.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(products)
    }

    pub fn create(&self, data: ProductCreate) -> RepoResult<Product> {
        if data.name.trim().is_empty() {
            return Err(RepoError::Validation("Product name is required".into()));
        }
        validate_cash_amount(data.price, "Price")?;
        validate_cash_amount(data.cost, "Cost")?;

        let product = Product {
            id: util::record_id(),
            name: data.name.trim().to_string(),
            barcode: data.barcode,
            category_id: data.category_id,
            brand_id: data.brand_id,
            supplier_id: data.supplier_id,
            price: data.price,
            cost: data.cost,
            stock: data.stock,
            active: true,
            deleted: false,
            sync_status: SyncStatus::Pending,
            synced_at: None,
        };
        self.store.put(Collection::Products, &product)?;
        Ok(product)
    }

    pub fn update(&self, id: &str, data: ProductUpdate) -> RepoResult<Product> {
        if let Some(price) = data.price {
            validate_cash_amount(price, "Price")?;
        }
        if let Some(cost) = data.cost {
            validate_cash_amount(cost, "Cost")?;
        }

        let txn = self.store.begin_write()?;
        let mut product: Product = self
            .store
            .get_in(&txn, Collection::Products, id)?
            .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))?;

        if let Some(name) = data.name {
            product.name = name;
        }
        if let Some(barcode) = data.barcode {
            product.barcode = Some(barcode);
        }
        if let Some(category_id) = data.category_id {
            product.category_id = Some(category_id);
        }
        if let Some(brand_id) = data.brand_id {
            product.brand_id = Some(brand_id);
        }
        if let Some(supplier_id) = data.supplier_id {
            product.supplier_id = Some(supplier_id);
        }
        if let Some(price) = data.price {
            product.price = price;
        }
        if let Some(cost) = data.cost {
            product.cost = cost;
        }
        product.sync_status = SyncStatus::Pending;
        product.synced_at = None;
        self.store.put_in(&txn, Collection::Products, &product)?;
        txn.commit().map_err(StoreError::from)?;
        Ok(product)
    }

    /// Flag the product out of the catalog. It stays in every store — the
    /// upload pass mirrors it as `active=false` instead of removing it.
    pub fn soft_delete(&self, id: &str) -> RepoResult<Product> {
        let txn = self.store.begin_write()?;
        let mut product: Product = self
            .store
            .get_in(&txn, Collection::Products, id)?
            .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))?;
        product.deleted = true;
        product.active = false;
        product.sync_status = SyncStatus::Pending;
        product.synced_at = None;
        self.store.put_in(&txn, Collection::Products, &product)?;
        txn.commit().map_err(StoreError::from)?;
        tracing::info!(product_id = %id, "product soft-deleted");
        Ok(product)
    }

    /// Change stock by `delta` and write the matching kardex entry in the
    /// same transaction.
    pub fn adjust_stock(
        &self,
        id: &str,
        delta: f64,
        kind: StockMovementKind,
        reference: Option<String>,
    ) -> RepoResult<Product> {
        validate_positive_amount(delta.abs(), "Stock adjustment")?;

        let txn = self.store.begin_write()?;
        let mut product: Product = self
            .store
            .get_in(&txn, Collection::Products, id)?
            .ok_or_else(|| RepoError::NotFound(format!("Product {id} not found")))?;
        product.stock += delta;
        product.sync_status = SyncStatus::Pending;
        product.synced_at = None;
        self.store.put_in(&txn, Collection::Products, &product)?;

        self.store.put_in(
            &txn,
            Collection::Movements,
            &StockMovement {
                id: util::record_id(),
                product_id: id.to_string(),
                kind,
                quantity: delta.abs(),
                date: util::now(),
                reference,
                sync_status: SyncStatus::Pending,
                synced_at: None,
            },
        )?;
        txn.commit().map_err(StoreError::from)?;
        Ok(product)
    }
}
