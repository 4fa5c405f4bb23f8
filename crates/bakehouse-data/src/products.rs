//! Price list maintenance

use crate::{Product, insert_returning_id, require_text};
use bakehouse_core::{BakehouseError, ProcedureName, Result};
use bakehouse_gateway::{NoParams, ProcedureGateway, procedure_params};
use bigdecimal::BigDecimal;

const GET_PRODUCTS: ProcedureName = ProcedureName::new("dbo.GetProducts");
const GET_PRODUCT_BY_ID: ProcedureName = ProcedureName::new("dbo.GetProductById");
const INSERT_PRODUCT: ProcedureName = ProcedureName::new("dbo.InsertProduct");
const UPDATE_PRODUCT: ProcedureName = ProcedureName::new("dbo.UpdateProduct");
const DELETE_PRODUCT: ProcedureName = ProcedureName::new("dbo.DeleteProduct");

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price: BigDecimal,
}

procedure_params!(NewProduct {
    name => "Name",
    category => "Category",
    price => "Price",
});

#[derive(Debug, Clone, PartialEq)]
pub struct ProductUpdate {
    pub product_id: i64,
    pub name: String,
    pub category: String,
    pub price: BigDecimal,
    pub is_active: bool,
}

procedure_params!(ProductUpdate {
    product_id => "ProductId",
    name => "Name",
    category => "Category",
    price => "Price",
    is_active => "IsActive",
});

impl From<Product> for ProductUpdate {
    fn from(product: Product) -> Self {
        Self {
            product_id: product.product_id,
            name: product.name,
            category: product.category,
            price: product.price,
            is_active: product.is_active,
        }
    }
}

struct ProductKey {
    product_id: i64,
}

procedure_params!(ProductKey { product_id => "ProductId" });

#[derive(Debug, Clone)]
pub struct ProductData {
    gateway: ProcedureGateway,
}

impl ProductData {
    pub fn new(gateway: ProcedureGateway) -> Self {
        Self { gateway }
    }

    /// Every product, active or not, grouped by category
    pub async fn list(&self) -> Result<Vec<Product>> {
        self.gateway.load_many(GET_PRODUCTS, &NoParams).await
    }

    /// Products that can still be sold
    pub async fn list_active(&self) -> Result<Vec<Product>> {
        let mut products = self.list().await?;
        products.retain(|p| p.is_active);
        Ok(products)
    }

    pub async fn get(&self, product_id: i64) -> Result<Option<Product>> {
        self.gateway
            .load_first(GET_PRODUCT_BY_ID, &ProductKey { product_id })
            .await
    }

    /// Add a product and return its id
    pub async fn insert(&self, product: &NewProduct) -> Result<i64> {
        require_text("product name", &product.name)?;
        check_price(&product.price)?;
        let id = insert_returning_id(&self.gateway, INSERT_PRODUCT, product).await?;
        tracing::info!(product_id = id, name = %product.name, "product added");
        Ok(id)
    }

    pub async fn update(&self, product: &ProductUpdate) -> Result<()> {
        require_text("product name", &product.name)?;
        check_price(&product.price)?;
        self.gateway.execute(UPDATE_PRODUCT, product).await
    }

    /// Withdraw a product from sale. Past sales and order lines keep their
    /// reference to it.
    pub async fn delete(&self, product_id: i64) -> Result<()> {
        self.gateway
            .execute(DELETE_PRODUCT, &ProductKey { product_id })
            .await?;
        tracing::info!(product_id, "product withdrawn");
        Ok(())
    }
}

fn check_price(price: &BigDecimal) -> Result<()> {
    if *price < BigDecimal::from(0) {
        return Err(BakehouseError::InvalidInput(format!(
            "price must not be negative, got {}",
            price
        )));
    }
    Ok(())
}
