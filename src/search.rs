//! Hard-coded product search on a retail site, without a model in the loop.
//!
//! Unlike the goal executor this flow stops at the first failed stage:
//! the later stages cannot succeed without the earlier ones.

use serde::Serialize;
use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::AgentConfig;
use crate::hands::Page;
use crate::primitives::{safe_click, safe_fill, safe_get_text, safe_goto};

pub const STORE_URL: &str = "https://www.amazon.com";
pub const SEARCH_BOX: &str = "#twotabsearchtextbox";
pub const SEARCH_BUTTON: &str = "#nav-search-submit-button";
pub const RESULT_TITLE: &str = "[data-component-type='s-search-result'] h2";
pub const RESULT_PRICE: &str = ".a-price-whole";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Product {
    pub name: String,
    pub price: String,
}

pub struct ProductSearch<'a, P: ?Sized> {
    page: &'a P,
    config: &'a AgentConfig,
}

impl<'a, P: Page + ?Sized> ProductSearch<'a, P> {
    pub fn new(page: &'a P, config: &'a AgentConfig) -> Self {
        Self { page, config }
    }

    /// Open the store, type `product` into the search box and submit.
    pub async fn search(&self, product: &str) -> bool {
        info!("[Search] Looking for: {}", product);

        if !safe_goto(self.page, STORE_URL, self.config.nav_timeout).await {
            return false;
        }
        sleep(self.config.settle_delay).await;

        if !safe_fill(self.page, SEARCH_BOX, product, self.config.action_timeout).await {
            return false;
        }
        if !safe_click(self.page, SEARCH_BUTTON, self.config.action_timeout).await {
            return false;
        }
        sleep(self.config.settle_delay).await;

        info!("[Search] Search completed!");
        true
    }

    /// Name and price of the first result on the current results page.
    pub async fn first_product(&self) -> Option<Product> {
        info!("[Extract] Getting product information...");

        let name = safe_get_text(self.page, RESULT_TITLE, self.config.action_timeout).await;
        let name = match name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                warn!("[Extract] Could not find product name");
                return None;
            }
        };

        let Some(price) = safe_get_text(self.page, RESULT_PRICE, self.config.action_timeout).await
        else {
            warn!("[Extract] Could not find product price");
            return None;
        };

        let product = Product {
            name,
            price: price.trim().to_string(),
        };
        info!("[Extract] Found product: {}", product.name);
        info!("[Extract] Price: ${}", product.price);
        Some(product)
    }
}
