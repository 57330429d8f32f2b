use serde::{Deserialize, Serialize};

/// A (product name, price) pair taken from the product page at one point in time.
///
/// Either field is `None` when the page did not contain it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub product_name: Option<String>,
    pub price: Option<f64>,
}

impl Reading {
    pub fn new(product_name: impl Into<String>, price: Option<f64>) -> Self {
        Self {
            product_name: Some(product_name.into()),
            price,
        }
    }
}
