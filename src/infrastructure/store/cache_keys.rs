use crate::core::models::Asin;

pub const DATA_PREFIX: &str = "data:";

pub fn product_data_key(asin: &Asin) -> String {
    format!("{}{}", DATA_PREFIX, asin)
}
