pub mod seat_search;
pub mod zip_lookup;
