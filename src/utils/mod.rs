pub mod codes;
pub mod currency;
