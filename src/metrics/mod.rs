pub mod classification;
pub mod regression;
