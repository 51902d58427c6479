pub mod cache;
pub mod census;
pub mod dashboard;
pub mod workbook;
