pub mod records;
pub mod report;
