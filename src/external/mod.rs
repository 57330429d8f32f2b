pub mod page_parser;
pub mod product_page;
pub mod reading_source;
pub mod twilio;
