//! Column names shared by the sources and the merged table

pub const ISBN: &str = "ISBN";
pub const BOOK_ID: &str = "BookID";
pub const AUTH_ID: &str = "AuthID";
pub const ORDER_ID: &str = "OrderID";
pub const TITLE: &str = "Title";
pub const FIRST_NAME: &str = "First Name";
pub const LAST_NAME: &str = "Last Name";

/// Tag column added to every sales record at load time
pub const QUARTER: &str = "Quarter";

/// Observed or synthetic rating
pub const RATING: &str = "Rating";

/// Per-record window count of records sharing the title
pub const TOTAL_SALES: &str = "Total Sales";
