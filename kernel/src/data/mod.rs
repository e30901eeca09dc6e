pub mod page_table;
pub mod process;
pub mod shadow;
