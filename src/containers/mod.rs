pub mod darray;
pub mod hash_table;

pub use darray::DArray;
pub use hash_table::HashTable;
