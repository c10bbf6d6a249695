pub mod ballot;
pub mod candidate;
pub mod db;
pub mod mongodb;
