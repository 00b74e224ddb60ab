//! Create, read, list, update and delete across the nine entity kinds.

mod read_tests;
mod update_tests;
