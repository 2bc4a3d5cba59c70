//! API tests over the memory store, and PostgreSQL backend tests that need a live server

mod api_tests;
mod common;
mod loans;
mod postgres;
