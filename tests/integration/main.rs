//! Integration tests
//!
//! `router_tests` drive the real router in-process and need no database.
//! `api_tests` talk to a running server and are ignored by default.

mod api_tests;
mod router_tests;
