//! Integration tests: the engine end to end against the paper exchange.

mod paper_book;
mod scenarios;
mod service;
