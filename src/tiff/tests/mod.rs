//! Unit tests for the TIFF module

mod test_utils;
mod byte_order_tests;
mod reader_tests;
