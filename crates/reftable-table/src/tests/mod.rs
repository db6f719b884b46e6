mod format_tests;
mod merge_tests;
mod reader_tests;
mod writer_tests;
