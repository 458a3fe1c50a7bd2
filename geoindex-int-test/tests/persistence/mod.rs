//! Save/load tests against real files.

mod corrupted_file_test;
mod round_trip_test;
