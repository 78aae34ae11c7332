pub mod wide;
