pub mod double;
pub mod reducer;
pub mod state;
