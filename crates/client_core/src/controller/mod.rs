pub mod commands;
pub mod events;
pub mod reducer;
pub mod state;
