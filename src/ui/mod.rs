// UI module - Console front end
//
// This module contains:
// - ConsoleController: Menu loop and play modes wired to state management,
//   the word repository, game rules and speech

pub mod console;

pub use console::ConsoleController;
