pub mod banner;
pub mod progress;
pub mod tui;

pub use progress::CliProgress;
pub use tui::TuiInputPort;

/// Prints the welcome banner and applies the prompt theme for all subsequent inquire prompts.
/// Call once before the interactive menu.
pub fn init_ui() {
    banner::print_welcome();
    tui::apply_theme();
}
