/// Trait for widgets that can provide debug information
///
/// Widgets implement this so their state can be dumped to the log
/// or shown in a debug view.
pub trait DebugInfoProvider {
    /// Generate a formatted string containing debug information about the widget's state
    fn debug_info(&self) -> String;

    /// Optional: Get a short one-line summary of the widget state
    fn debug_summary(&self) -> String {
        "No summary available".to_string()
    }
}
