//! Console host - prints every surface event for testing and debugging

use colored::*;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::context::SurfaceContext;
use crate::error::DeviceError;
use crate::geometry::PositionId;

/// ConsoleContext prints host events to stdout
///
/// Useful for checking a device script or geometry table without a real
/// host application attached.
pub struct ConsoleContext {
    surface_id: String,
    event_count: AtomicU64,
}

impl ConsoleContext {
    pub fn new(surface_id: impl Into<String>) -> Self {
        Self {
            surface_id: surface_id.into(),
            event_count: AtomicU64::new(0),
        }
    }

    /// Number of events printed so far
    pub fn event_count(&self) -> u64 {
        self.event_count.load(Ordering::Relaxed)
    }

    fn print(&self, action: ColoredString, detail: String) {
        let n = self.event_count.fetch_add(1, Ordering::Relaxed) + 1;
        println!(
            "[{}] {} {:<13} {} {}",
            chrono::Local::now().format("%H:%M:%S%.3f"),
            self.surface_id.dimmed(),
            action,
            detail,
            format!("#{}", n).dimmed()
        );
    }
}

impl SurfaceContext for ConsoleContext {
    fn key_down(&self, id: PositionId) {
        self.print("key-down".green(), id.to_string());
    }

    fn key_up(&self, id: PositionId) {
        self.print("key-up".yellow(), id.to_string());
    }

    fn rotate_left(&self, id: PositionId) {
        self.print("rotate-left".cyan(), id.to_string());
    }

    fn rotate_right(&self, id: PositionId) {
        self.print("rotate-right".cyan(), id.to_string());
    }

    fn send_variable_value(&self, variable: &str, value: i32) {
        self.print("variable".magenta(), format!("{} = {}", variable, value));
    }

    fn disconnect(&self, cause: DeviceError) {
        self.print("disconnect".red().bold(), cause.to_string());
    }
}
