mod vulkan;

use crate::app::vulkan::Context;
use anyhow::Result;
use std::sync::Arc;
use winit::{
    application::ApplicationHandler,
    dpi::LogicalSize,
    event::WindowEvent,
    event_loop::ActiveEventLoop,
    window::{Window, WindowAttributes, WindowId},
};

const WINDOW_TITLE: &str = "vkboot";
const WINDOW_WIDTH: u32 = 720;
const WINDOW_HEIGHT: u32 = 720;

#[derive(Default)]
pub struct App {
    // Declared before the window so it is also dropped first.
    context: Option<Context>,
    window: Option<Arc<Window>>,
    failure: Option<anyhow::Error>,
}

impl App {
    /// The error the bootstrap failed with, if it did. The event loop
    /// cannot return it, so `main` picks it up here after the loop
    /// exits.
    pub fn take_failure(&mut self) -> Option<anyhow::Error> {
        self.failure.take()
    }

    fn bootstrap(&mut self, event_loop: &ActiveEventLoop) -> Result<()> {
        let attributes = WindowAttributes::default()
            .with_title(WINDOW_TITLE)
            .with_inner_size(LogicalSize::new(WINDOW_WIDTH, WINDOW_HEIGHT))
            .with_resizable(false);
        let window = Arc::new(event_loop.create_window(attributes)?);

        // SAFETY: self keeps the window alive for as long as the
        // context exists; the context is always dropped first.
        let context = unsafe { Context::create(&window) }?;

        self.window = Some(window);
        self.context = Some(context);
        Ok(())
    }
}

impl ApplicationHandler for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.context.is_some() {
            return;
        }
        if let Err(error) = self.bootstrap(event_loop) {
            self.failure = Some(error);
            event_loop.exit();
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        window_id: WindowId,
        event: WindowEvent,
    ) {
        if self.window.as_ref().map(|w| w.id()) != Some(window_id) {
            return;
        }
        match event {
            WindowEvent::CloseRequested => {
                // tell the event loop to exit cleanly
                event_loop.exit();
            }
            _ => {}
        }
    }

    fn suspended(&mut self, _event_loop: &ActiveEventLoop) {
        self.context = None;
        self.window = None;
    }
}
