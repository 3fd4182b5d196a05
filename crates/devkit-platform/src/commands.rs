#[cfg(windows)]
const CREATE_NO_WINDOW: u32 = 0x0800_0000;

/// Suppresses the console window that Windows would otherwise flash for every
/// child process spawned from a GUI host.
pub trait HideWindow {
    fn hide_window(&mut self) -> &mut Self;

    fn hide_window_if(&mut self, hidden: bool) -> &mut Self {
        if hidden { self.hide_window() } else { self }
    }
}

impl HideWindow for tokio::process::Command {
    #[cfg(windows)]
    fn hide_window(&mut self) -> &mut Self {
        self.creation_flags(CREATE_NO_WINDOW)
    }

    #[cfg(not(windows))]
    fn hide_window(&mut self) -> &mut Self {
        self
    }
}
