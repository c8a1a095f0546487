use winit::event::ElementState;
use winit::keyboard::KeyCode;

/// Window size bound to `-`.
pub const SMALL: (u32, u32) = (800, 600);

/// Window size bound to `=`.
pub const LARGE: (u32, u32) = (1200, 900);

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Command {
    ResizeWindow { width: u32, height: u32 },
    Quit,
}

/// Maps a key event to a demo command. Repeats and releases map to nothing.
pub fn command_for(key: KeyCode, state: ElementState, repeat: bool) -> Option<Command> {
    if state != ElementState::Pressed || repeat {
        return None;
    }

    match key {
        KeyCode::Minus | KeyCode::NumpadSubtract => {
            Some(Command::ResizeWindow { width: SMALL.0, height: SMALL.1 })
        }
        KeyCode::Equal | KeyCode::NumpadAdd => {
            Some(Command::ResizeWindow { width: LARGE.0, height: LARGE.1 })
        }
        KeyCode::Escape => Some(Command::Quit),
        _ => None,
    }
}
