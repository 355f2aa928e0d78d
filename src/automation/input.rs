//! Mouse and keyboard input simulation.
//!
//! The engine only needs two things: click a screen point and press a key.
//! [`InputDevice`] is that seam; [`SystemInput`] implements it with
//! `SendInput` on Windows, which simulates hardware-level input (it moves the
//! real cursor).

use anyhow::Result;

use crate::automation::detection::ScreenRegion;

/// Keys the automation sends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Key {
    /// Leaves fullscreen playback
    Escape,
}

pub trait InputDevice: Send + Sync {
    /// Moves the pointer to screen coordinates (x, y) and left-clicks.
    fn click(&self, x: i32, y: i32) -> Result<()>;

    /// Presses and releases one key.
    fn key_press(&self, key: Key) -> Result<()>;
}

/// Clicks the middle of a located region.
pub fn click_center_of(input: &dyn InputDevice, region: &ScreenRegion) -> Result<()> {
    let (x, y) = region.center();
    input.click(x, y)
}

pub fn press_key(input: &dyn InputDevice, key: Key) -> Result<()> {
    input.key_press(key)
}

/// Input backend for the current platform.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemInput;

#[cfg(windows)]
mod platform {
    use anyhow::{Result, anyhow};
    use std::time::Duration;

    use windows::Win32::UI::Input::KeyboardAndMouse::{
        INPUT, INPUT_0, INPUT_KEYBOARD, INPUT_MOUSE, KEYBDINPUT, KEYEVENTF_KEYUP,
        MOUSEEVENTF_ABSOLUTE, MOUSEEVENTF_LEFTDOWN, MOUSEEVENTF_LEFTUP, MOUSEEVENTF_MOVE,
        MOUSE_EVENT_FLAGS, MOUSEEVENTF_VIRTUALDESK, MOUSEINPUT, SendInput, VIRTUAL_KEY, VK_ESCAPE,
    };
    use windows::Win32::UI::WindowsAndMessaging::{
        GetSystemMetrics, SM_CXVIRTUALSCREEN, SM_CYVIRTUALSCREEN, SM_XVIRTUALSCREEN,
        SM_YVIRTUALSCREEN,
    };

    use super::{InputDevice, Key, SystemInput};

    fn virtual_key(key: Key) -> VIRTUAL_KEY {
        match key {
            Key::Escape => VK_ESCAPE,
        }
    }

    fn send(inputs: &[INPUT]) -> Result<()> {
        let sent = unsafe { SendInput(inputs, std::mem::size_of::<INPUT>() as i32) };
        if sent as usize != inputs.len() {
            return Err(anyhow!(
                "SendInput delivered {} of {} events",
                sent,
                inputs.len()
            ));
        }
        Ok(())
    }

    fn mouse_event(norm_x: i32, norm_y: i32, flags: MOUSE_EVENT_FLAGS) -> INPUT {
        INPUT {
            r#type: INPUT_MOUSE,
            Anonymous: INPUT_0 {
                mi: MOUSEINPUT {
                    dx: norm_x,
                    dy: norm_y,
                    dwFlags: flags | MOUSEEVENTF_ABSOLUTE | MOUSEEVENTF_VIRTUALDESK,
                    ..Default::default()
                },
            },
        }
    }

    impl InputDevice for SystemInput {
        fn click(&self, x: i32, y: i32) -> Result<()> {
            // Absolute coordinates are normalized to 0-65535 across the virtual desktop
            let (left, top, width, height) = unsafe {
                (
                    GetSystemMetrics(SM_XVIRTUALSCREEN),
                    GetSystemMetrics(SM_YVIRTUALSCREEN),
                    GetSystemMetrics(SM_CXVIRTUALSCREEN),
                    GetSystemMetrics(SM_CYVIRTUALSCREEN),
                )
            };
            if width <= 1 || height <= 1 {
                return Err(anyhow!("Invalid virtual screen size {}x{}", width, height));
            }

            let norm_x = (((x - left) as i64 * 65535) / (width - 1) as i64) as i32;
            let norm_y = (((y - top) as i64 * 65535) / (height - 1) as i64) as i32;

            send(&[mouse_event(norm_x, norm_y, MOUSEEVENTF_MOVE)])?;
            std::thread::sleep(Duration::from_millis(50));
            send(&[mouse_event(norm_x, norm_y, MOUSEEVENTF_LEFTDOWN | MOUSEEVENTF_MOVE)])?;
            std::thread::sleep(Duration::from_millis(50));
            send(&[mouse_event(norm_x, norm_y, MOUSEEVENTF_LEFTUP | MOUSEEVENTF_MOVE)])
        }

        fn key_press(&self, key: Key) -> Result<()> {
            let vk = virtual_key(key);
            let down = INPUT {
                r#type: INPUT_KEYBOARD,
                Anonymous: INPUT_0 {
                    ki: KEYBDINPUT {
                        wVk: vk,
                        ..Default::default()
                    },
                },
            };
            let up = INPUT {
                r#type: INPUT_KEYBOARD,
                Anonymous: INPUT_0 {
                    ki: KEYBDINPUT {
                        wVk: vk,
                        dwFlags: KEYEVENTF_KEYUP,
                        ..Default::default()
                    },
                },
            };
            send(&[down, up])
        }
    }
}

#[cfg(not(windows))]
mod platform {
    use anyhow::{Result, bail};

    use super::{InputDevice, Key, SystemInput};

    impl InputDevice for SystemInput {
        fn click(&self, x: i32, y: i32) -> Result<()> {
            bail!("Input simulation is not supported on this platform (click at {}, {})", x, y)
        }

        fn key_press(&self, key: Key) -> Result<()> {
            bail!("Input simulation is not supported on this platform (key {:?})", key)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automation::testing::{InputAction, RecordingInput};

    #[test]
    fn test_click_center_of_region() {
        let input = RecordingInput::new();
        click_center_of(&input, &ScreenRegion::new(100, 40, 20, 10)).unwrap();
        assert_eq!(input.actions(), vec![InputAction::Click(110, 45)]);
    }

    #[test]
    fn test_press_key() {
        let input = RecordingInput::new();
        press_key(&input, Key::Escape).unwrap();
        assert_eq!(input.actions(), vec![InputAction::Key(Key::Escape)]);
    }
}
