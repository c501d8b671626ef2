use anyhow::{Context, Result};
use minifb::{Key, KeyRepeat, ScaleMode, Window, WindowOptions};
use std::collections::VecDeque;

use crate::application::ports::DisplayPort;
use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::stream::Frame;

/// Video window. Must be created and driven from the main thread.
pub struct MinifbDisplay {
    window: Option<Window>,
    buffer: Vec<u32>,
    pending: VecDeque<char>,
}

impl MinifbDisplay {
    pub fn open(title: &str, size: (u32, u32)) -> Result<Self> {
        let options = WindowOptions {
            resize: true,
            scale_mode: ScaleMode::AspectRatioStretch,
            ..WindowOptions::default()
        };
        let mut window = Window::new(title, size.0 as usize, size.1 as usize, options)
            .with_context(|| format!("cannot create {}x{} window", size.0, size.1))?;
        // frame pacing comes from the camera
        window.set_target_fps(0);
        tracing::info!("Display window opened: {}x{}", size.0, size.1);
        Ok(Self { window: Some(window), buffer: Vec::new(), pending: VecDeque::new() })
    }
}

impl DisplayPort for MinifbDisplay {
    fn show(&mut self, frame: &Frame) -> DomainResult<()> {
        let Some(window) = self.window.as_mut() else {
            return Err(DomainError::OperationFailed("display closed".into()));
        };

        self.buffer.clear();
        self.buffer.extend(frame.image.pixels().map(|p| rgb_to_u32(p.0)));
        window
            .update_with_buffer(&self.buffer, frame.width() as usize, frame.height() as usize)
            .map_err(|e| DomainError::OperationFailed(format!("display update: {e}")))?;

        self.pending.extend(
            window
                .get_keys_pressed(KeyRepeat::No)
                .into_iter()
                .filter_map(key_to_char),
        );
        Ok(())
    }

    fn poll_key(&mut self) -> Option<char> {
        self.pending.pop_front()
    }

    fn is_open(&self) -> bool {
        self.window.as_ref().is_some_and(|w| w.is_open())
    }

    fn close(&mut self) {
        if self.window.take().is_some() {
            tracing::info!("Display window closed");
        }
    }
}

fn rgb_to_u32([r, g, b]: [u8; 3]) -> u32 {
    ((r as u32) << 16) | ((g as u32) << 8) | b as u32
}

fn key_to_char(key: Key) -> Option<char> {
    let c = match key {
        Key::Space => ' ',
        Key::A => 'a',
        Key::B => 'b',
        Key::C => 'c',
        Key::D => 'd',
        Key::E => 'e',
        Key::F => 'f',
        Key::G => 'g',
        Key::H => 'h',
        Key::I => 'i',
        Key::J => 'j',
        Key::K => 'k',
        Key::L => 'l',
        Key::M => 'm',
        Key::N => 'n',
        Key::O => 'o',
        Key::P => 'p',
        Key::Q => 'q',
        Key::R => 'r',
        Key::S => 's',
        Key::T => 't',
        Key::U => 'u',
        Key::V => 'v',
        Key::W => 'w',
        Key::X => 'x',
        Key::Y => 'y',
        Key::Z => 'z',
        _ => return None,
    };
    Some(c)
}
