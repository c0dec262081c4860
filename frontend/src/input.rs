use std::collections::HashMap;

use irobot_core::core::machine::InputButton;
use irobot_machines::irobot::{AXIS_X, AXIS_Y};
use sdl2::keyboard::Scancode;

/// Maps SDL scancodes to machine button IDs.
pub struct KeyMap {
    map: HashMap<Scancode, u8>,
}

impl KeyMap {
    pub fn new() -> Self {
        Self {
            map: HashMap::new(),
        }
    }

    pub fn bind(&mut self, scancode: Scancode, button_id: u8) {
        self.map.insert(scancode, button_id);
    }

    pub fn get(&self, scancode: Scancode) -> Option<u8> {
        self.map.get(&scancode).copied()
    }
}

/// Default bindings, matched on button name.
pub fn default_key_map(buttons: &[InputButton]) -> KeyMap {
    let mut km = KeyMap::new();

    for button in buttons {
        let scancode = match button.name {
            "Coin Left" => Some(Scancode::Num5),
            "Coin Right" => Some(Scancode::Num6),
            "Coin Aux" => Some(Scancode::Num7),
            "P1 Start" => Some(Scancode::Num1),
            "P2 Start" => Some(Scancode::Num2),
            "Fire" => Some(Scancode::LCtrl),
            "Test" => Some(Scancode::F2),
            _ => None,
        };

        if let Some(sc) = scancode {
            km.bind(sc, button.id);
        }
    }

    km
}

/// Digital stand-in for the analog joystick. Each axis rests at the ADC
/// midpoint and swings to a rail while its key is held.
#[derive(Default)]
pub struct Joystick {
    left: bool,
    right: bool,
    up: bool,
    down: bool,
}

impl Joystick {
    /// Track an arrow key. Returns the axis it moved, if any.
    pub fn key(&mut self, scancode: Scancode, pressed: bool) -> Option<u8> {
        match scancode {
            Scancode::Left => self.left = pressed,
            Scancode::Right => self.right = pressed,
            Scancode::Up => self.up = pressed,
            Scancode::Down => self.down = pressed,
            _ => return None,
        }
        Some(if matches!(scancode, Scancode::Left | Scancode::Right) {
            AXIS_X
        } else {
            AXIS_Y
        })
    }

    pub fn axis(&self, axis: u8) -> u8 {
        let (low, high) = if axis == AXIS_X {
            (self.left, self.right)
        } else {
            (self.up, self.down)
        };
        match (low, high) {
            (true, false) => 0x00,
            (false, true) => 0xFF,
            _ => 0x80,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn board_buttons_get_bindings() {
        let buttons = [
            InputButton { id: 3, name: "P1 Start" },
            InputButton { id: 5, name: "Fire" },
            InputButton { id: 9, name: "Unknown" },
        ];
        let km = default_key_map(&buttons);
        assert_eq!(km.get(Scancode::Num1), Some(3));
        assert_eq!(km.get(Scancode::LCtrl), Some(5));
        assert_eq!(km.map.len(), 2);
    }

    #[test]
    fn joystick_centers_when_released_or_opposed() {
        let mut stick = Joystick::default();
        assert_eq!(stick.axis(AXIS_X), 0x80);
        assert_eq!(stick.key(Scancode::Left, true), Some(AXIS_X));
        assert_eq!(stick.axis(AXIS_X), 0x00);
        stick.key(Scancode::Right, true);
        assert_eq!(stick.axis(AXIS_X), 0x80);
        stick.key(Scancode::Left, false);
        assert_eq!(stick.axis(AXIS_X), 0xFF);
        assert_eq!(stick.key(Scancode::Down, true), Some(AXIS_Y));
        assert_eq!(stick.axis(AXIS_Y), 0xFF);
        assert_eq!(stick.key(Scancode::A, true), None);
    }
}
