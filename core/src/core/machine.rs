use crate::device::display_list::DisplayListQueue;
use crate::device::quad_pokey::AudioSink;

/// Describes a single input button that a machine accepts.
pub struct InputButton {
    /// Machine-defined button identifier, passed to `set_input()`.
    pub id: u8,
    /// Human-readable name for display/configuration (e.g., "P1 Fire", "Coin").
    pub name: &'static str,
}

/// Errors raised while saving or restoring a machine snapshot.
#[derive(Debug)]
pub enum StateError {
    /// Underlying I/O or compression failure.
    Io(std::io::Error),
    /// The snapshot could not be encoded or decoded.
    Encoding(String),
    /// The snapshot was taken from a different machine or format version.
    Incompatible(String),
}

impl std::fmt::Display for StateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "state I/O error: {e}"),
            Self::Encoding(msg) => write!(f, "state encoding error: {msg}"),
            Self::Incompatible(msg) => write!(f, "incompatible state: {msg}"),
        }
    }
}

impl std::error::Error for StateError {}

impl From<std::io::Error> for StateError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

/// Machine-agnostic interface for emulated boards.
///
/// The frontend drives a machine one video frame at a time. Vector/polygon
/// output is not drawn by the machine: it is published through
/// [`display_lists`](Self::display_lists) for a renderer collaborator, and
/// [`render_frame`](Self::render_frame) only composites the board's own
/// raster layers on top.
pub trait Machine {
    /// Native display resolution as (width, height) in pixels.
    fn display_size(&self) -> (u32, u32);

    /// Run one frame of emulation.
    fn run_frame(&mut self);

    /// Composite the machine's raster layers over an RGB24 buffer of
    /// `width * height * 3` bytes that already holds the rendered scene.
    fn render_frame(&self, buffer: &mut [u8]);

    /// Queue of committed display lists, if the machine produces any.
    fn display_lists(&self) -> Option<DisplayListQueue> {
        None
    }

    /// Handle an input event. `button` is a machine-defined ID from `input_map()`.
    fn set_input(&mut self, button: u8, pressed: bool);

    /// Set an analog axis position (0x00-0xFF, 0x80 centered).
    fn set_analog(&mut self, _axis: u8, _value: u8) {}

    /// Get the list of input buttons this machine accepts.
    fn input_map(&self) -> &[InputButton];

    /// Reset the machine to its initial power-on state.
    fn reset(&mut self);

    /// Non-volatile memory to persist between sessions.
    fn save_nvram(&self) -> Option<&[u8]> {
        None
    }

    fn load_nvram(&mut self, _data: &[u8]) {}

    /// Output sample rate in Hz, or 0 when the machine is silent.
    fn audio_sample_rate(&self) -> u32 {
        0
    }

    /// Top up the audio sink's queue.
    fn update_audio(&mut self, _sink: &mut dyn AudioSink) {}

    fn frame_rate_hz(&self) -> f64 {
        60.0
    }

    fn save_state(&self) -> Result<Vec<u8>, StateError> {
        Err(StateError::Incompatible("save states not supported".into()))
    }

    fn load_state(&mut self, _data: &[u8]) -> Result<(), StateError> {
        Err(StateError::Incompatible("save states not supported".into()))
    }
}
