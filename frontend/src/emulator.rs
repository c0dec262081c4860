use std::path::PathBuf;

use irobot_core::core::machine::Machine;
use log::{error, info, warn};
use sdl2::event::Event;
use sdl2::keyboard::Scancode;

use crate::audio::{self, RingSink};
use crate::input::{Joystick, KeyMap};
use crate::rasterizer::Rasterizer;
use crate::screenshot;
use crate::video::Video;

/// Files the hotkeys read and write.
pub struct Paths {
    pub state: PathBuf,
    pub screenshots: PathBuf,
}

/// Run until the window closes or Escape is pressed.
///
/// F2 is the service switch, F3 resets, F5/F7 save and load the state
/// file, F12 writes a screenshot.
pub fn run(
    machine: &mut dyn Machine,
    key_map: &KeyMap,
    scale: u32,
    paths: &Paths,
) -> Result<(), String> {
    let sdl_context = sdl2::init()?;
    let sdl_video = sdl_context.video()?;

    let (width, height) = machine.display_size();
    let mut video = Video::new(&sdl_video, "I, Robot", width, height, scale)?;
    let mut event_pump = sdl_context.event_pump()?;

    let audio_out = match sdl_context.audio() {
        Ok(sdl_audio) => audio::init(&sdl_audio, machine.audio_sample_rate()),
        Err(e) => {
            warn!("audio: subsystem unavailable: {e}");
            None
        }
    };
    let mut sink = audio_out
        .as_ref()
        .map(|(_, ring, _)| RingSink::new(ring.clone()));
    let mut audio_started = false;

    let queue = machine.display_lists();
    let mut rasterizer = Rasterizer::new(width, height);
    let mut joystick = Joystick::default();
    let mut framebuffer = vec![0u8; (width * height * 3) as usize];

    'main: loop {
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. }
                | Event::KeyDown {
                    scancode: Some(Scancode::Escape),
                    ..
                } => break 'main,

                Event::KeyDown {
                    scancode: Some(sc),
                    repeat: false,
                    ..
                } => match sc {
                    Scancode::F3 => machine.reset(),
                    Scancode::F5 => save_state(machine, paths),
                    Scancode::F7 => load_state(machine, paths),
                    Scancode::F12 => take_screenshot(&framebuffer, width, height, paths),
                    _ => press(machine, key_map, &mut joystick, sc, true),
                },

                Event::KeyUp {
                    scancode: Some(sc), ..
                } => press(machine, key_map, &mut joystick, sc, false),

                _ => {}
            }
        }

        machine.run_frame();

        if let Some(sink) = sink.as_mut() {
            machine.update_audio(sink);
            if !audio_started && let Some((device, _, _)) = audio_out.as_ref() {
                device.resume();
                audio_started = true;
            }
        }

        if let Some(queue) = queue.as_ref() {
            rasterizer.drain(queue);
        }
        rasterizer.compose(&mut framebuffer);
        machine.render_frame(&mut framebuffer);
        video.present(&framebuffer)?;
    }

    if let Some((device, _, fade_out)) = audio_out {
        fade_out.store(true, std::sync::atomic::Ordering::Relaxed);
        std::thread::sleep(audio::fade_out_duration());
        device.pause();
    }
    Ok(())
}

fn press(
    machine: &mut dyn Machine,
    key_map: &KeyMap,
    joystick: &mut Joystick,
    scancode: Scancode,
    pressed: bool,
) {
    if let Some(button_id) = key_map.get(scancode) {
        machine.set_input(button_id, pressed);
    } else if let Some(axis) = joystick.key(scancode, pressed) {
        machine.set_analog(axis, joystick.axis(axis));
    }
}

fn save_state(machine: &dyn Machine, paths: &Paths) {
    match machine.save_state() {
        Ok(data) => match std::fs::write(&paths.state, data) {
            Ok(()) => info!("state saved to {}", paths.state.display()),
            Err(e) => warn!("failed to write {}: {e}", paths.state.display()),
        },
        Err(e) => error!("save state failed: {e}"),
    }
}

fn load_state(machine: &mut dyn Machine, paths: &Paths) {
    let data = match std::fs::read(&paths.state) {
        Ok(data) => data,
        Err(e) => {
            warn!("no state at {}: {e}", paths.state.display());
            return;
        }
    };
    match machine.load_state(&data) {
        Ok(()) => info!("state loaded from {}", paths.state.display()),
        Err(e) => error!("load state failed: {e}"),
    }
}

fn take_screenshot(frame: &[u8], width: u32, height: u32, paths: &Paths) {
    let path = screenshot::next_path(&paths.screenshots);
    match screenshot::write_png(&path, width, height, frame) {
        Ok(()) => info!("screenshot saved to {}", path.display()),
        Err(e) => warn!("screenshot failed: {e}"),
    }
}
