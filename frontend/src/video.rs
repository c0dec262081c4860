use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};

pub struct Video {
    canvas: Canvas<Window>,
    texture_creator: TextureCreator<WindowContext>,
    width: u32,
    height: u32,
}

impl Video {
    /// Open a window `scale` times the native resolution.
    pub fn new(
        sdl_video: &sdl2::VideoSubsystem,
        title: &str,
        native_width: u32,
        native_height: u32,
        scale: u32,
    ) -> Result<Self, String> {
        let window = sdl_video
            .window(title, native_width * scale, native_height * scale)
            .position_centered()
            .build()
            .map_err(|e| e.to_string())?;

        let canvas = window
            .into_canvas()
            .accelerated()
            .present_vsync()
            .build()
            .map_err(|e| e.to_string())?;

        let texture_creator = canvas.texture_creator();

        Ok(Self {
            canvas,
            texture_creator,
            width: native_width,
            height: native_height,
        })
    }

    /// Upload an RGB24 framebuffer to the texture and present it.
    pub fn present(&mut self, framebuffer: &[u8]) -> Result<(), String> {
        let mut texture = self
            .texture_creator
            .create_texture_streaming(PixelFormatEnum::RGB24, self.width, self.height)
            .map_err(|e| e.to_string())?;

        texture
            .update(None, framebuffer, (self.width * 3) as usize)
            .map_err(|e| e.to_string())?;

        self.canvas.clear();
        self.canvas.copy(&texture, None, None)?;
        self.canvas.present();
        Ok(())
    }
}
