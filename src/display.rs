use opencv::{
    core::{Mat, Point, Scalar},
    highgui::{destroy_all_windows, imshow, named_window, wait_key, WINDOW_AUTOSIZE},
    imgproc::{put_text, FONT_HERSHEY_SIMPLEX, LINE_8},
};

use crate::{error::Result, img::frame::Frame, img::SceneImages, session::Light};

pub const ESCAPE: char = '\u{1b}';

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Color {
    Red,
    Green,
    White,
    Yellow,
}

impl Color {
    pub fn for_light(light: Light) -> Color {
        match light {
            Light::Red => Color::Red,
            Light::Green => Color::Green,
        }
    }

    fn scalar(&self) -> Scalar {
        // BGR
        match self {
            Color::Red => Scalar::new(0., 0., 255., 0.),
            Color::Green => Scalar::new(0., 255., 0., 0.),
            Color::White => Scalar::new(255., 255., 255., 0.),
            Color::Yellow => Scalar::new(0., 255., 255., 0.),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OverlayLine {
    pub text: String,
    pub color: Color,
}

/// Lines of text drawn top-left over whatever scene is on screen.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Overlay {
    pub lines: Vec<OverlayLine>,
}

impl Overlay {
    pub fn prompt(text: &str) -> Overlay {
        Overlay::default().line(text, Color::White)
    }

    pub fn line(mut self, text: impl Into<String>, color: Color) -> Overlay {
        self.lines.push(OverlayLine {
            text: text.into(),
            color,
        });

        self
    }
}

pub enum Scene<'a, F> {
    Intro,
    Live { frame: &'a F, light: Light },
    Won,
    Lost,
}

/// Render/input side of the game: shows one scene per loop iteration and
/// reads at most one key.
pub trait Screen<F> {
    fn present(&mut self, scene: Scene<'_, F>, overlay: &Overlay) -> Result<()>;
    fn poll_key(&mut self, timeout_ms: i32) -> Result<Option<char>>;
    fn close(&mut self) -> Result<()>;
}

/// What sits behind the overlay while a round is running.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Backdrop {
    Camera,
    Lights,
}

pub struct HighGui {
    window: String,
    images: SceneImages,
    backdrop: Backdrop,
}

impl HighGui {
    pub fn new(window: &str, images: SceneImages, backdrop: Backdrop) -> Result<HighGui> {
        named_window(window, WINDOW_AUTOSIZE)?;

        Ok(HighGui {
            window: window.to_string(),
            images,
            backdrop,
        })
    }

    fn backdrop(&self, scene: &Scene<'_, Frame>) -> Mat {
        match scene {
            Scene::Intro => self.images.intro.clone(),
            Scene::Won => self.images.win.clone(),
            Scene::Lost => self.images.lose.clone(),
            Scene::Live { frame, light } => match (self.backdrop, light) {
                (Backdrop::Camera, _) => frame.mat.clone(),
                (Backdrop::Lights, Light::Green) => self.images.green.clone(),
                (Backdrop::Lights, Light::Red) => self.images.red.clone(),
            },
        }
    }
}

fn draw_overlay(mat: &mut Mat, overlay: &Overlay) -> Result<()> {
    for (i, line) in overlay.lines.iter().enumerate() {
        put_text(
            mat,
            &line.text,
            Point::new(50, 50 + 50 * i as i32),
            FONT_HERSHEY_SIMPLEX,
            1.0,
            line.color.scalar(),
            2,
            LINE_8,
            false,
        )?;
    }

    Ok(())
}

impl Screen<Frame> for HighGui {
    fn present(&mut self, scene: Scene<'_, Frame>, overlay: &Overlay) -> Result<()> {
        let mut mat = self.backdrop(&scene);

        draw_overlay(&mut mat, overlay)?;
        imshow(&self.window, &mat)?;

        Ok(())
    }

    fn poll_key(&mut self, timeout_ms: i32) -> Result<Option<char>> {
        let key = wait_key(timeout_ms)?;

        if key < 0 {
            return Ok(None);
        }

        Ok(Some(((key & 0xFF) as u8) as char))
    }

    fn close(&mut self) -> Result<()> {
        destroy_all_windows()?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overlay_lines_keep_order() {
        let overlay = Overlay::prompt("Press Q to start").line("Score: 3", Color::Yellow);

        assert_eq!(overlay.lines.len(), 2);
        assert_eq!(overlay.lines[0].text, "Press Q to start");
        assert_eq!(overlay.lines[0].color, Color::White);
        assert_eq!(overlay.lines[1].color, Color::Yellow);
    }

    #[test]
    fn light_colors() {
        assert_eq!(Color::for_light(Light::Red), Color::Red);
        assert_eq!(Color::for_light(Light::Green), Color::Green);
    }
}
