use opencv::{
    core::Mat,
    prelude::*,
    videoio::{VideoCapture, CAP_ANY},
};

use crate::{
    error::{Error, Result},
    img::frame::Frame,
};

/// Anything that yields video frames one at a time. `Ok(None)` means the
/// source is exhausted and the session should end quietly.
pub trait FrameSource {
    type Frame;

    fn read_frame(&mut self) -> Result<Option<Self::Frame>>;
    fn release(&mut self) -> Result<()>;
}

pub struct Camera {
    capture: VideoCapture,
    device: i32,
    frame_index: i64,
}

impl Camera {
    pub fn open(device: i32) -> Result<Camera> {
        info!("opening camera {}", device);

        let capture = VideoCapture::new(device, CAP_ANY)?;

        if !capture.is_opened()? {
            return Err(Error::CameraUnavailable(device));
        }

        Ok(Camera {
            capture,
            device,
            frame_index: 0,
        })
    }

    pub fn device(&self) -> i32 {
        self.device
    }
}

impl FrameSource for Camera {
    type Frame = Frame;

    fn read_frame(&mut self) -> Result<Option<Frame>> {
        let mut mat = Mat::default();

        match self.capture.read(&mut mat) {
            Ok(true) => {}
            Ok(false) => {
                info!("camera {}\tno more frames", self.device);
                return Ok(None);
            }
            Err(e) => {
                warn!("camera {}\tread failed: {}", self.device, e);
                return Ok(None);
            }
        }

        let frame = Frame::new(mat, self.frame_index);
        if frame.is_empty() {
            info!("camera {}\tempty frame {}", self.device, frame.num);
            return Ok(None);
        }

        self.frame_index += 1;
        trace!("frame {}\tcaptured {}", frame.num, frame.captured_at.format("%H:%M:%S%.3f"));

        frame.mirror().map(Some)
    }

    fn release(&mut self) -> Result<()> {
        debug!("releasing camera {}", self.device);
        self.capture.release()?;

        Ok(())
    }
}
