use chrono::{DateTime, Utc};
use opencv::{
    core::{flip, Mat},
    prelude::*,
};

use crate::error::Result;

#[derive(Clone)]
pub struct Frame {
    pub mat: Mat,
    pub num: i64,
    pub captured_at: DateTime<Utc>,
}

impl Frame {
    pub fn new(mat: Mat, num: i64) -> Frame {
        Frame {
            mat,
            num,
            captured_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.mat.rows() == 0 || self.mat.cols() == 0
    }

    /// Flips the frame around the vertical axis so the player sees a mirror.
    pub fn mirror(mut self) -> Result<Frame> {
        let mut mirrored = Mat::default();

        flip(&self.mat, &mut mirrored, 1)?;
        self.mat = mirrored;

        Ok(self)
    }

    pub fn width(&self) -> i32 {
        self.mat.cols()
    }

    pub fn height(&self) -> i32 {
        self.mat.rows()
    }
}

#[cfg(test)]
mod tests {
    use opencv::core::{Scalar, CV_8UC1};

    use super::*;

    #[test]
    fn default_mat_is_empty() {
        let frame = Frame::new(Mat::default(), 0);

        assert!(frame.is_empty());
    }

    #[test]
    fn mirror_swaps_columns() {
        let mut mat =
            Mat::new_rows_cols_with_default(1, 2, CV_8UC1, Scalar::all(0.0)).unwrap();
        *mat.at_2d_mut::<u8>(0, 0).unwrap() = 255;

        let frame = Frame::new(mat, 3).mirror().unwrap();

        assert_eq!(frame.num, 3);
        assert_eq!((frame.width(), frame.height()), (2, 1));
        assert_eq!(*frame.mat.at_2d::<u8>(0, 1).unwrap(), 255);
        assert_eq!(*frame.mat.at_2d::<u8>(0, 0).unwrap(), 0);
    }
}
