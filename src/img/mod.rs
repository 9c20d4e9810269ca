use std::path::Path;

use opencv::{
    core::Mat,
    imgcodecs::{imread, IMREAD_COLOR},
    prelude::*,
};

use crate::error::{Error, Result};

pub mod frame;

/// Still images shown around the live camera feed.
#[derive(Clone)]
pub struct SceneImages {
    pub green: Mat,
    pub red: Mat,
    pub lose: Mat,
    pub win: Mat,
    pub intro: Mat,
}

impl SceneImages {
    pub fn load(dir: &Path) -> Result<SceneImages> {
        debug!("loading scene images from {}", dir.display());

        Ok(SceneImages {
            green: load_image(dir, "0.png")?,
            red: load_image(dir, "1.png")?,
            lose: load_image(dir, "2.png")?,
            win: load_image(dir, "3.png")?,
            intro: load_image(dir, "4.png")?,
        })
    }
}

fn load_image(dir: &Path, name: &str) -> Result<Mat> {
    let path = dir.join(name);
    let path_str = path
        .to_str()
        .ok_or_else(|| Error::asset(&path, "path is not valid unicode"))?;

    let mat = imread(path_str, IMREAD_COLOR)?;

    if mat.rows() == 0 || mat.cols() == 0 {
        return Err(Error::asset(&path, "unreadable image"));
    }

    Ok(mat)
}
