//! Render Context
//!
//! The collaborators every GPU-owning object needs, created once at the
//! composition root and passed down explicitly. Cloning is cheap (two `Rc`s).

use std::fmt;
use std::rc::Rc;

use crate::gpu::{GpuDevice, HeadlessDevice};
use crate::resources::image::{ImageCrateDecoder, ImageDecoder};

#[derive(Clone)]
pub struct RenderContext {
    pub gpu: Rc<dyn GpuDevice>,
    pub decoder: Rc<dyn ImageDecoder>,
}

impl RenderContext {
    /// Context with the default `image`-crate decoder.
    #[must_use]
    pub fn new(gpu: Rc<dyn GpuDevice>) -> Self {
        Self {
            gpu,
            decoder: Rc::new(ImageCrateDecoder),
        }
    }

    #[must_use]
    pub fn with_decoder(gpu: Rc<dyn GpuDevice>, decoder: Rc<dyn ImageDecoder>) -> Self {
        Self { gpu, decoder }
    }

    /// Context over a fresh [`HeadlessDevice`]; the device is returned too so
    /// callers can inspect it.
    #[must_use]
    pub fn headless() -> (Self, Rc<HeadlessDevice>) {
        let device = Rc::new(HeadlessDevice::new());
        let gpu: Rc<dyn GpuDevice> = device.clone();
        (Self::new(gpu), device)
    }
}

impl fmt::Debug for RenderContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderContext").finish_non_exhaustive()
    }
}
