use embassy_time::Duration;

use crate::error::CameraError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PixelFormat {
    Jpeg,
    /// 16-bit packed color, most significant byte first.
    Rgb565,
    Grayscale,
    Yuv422,
}

/// A frame borrowed from the camera for one broadcast cycle.
#[derive(Clone, Copy, Debug)]
pub struct Frame<'a> {
    pub data: &'a [u8],
    pub width: u16,
    pub height: u16,
    pub format: PixelFormat,
}

/// Sensor driver. Buffers handed out by `acquire` must come back through
/// `release` exactly once; [`FrameGuard`] takes care of that.
#[allow(async_fn_in_trait)]
pub trait Camera {
    type Handle;

    async fn init(&mut self) -> Result<(), CameraError>;

    /// Waits at most `timeout` for the next frame buffer.
    async fn acquire(&mut self, timeout: Duration) -> Option<Self::Handle>;

    fn frame<'a>(&'a self, handle: &'a Self::Handle) -> Frame<'a>;

    fn release(&mut self, handle: &Self::Handle);
}

/// Owns one acquired buffer and returns it to the camera when dropped,
/// whichever path the broadcast cycle leaves by.
pub struct FrameGuard<'c, C: Camera> {
    camera: &'c mut C,
    handle: C::Handle,
}

impl<'c, C: Camera> FrameGuard<'c, C> {
    pub async fn acquire(camera: &'c mut C, timeout: Duration) -> Option<Self> {
        let handle = camera.acquire(timeout).await?;
        Some(Self { camera, handle })
    }

    pub fn frame(&self) -> Frame<'_> {
        self.camera.frame(&self.handle)
    }
}

impl<C: Camera> Drop for FrameGuard<'_, C> {
    fn drop(&mut self) {
        self.camera.release(&self.handle);
    }
}
