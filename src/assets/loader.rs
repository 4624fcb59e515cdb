//! Background asset loading
//!
//! Each load runs on its own worker thread and resolves exactly once through
//! a oneshot channel. The render loop polls the returned [`Pending`] without
//! blocking; async callers can simply `.await` it.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{Context, Poll};
use std::thread;

use futures::channel::oneshot;
use image::GenericImageView;

use super::{AssetError, RoomModel};

/// Room model, relative to the asset root
pub const ROOM_MODEL_PATH: &str = "models/portalRoom.glb";
/// Floor color map, relative to the asset root
pub const FLOOR_TEXTURE_PATH: &str = "textures/marbleColor.jpg";

/// Decoded RGBA8 image ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

impl DecodedImage {
    /// Decode an encoded image (PNG, JPEG)
    ///
    /// # Errors
    ///
    /// Returns an error if the bytes cannot be decoded as an image
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, AssetError> {
        let img = image::load_from_memory(bytes)?;
        let (width, height) = img.dimensions();
        Ok(Self {
            width,
            height,
            rgba: img.to_rgba8().into_raw(),
        })
    }

    /// Read and decode an image file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or decoded
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, AssetError> {
        let bytes = std::fs::read(path).map_err(|e| AssetError::Io(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

/// Result of a background load, delivered once
#[derive(Debug)]
pub struct Pending<T> {
    receiver: oneshot::Receiver<Result<T, AssetError>>,
    resolved: bool,
}

impl<T> Pending<T> {
    fn new(receiver: oneshot::Receiver<Result<T, AssetError>>) -> Self {
        Self {
            receiver,
            resolved: false,
        }
    }

    /// A handle that is already resolved with `result`
    pub fn ready(result: Result<T, AssetError>) -> Self {
        let (sender, receiver) = oneshot::channel();
        // The receiver is alive, so the send cannot fail
        let _ = sender.send(result);
        Self::new(receiver)
    }

    /// Take the result if it has arrived
    ///
    /// Returns `Some` exactly once; every later call returns `None`.
    pub fn try_take(&mut self) -> Option<Result<T, AssetError>> {
        if self.resolved {
            return None;
        }
        let result = match self.receiver.try_recv() {
            Ok(Some(result)) => result,
            Ok(None) => return None,
            Err(oneshot::Canceled) => Err(AssetError::Abandoned),
        };
        self.resolved = true;
        Some(result)
    }

    /// Whether the result has already been taken
    pub fn is_resolved(&self) -> bool {
        self.resolved
    }
}

impl<T> Future for Pending<T> {
    type Output = Result<T, AssetError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if self.resolved {
            return Poll::Ready(Err(AssetError::Abandoned));
        }
        let poll = Pin::new(&mut self.receiver).poll(cx);
        poll.map(|received| {
            self.resolved = true;
            received.unwrap_or(Err(AssetError::Abandoned))
        })
    }
}

/// Loads assets from a fixed root directory
#[derive(Debug, Clone)]
pub struct AssetLoader {
    root: PathBuf,
}

impl AssetLoader {
    /// Create a loader rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Asset root directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path relative to the root
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        self.root.join(path)
    }

    /// Load and parse a glTF/GLB model in the background
    pub fn load_model(&self, path: impl AsRef<Path>) -> Pending<RoomModel> {
        let full = self.resolve(path);
        spawn_load("model", move || {
            let model = RoomModel::from_path(&full)?;
            log::info!("Loaded model {} ({} nodes)", full.display(), model.node_count());
            Ok(model)
        })
    }

    /// Load and decode an image in the background
    pub fn load_texture(&self, path: impl AsRef<Path>) -> Pending<DecodedImage> {
        let full = self.resolve(path);
        spawn_load("texture", move || {
            let image = DecodedImage::from_path(&full)?;
            log::info!(
                "Loaded texture {} ({}x{})",
                full.display(),
                image.width,
                image.height
            );
            Ok(image)
        })
    }
}

impl Default for AssetLoader {
    fn default() -> Self {
        Self::new("assets")
    }
}

fn spawn_load<T, F>(kind: &str, load: F) -> Pending<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, AssetError> + Send + 'static,
{
    let (sender, receiver) = oneshot::channel();
    let spawned = thread::Builder::new()
        .name(format!("{kind}-loader"))
        .spawn(move || {
            if sender.send(load()).is_err() {
                log::debug!("Load finished after its handle was dropped");
            }
        });

    match spawned {
        Ok(_) => Pending::new(receiver),
        Err(e) => Pending::ready(Err(AssetError::Io(e.to_string()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_take_resolves_once() {
        let mut pending = Pending::ready(Ok(7_u32));
        assert_eq!(pending.try_take(), Some(Ok(7)));
        assert!(pending.is_resolved());
        assert_eq!(pending.try_take(), None);
    }

    #[test]
    fn test_dropped_sender_is_abandoned() {
        let (sender, receiver) = oneshot::channel::<Result<u32, AssetError>>();
        drop(sender);
        let mut pending = Pending::new(receiver);
        assert_eq!(pending.try_take(), Some(Err(AssetError::Abandoned)));
    }

    #[test]
    fn test_missing_texture_reports_io() {
        let loader = AssetLoader::new("does/not/exist");
        let result = futures::executor::block_on(loader.load_texture(FLOOR_TEXTURE_PATH));
        assert!(matches!(result, Err(AssetError::Io(_))));
    }

    #[test]
    fn test_decode_png_bytes() {
        let mut bytes = Vec::new();
        let img = image::RgbaImage::from_pixel(2, 3, image::Rgba([10, 20, 30, 255]));
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();

        let decoded = DecodedImage::from_bytes(&bytes).unwrap();
        assert_eq!((decoded.width, decoded.height), (2, 3));
        assert_eq!(&decoded.rgba[..4], &[10, 20, 30, 255]);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        assert!(matches!(
            DecodedImage::from_bytes(b"not an image"),
            Err(AssetError::Decode(_))
        ));
    }
}
