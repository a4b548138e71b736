//! The image detector contract and the bundled format-sniffing detector.

/// Outcome of one detector call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Detection {
    /// The annotated (detect) or composited (replace) image.
    Found(Vec<u8>),
    /// The image decoded but contains no detectable face.
    NoFaces,
    /// The image could not be decoded.
    Invalid,
}

/// Face detection backend.
///
/// Methods take `&mut self`: a detector owns a single staging slot, so the
/// server runs at most one call at a time. Calls run on the blocking pool
/// and may take as long as they need.
pub trait Detector: Send + 'static {
    /// Annotates every face found in `image`.
    fn detect(&mut self, image: Vec<u8>) -> Detection;

    /// Pastes `source` over every face found in `target`.
    fn replace(&mut self, target: Vec<u8>, source: Vec<u8>) -> Detection;
}

/// Image container formats recognised by [`SniffingDetector`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Jpeg,
    Png,
    Gif,
    Bmp,
    Tiff,
}

impl ImageFormat {
    const SIGNATURES: &'static [(ImageFormat, &'static [u8])] = &[
        (ImageFormat::Jpeg, &[0xFF, 0xD8, 0xFF]),
        (ImageFormat::Png, &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A]),
        (ImageFormat::Gif, b"GIF87a"),
        (ImageFormat::Gif, b"GIF89a"),
        (ImageFormat::Bmp, b"BM"),
        (ImageFormat::Tiff, b"II*\0"),
        (ImageFormat::Tiff, b"MM\0*"),
    ];

    /// Identifies the container format from its leading signature.
    ///
    /// Returns the format and the signature length.
    pub fn sniff(bytes: &[u8]) -> Option<(ImageFormat, usize)> {
        Self::SIGNATURES
            .iter()
            .find(|(_, sig)| bytes.starts_with(sig))
            .map(|(format, sig)| (*format, sig.len()))
    }
}

/// Detector that validates images by container signature.
///
/// Anything without a known signature is [`Detection::Invalid`]; a container
/// with nothing after its signature has no picture to search and is
/// [`Detection::NoFaces`]. Otherwise the staged image is returned as the
/// result (for replace, the target). Pixel-level detection plugs in through
/// the [`Detector`] trait.
#[derive(Debug, Default)]
pub struct SniffingDetector {
    staging: Vec<u8>,
    processed: u64,
}

impl SniffingDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls that produced an image.
    pub fn processed(&self) -> u64 {
        self.processed
    }

    fn stage(&mut self, image: Vec<u8>) -> Detection {
        self.staging = image;
        match ImageFormat::sniff(&self.staging) {
            None => {
                self.staging.clear();
                Detection::Invalid
            }
            Some((_, sig_len)) if self.staging.len() == sig_len => {
                self.staging.clear();
                Detection::NoFaces
            }
            Some((format, _)) => {
                tracing::debug!(?format, len = self.staging.len(), "image staged");
                self.processed += 1;
                Detection::Found(std::mem::take(&mut self.staging))
            }
        }
    }
}

impl Detector for SniffingDetector {
    fn detect(&mut self, image: Vec<u8>) -> Detection {
        self.stage(image)
    }

    fn replace(&mut self, target: Vec<u8>, source: Vec<u8>) -> Detection {
        if ImageFormat::sniff(&source).is_none() {
            return Detection::Invalid;
        }
        self.stage(target)
    }
}
