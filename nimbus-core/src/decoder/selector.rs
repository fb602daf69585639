//! Decoder selection.
//!
//! Backends are tried in registration order, most specialised first and
//! the generic software-capable fallback last. The first backend that
//! initialises wins; a failed candidate is dropped before the next one is
//! constructed.

use tracing::{error, info};

use crate::decoder::{DecoderCapabilities, DecoderParams, VideoDecoder, VideoFormat};
use crate::error::SessionError;
use crate::platform::WindowHandle;
use crate::preferences::VideoDecoderSelection;

type DecoderFactory = dyn Fn(bool) -> Box<dyn VideoDecoder> + Send + Sync;

/// A compiled-in decoder implementation.
pub struct DecoderBackend {
    name: &'static str,
    factory: Box<DecoderFactory>,
}

impl DecoderBackend {
    /// `factory` receives `test_only`: when set the decoder must not
    /// commit to rendering resources.
    pub fn new<F>(name: &'static str, factory: F) -> Self
    where
        F: Fn(bool) -> Box<dyn VideoDecoder> + Send + Sync + 'static,
    {
        Self {
            name,
            factory: Box::new(factory),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl std::fmt::Debug for DecoderBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecoderBackend").field("name", &self.name).finish()
    }
}

/// Ordered set of decoder backends.
#[derive(Debug, Default)]
pub struct DecoderSelector {
    backends: Vec<DecoderBackend>,
}

impl DecoderSelector {
    pub fn new(backends: Vec<DecoderBackend>) -> Self {
        Self { backends }
    }

    /// Append a lower-priority backend.
    pub fn with_backend(mut self, backend: DecoderBackend) -> Self {
        self.backends.push(backend);
        self
    }

    /// Return the first backend that initialises with `params`.
    pub fn choose(
        &self,
        params: &DecoderParams,
        test_only: bool,
    ) -> Result<Box<dyn VideoDecoder>, SessionError> {
        info!(
            "V-sync {}",
            if params.enable_vsync { "enabled" } else { "disabled" }
        );

        for backend in &self.backends {
            let mut decoder = (backend.factory)(test_only);
            match decoder.initialize(params) {
                Ok(()) => {
                    info!("{} video decoder chosen", backend.name);
                    return Ok(decoder);
                }
                Err(e) => {
                    error!("unable to load {} decoder: {e}", backend.name);
                    drop(decoder);
                }
            }
        }

        Err(SessionError::DecoderUnavailable)
    }

    /// Whether a hardware-accelerated decoder exists for the format.
    pub fn is_hardware_decode_available(
        &self,
        selection: VideoDecoderSelection,
        window: Option<WindowHandle>,
        format: VideoFormat,
        width: u32,
        height: u32,
        frame_rate: u32,
    ) -> bool {
        let params = DecoderParams::probe(selection, window, format, width, height, frame_rate);
        self.choose(&params, true)
            .map(|decoder| decoder.is_hardware_accelerated())
            .unwrap_or(false)
    }

    /// Capability bits of the decoder that would be chosen for the format.
    pub fn decoder_capabilities(
        &self,
        selection: VideoDecoderSelection,
        window: Option<WindowHandle>,
        format: VideoFormat,
        width: u32,
        height: u32,
        frame_rate: u32,
    ) -> DecoderCapabilities {
        let params = DecoderParams::probe(selection, window, format, width, height, frame_rate);
        self.choose(&params, true)
            .map(|decoder| decoder.capabilities())
            .unwrap_or_default()
    }
}

// ── Tests ────────────────────────────────────────────────────────
