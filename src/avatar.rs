//! Digital-human renderer, modeled as an injected capability.
//!
//! The real renderer is a third-party SDK loaded by the host runtime. The
//! demo only needs the handful of calls below, so the SDK is a trait object
//! supplied through an [`AvatarLoader`] instead of ambient global state;
//! everything here can be exercised without a real renderer present.

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;
use tracing::info;

/// Default session gateway of the hosted renderer service.
pub const DEFAULT_GATEWAY_SERVER: &str =
    "https://nebula-agent.xingyun3d.com/user/v1/ttsa/session";

/// Renderer connection settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AvatarSettings {
    #[serde(default)]
    pub app_id: String,
    #[serde(default)]
    pub app_secret: String,
    #[serde(default = "default_gateway_server")]
    pub gateway_server: String,
    #[serde(default)]
    pub enable_logger: bool,
}

impl Default for AvatarSettings {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            app_secret: String::new(),
            gateway_server: default_gateway_server(),
            enable_logger: false,
        }
    }
}

fn default_gateway_server() -> String {
    DEFAULT_GATEWAY_SERVER.to_string()
}

/// Errors from the renderer integration.
#[derive(Debug, Error)]
pub enum AvatarError {
    /// The host runtime never made the SDK available.
    #[error("renderer SDK is not loaded")]
    NotLoaded,

    /// A call arrived before `init` (or after `destroy`).
    #[error("renderer SDK is not initialized")]
    NotInitialized,

    /// The SDK was present but failed to initialize.
    #[error("renderer init failed: {0}")]
    Init(String),
}

/// The opaque remote renderer object. All calls are fire-and-forget; the
/// SDK reports progress through its own channels, which the demo does not
/// consume.
pub trait AvatarSdk: Send + Sync {
    /// Speak a text fragment. `is_start`/`is_end` mark the fragment's
    /// position within one utterance so partial LLM output can be voiced
    /// as it streams in.
    fn speak(&self, text: &str, is_start: bool, is_end: bool);
    fn idle(&self);
    fn interactive_idle(&self);
    fn listen(&self);
    fn think(&self);
    fn set_volume(&self, volume: f32);
    fn show_debug_info(&self);
    fn hide_debug_info(&self);
    fn offline_mode(&self);
    fn online_mode(&self);
    fn destroy(&self);
}

/// Produces renderer handles. Stands in for the globally loaded SDK
/// script; a host without one fails with [`AvatarError::NotLoaded`].
#[async_trait]
pub trait AvatarLoader: Send + Sync {
    async fn load(&self, settings: &AvatarSettings) -> Result<Box<dyn AvatarSdk>, AvatarError>;
}

/// Guards a renderer handle behind the init/destroy lifecycle.
pub struct AvatarService {
    settings: AvatarSettings,
    sdk: Option<Box<dyn AvatarSdk>>,
}

impl AvatarService {
    pub fn new(settings: AvatarSettings) -> Self {
        Self { settings, sdk: None }
    }

    pub async fn init(&mut self, loader: &dyn AvatarLoader) -> Result<(), AvatarError> {
        let sdk = loader.load(&self.settings).await?;
        self.sdk = Some(sdk);
        info!(gateway = %self.settings.gateway_server, "renderer initialized");
        Ok(())
    }

    fn sdk(&self) -> Result<&dyn AvatarSdk, AvatarError> {
        self.sdk.as_deref().ok_or(AvatarError::NotInitialized)
    }

    pub fn speak(&self, text: &str, is_start: bool, is_end: bool) -> Result<(), AvatarError> {
        self.sdk()?.speak(text, is_start, is_end);
        Ok(())
    }

    pub fn idle(&self) -> Result<(), AvatarError> {
        self.sdk()?.idle();
        Ok(())
    }

    pub fn interactive_idle(&self) -> Result<(), AvatarError> {
        self.sdk()?.interactive_idle();
        Ok(())
    }

    pub fn listen(&self) -> Result<(), AvatarError> {
        self.sdk()?.listen();
        Ok(())
    }

    pub fn think(&self) -> Result<(), AvatarError> {
        self.sdk()?.think();
        Ok(())
    }

    pub fn set_volume(&self, volume: f32) -> Result<(), AvatarError> {
        self.sdk()?.set_volume(volume);
        Ok(())
    }

    pub fn show_debug_info(&self) -> Result<(), AvatarError> {
        self.sdk()?.show_debug_info();
        Ok(())
    }

    pub fn hide_debug_info(&self) -> Result<(), AvatarError> {
        self.sdk()?.hide_debug_info();
        Ok(())
    }

    pub fn offline_mode(&self) -> Result<(), AvatarError> {
        self.sdk()?.offline_mode();
        Ok(())
    }

    pub fn online_mode(&self) -> Result<(), AvatarError> {
        self.sdk()?.online_mode();
        Ok(())
    }

    /// Tear down the renderer and return to the uninitialized state.
    pub fn destroy(&mut self) {
        if let Some(sdk) = self.sdk.take() {
            sdk.destroy();
            info!("renderer destroyed");
        }
    }

    pub fn is_initialized(&self) -> bool {
        self.sdk.is_some()
    }
}
