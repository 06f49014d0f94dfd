use crate::config::Config;
use insight_client::kakao::{self, KakaoError, KakaoShare};
use insight_core::Capabilities;
use insight_host::clipboard::{self, Clipboard, ClipboardError, CopyAck, SystemClipboard};
use insight_host::download::{self, DownloadError};
use insight_host::share::{self, SharePayload, ShareTarget};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ActionError {
    #[error("{0} is not available on this host")]
    Unavailable(&'static str),
    #[error(transparent)]
    Clipboard(#[from] ClipboardError),
    #[error(transparent)]
    Kakao(#[from] KakaoError),
    #[error(transparent)]
    Download(#[from] DownloadError),
}

/// Result actions, wired to whatever the host offers.
///
/// Capabilities are probed once in [`ResultActions::detect`] and never re-polled.
pub struct ResultActions {
    caps: Capabilities,
    clipboard: Option<Arc<dyn Clipboard>>,
    ack: CopyAck,
    share: Option<Arc<dyn ShareTarget>>,
    kakao: Option<KakaoShare>,
    share_url: Option<String>,
    download_dir: PathBuf,
}

impl ResultActions {
    /// Probe clipboard, share command and Kakao access token.
    pub fn detect(config: &Config) -> Self {
        let clipboard: Option<Arc<dyn Clipboard>> = match SystemClipboard::spawn() {
            Ok(c) => Some(Arc::new(c)),
            Err(err) => {
                tracing::warn!(error = %err, "clipboard unavailable; copy disabled");
                None
            }
        };
        let share = share::detect(config.share_command.as_deref())
            .map(|s| Arc::new(s) as Arc<dyn ShareTarget>);
        let kakao = KakaoShare::init(
            config.kakao_access_token.as_deref(),
            &config.kakao_api_base_url,
            config.request_timeout(),
        );
        Self::new(
            clipboard,
            share,
            kakao,
            config.share_url.clone(),
            config.download_dir.clone(),
        )
    }

    pub fn new(
        clipboard: Option<Arc<dyn Clipboard>>,
        share: Option<Arc<dyn ShareTarget>>,
        kakao: Option<KakaoShare>,
        share_url: Option<String>,
        download_dir: PathBuf,
    ) -> Self {
        let caps = Capabilities {
            clipboard: clipboard.is_some(),
            native_share: share.is_some(),
            chat_share: kakao.is_some(),
        };
        tracing::info!(
            clipboard = caps.clipboard,
            native_share = caps.native_share,
            chat_share = caps.chat_share,
            "host capabilities"
        );
        Self {
            caps,
            clipboard,
            ack: CopyAck::new(),
            share,
            kakao,
            share_url,
            download_dir,
        }
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    pub fn copy_ack(&self) -> &CopyAck {
        &self.ack
    }

    pub async fn copy(&self, text: &str) -> Result<(), ActionError> {
        let clipboard = self
            .clipboard
            .as_deref()
            .ok_or(ActionError::Unavailable("clipboard"))?;
        clipboard::copy_text(clipboard, &self.ack, text).await?;
        Ok(())
    }

    /// Native share. Returns whether the share went through; failures are only logged.
    pub async fn share(&self, text: &str) -> Result<bool, ActionError> {
        let target = self
            .share
            .as_deref()
            .ok_or(ActionError::Unavailable("native share"))?;
        let payload = SharePayload::new(text, self.share_url.as_deref());
        Ok(share::share_quietly(target, &payload).await)
    }

    pub async fn chat_share(&self, text: &str) -> Result<(), ActionError> {
        kakao::share(self.kakao.as_ref(), text, self.share_url.as_deref()).await?;
        Ok(())
    }

    pub fn download(&self, text: &str) -> Result<PathBuf, ActionError> {
        Ok(download::save_text(&self.download_dir, text)?)
    }
}
