use anyhow::{Result, anyhow};
use base64::{Engine as _, engine::general_purpose};

/// Capabilities the mediator borrows from the surrounding browser runtime:
/// grabbing the visible surface as an image, opening a browsing context, and
/// raising the side panel. Injected so handlers are testable without a real
/// surface.
pub trait BrowserHost: Send + Sync {
    /// Capture the currently visible surface as a base64 data URL.
    fn capture_visible_tab(&self) -> Result<String>;

    /// Open a new browsing context at the given URL. Fire-and-forget.
    fn open_url(&self, url: &str) -> Result<()>;

    /// Raise the side panel surface.
    fn open_side_panel(&self) -> Result<()>;
}

/// Host backed by platform commands, for running the mediator as a desktop
/// companion process.
pub struct DesktopHost {
    panel_url: String,
}

impl DesktopHost {
    pub fn new(panel_url: &str) -> Self {
        Self {
            panel_url: panel_url.to_string(),
        }
    }
}

impl BrowserHost for DesktopHost {
    fn capture_visible_tab(&self) -> Result<String> {
        let file = tempfile::Builder::new()
            .prefix("tradebridge-capture-")
            .suffix(".png")
            .tempfile()
            .map_err(|e| anyhow!("Failed to create capture file: {}", e))?;
        let path = file.path().to_path_buf();

        capture_to(&path)?;

        let bytes =
            std::fs::read(&path).map_err(|e| anyhow!("Failed to read capture file: {}", e))?;
        if bytes.is_empty() {
            return Err(anyhow!("Capture produced an empty image"));
        }
        Ok(format!(
            "data:image/png;base64,{}",
            general_purpose::STANDARD.encode(&bytes)
        ))
    }

    fn open_url(&self, url: &str) -> Result<()> {
        #[cfg(target_os = "macos")]
        {
            std::process::Command::new("open").arg(url).spawn()?;
        }
        #[cfg(target_os = "linux")]
        {
            std::process::Command::new("xdg-open").arg(url).spawn()?;
        }
        #[cfg(target_os = "windows")]
        {
            std::process::Command::new("cmd")
                .args(["/c", "start", url])
                .spawn()?;
        }
        Ok(())
    }

    fn open_side_panel(&self) -> Result<()> {
        self.open_url(&self.panel_url)
    }
}

#[cfg(target_os = "macos")]
fn capture_to(path: &std::path::Path) -> Result<()> {
    let status = std::process::Command::new("screencapture")
        .arg("-x")
        .arg(path)
        .status()
        .map_err(|e| anyhow!("Failed to run screencapture: {}", e))?;
    if !status.success() {
        return Err(anyhow!("screencapture exited with {}", status));
    }
    Ok(())
}

#[cfg(target_os = "linux")]
fn capture_to(path: &std::path::Path) -> Result<()> {
    let status = std::process::Command::new("gnome-screenshot")
        .arg("-f")
        .arg(path)
        .status()
        .map_err(|e| anyhow!("Failed to run gnome-screenshot: {}", e))?;
    if !status.success() {
        return Err(anyhow!("gnome-screenshot exited with {}", status));
    }
    Ok(())
}

#[cfg(not(any(target_os = "macos", target_os = "linux")))]
fn capture_to(_path: &std::path::Path) -> Result<()> {
    Err(anyhow!("Screen capture is not supported on this platform"))
}

/// Scripted host for tests: records calls and returns canned results.
#[cfg(test)]
pub struct RecordingHost {
    pub capture_result: std::sync::Mutex<Result<String>>,
    pub opened_urls: std::sync::Mutex<Vec<String>>,
    pub panel_opens: std::sync::atomic::AtomicUsize,
}

#[cfg(test)]
impl RecordingHost {
    pub fn new() -> Self {
        Self {
            capture_result: std::sync::Mutex::new(Ok(
                "data:image/png;base64,iVBORw0KGgo=".to_string()
            )),
            opened_urls: std::sync::Mutex::new(Vec::new()),
            panel_opens: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    pub fn failing_capture(message: &str) -> Self {
        let host = Self::new();
        *host.capture_result.lock().unwrap() = Err(anyhow!("{}", message));
        host
    }
}

#[cfg(test)]
impl BrowserHost for RecordingHost {
    fn capture_visible_tab(&self) -> Result<String> {
        match &*self.capture_result.lock().unwrap() {
            Ok(shot) => Ok(shot.clone()),
            Err(e) => Err(anyhow!("{}", e)),
        }
    }

    fn open_url(&self, url: &str) -> Result<()> {
        self.opened_urls.lock().unwrap().push(url.to_string());
        Ok(())
    }

    fn open_side_panel(&self) -> Result<()> {
        self.panel_opens
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recording_host_tracks_opened_urls() {
        let host = RecordingHost::new();
        host.open_url("https://example.com/login").unwrap();
        assert_eq!(
            host.opened_urls.lock().unwrap().as_slice(),
            &["https://example.com/login".to_string()]
        );
    }

    #[test]
    fn recording_host_default_capture_is_data_url() {
        let host = RecordingHost::new();
        let shot = host.capture_visible_tab().unwrap();
        assert!(shot.starts_with("data:image/png;base64,"));
    }

    #[test]
    fn failing_capture_surfaces_error() {
        let host = RecordingHost::failing_capture("permission denied");
        let err = host.capture_visible_tab().unwrap_err();
        assert!(err.to_string().contains("permission denied"));
    }
}
