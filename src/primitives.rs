//! Failure-isolating wrappers around single browser operations.
//!
//! Each primitive performs exactly one operation and reports the outcome as
//! a value. Faults from the browser never cross this boundary; they are
//! logged and turned into `false` / `None`.

use std::time::Duration;

use tracing::{info, warn};

use crate::hands::Page;

pub async fn safe_goto<P: Page + ?Sized>(page: &P, url: &str, timeout: Duration) -> bool {
    match page.goto(url, timeout).await {
        Ok(()) => {
            info!("[Success] navigated to {}", url);
            true
        }
        Err(e) => {
            warn!("[Failure] failed to navigate to {}: {:#}", url, e);
            false
        }
    }
}

pub async fn safe_click<P: Page + ?Sized>(page: &P, selector: &str, timeout: Duration) -> bool {
    match page.click(selector, timeout).await {
        Ok(()) => {
            info!("[Success] clicked {}", selector);
            true
        }
        Err(e) => {
            warn!("[Failure] failed to click {}: {:#}", selector, e);
            false
        }
    }
}

pub async fn safe_fill<P: Page + ?Sized>(
    page: &P,
    selector: &str,
    text: &str,
    timeout: Duration,
) -> bool {
    match page.fill(selector, text, timeout).await {
        Ok(()) => {
            info!("[Success] filled {}", selector);
            true
        }
        Err(e) => {
            warn!("[Failure] failed to fill {}: {:#}", selector, e);
            false
        }
    }
}

/// Text of the first element matching `selector`, or `None` on any fault.
pub async fn safe_get_text<P: Page + ?Sized>(
    page: &P,
    selector: &str,
    timeout: Duration,
) -> Option<String> {
    match page.text_content(selector, timeout).await {
        Ok(text) => Some(text),
        Err(e) => {
            warn!("[Failure] failed to get text from {}: {:#}", selector, e);
            None
        }
    }
}
