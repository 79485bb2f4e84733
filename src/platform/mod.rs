//! Platform adapters
//!
//! Each submodule declares the native SDK surface it drives (`sdk.rs`) and
//! implements the adapter contract on top of it. The two SDK families are
//! shaped like the engines they stand for: the Android side
//! reports through per-object listeners and completion callbacks, the iOS
//! side through a delegate object and notification observers.

pub mod android;
pub mod ios;
pub(crate) mod session;

use crate::core::config::Margins;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Persistent native event handler
pub type NativeListener<T> = Arc<dyn Fn(T) + Send + Sync + 'static>;

/// Failure reported by a native SDK call
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct NativeError(pub String);

impl NativeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type NativeResult<T> = std::result::Result<T, NativeError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Platform {
    Android,
    Ios,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Android => write!(f, "android"),
            Platform::Ios => write!(f, "ios"),
        }
    }
}

/// A rectangle in host view coordinates (points / density-independent pixels)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Frame {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Frame {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Shrink the frame by `margins`, never below zero size
    pub fn inset(&self, margins: &Margins) -> Frame {
        Frame {
            x: self.x + margins.left,
            y: self.y + margins.top,
            width: (self.width - margins.left - margins.right).max(0.0),
            height: (self.height - margins.top - margins.bottom).max(0.0),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.width <= 0.0 || self.height <= 0.0
    }
}
