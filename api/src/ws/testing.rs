//! Scripted doubles for exercising session state machines without a socket or
//! a model sidecar.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use base64::Engine;
use sea_orm::DatabaseConnection;
use serde_json::{Value, json};
use services::recognition::{FaceMatcher, FaceVector, Gesture, GestureDetector, RecognitionError};

use crate::state::AppState;
use crate::ws::channel::{Channel, ChannelError};

pub fn test_state(
    db: DatabaseConnection,
    matcher: Arc<dyn FaceMatcher>,
    detector: Arc<dyn GestureDetector>,
) -> AppState {
    AppState::new(db, matcher, detector)
}

fn tiny_frame() -> String {
    base64::engine::general_purpose::STANDARD.encode(b"frame")
}

/// Session-opening message carrying an image and the claimed punch time.
pub fn start_message(timestamp: &str) -> Value {
    json!({
        "imagen": tiny_frame(),
        "fecha_hora": timestamp,
    })
}

/// A follow-up message with a single base64 image under `field`.
pub fn image_message(field: &str) -> Value {
    json!({ field: tiny_frame() })
}

/// Channel fed from a fixed queue of incoming messages; records everything
/// sent. An exhausted queue behaves like a closed connection.
pub struct ScriptedChannel {
    incoming: VecDeque<Value>,
    pub sent: Vec<String>,
}

impl ScriptedChannel {
    pub fn new(incoming: Vec<Value>) -> Self {
        Self {
            incoming: incoming.into(),
            sent: Vec::new(),
        }
    }
}

#[async_trait]
impl Channel for ScriptedChannel {
    async fn recv_json(&mut self) -> Result<Value, ChannelError> {
        self.incoming.pop_front().ok_or(ChannelError::Closed)
    }

    async fn send_text(&mut self, text: &str) {
        self.sent.push(text.to_owned());
    }
}

/// Matcher with a per-call face script (falling back to a default) and a
/// fixed identity answer.
pub struct FakeMatcher {
    face_script: Mutex<VecDeque<bool>>,
    sees_face_by_default: bool,
    matched: Option<i64>,
}

impl FakeMatcher {
    /// Sees a face everywhere and resolves it to `employee_id`.
    pub fn recognizing(employee_id: i64) -> Self {
        Self {
            face_script: Mutex::new(VecDeque::new()),
            sees_face_by_default: true,
            matched: Some(employee_id),
        }
    }

    /// Sees faces but never resolves an identity.
    pub fn unmatched() -> Self {
        Self {
            matched: None,
            ..Self::recognizing(0)
        }
    }

    /// Extraction succeeds everywhere; identity resolution is unused.
    pub fn always_extracting() -> Self {
        Self::unmatched()
    }

    pub fn never_sees_a_face() -> Self {
        Self {
            face_script: Mutex::new(VecDeque::new()),
            sees_face_by_default: false,
            matched: None,
        }
    }

    /// Overrides face detection per extraction call, in order; the default
    /// applies once the script runs out.
    pub fn with_face_script(mut self, script: Vec<bool>) -> Self {
        self.face_script = Mutex::new(script.into());
        self
    }
}

#[async_trait]
impl FaceMatcher for FakeMatcher {
    async fn extract(&self, _image: &[u8]) -> Result<Option<FaceVector>, RecognitionError> {
        let sees_face = self
            .face_script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.sees_face_by_default);
        Ok(sees_face.then(|| vec![0.1, 0.2, 0.3]))
    }

    async fn best_match(
        &self,
        _vector: &FaceVector,
    ) -> Result<Option<(i64, f64)>, RecognitionError> {
        Ok(self.matched.map(|employee_id| (employee_id, 0.12)))
    }
}

/// Detector answering from a script, then from a fixed default.
pub struct FakeDetector {
    script: Mutex<VecDeque<bool>>,
    default: bool,
}

impl FakeDetector {
    pub fn always(detected: bool) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            default: detected,
        }
    }

    pub fn scripted(script: Vec<bool>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            default: false,
        }
    }
}

#[async_trait]
impl GestureDetector for FakeDetector {
    async fn detect(&self, _image: &[u8], _gesture: Gesture) -> Result<bool, RecognitionError> {
        Ok(self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(self.default))
    }
}
