//! Recognition collaborator interfaces.
//!
//! Face-feature extraction and gesture classification are external model
//! concerns: sessions talk to them through the `FaceMatcher` and
//! `GestureDetector` traits, resolved once at startup and injected. The
//! bundled `RemoteRecognizer` calls a model sidecar over HTTP for inference
//! and resolves identities with a nearest-template scan over the stored
//! embeddings.

use async_trait::async_trait;
use base64::Engine;
use db::models::face_template;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use util::config::AppConfig;

pub type FaceVector = Vec<f64>;

/// Gesture kinds used for enrollment captures and liveness challenges.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Gesture {
    Normal,
    Sonrisa,
    Giro,
    Cejas,
}

impl Gesture {
    /// Enrollment capture order: the reference gesture plus each validated
    /// one. `None` means the capture needs no gesture check.
    pub const ENROLLMENT_SEQUENCE: [(Gesture, Option<Gesture>); 3] = [
        (Gesture::Normal, None),
        (Gesture::Sonrisa, Some(Gesture::Sonrisa)),
        (Gesture::Giro, Some(Gesture::Giro)),
    ];

    /// Pool a verification session draws its single random challenge from.
    pub const CHALLENGES: [Gesture; 3] = [Gesture::Sonrisa, Gesture::Giro, Gesture::Cejas];

    pub fn as_str(&self) -> &'static str {
        match self {
            Gesture::Normal => "normal",
            Gesture::Sonrisa => "sonrisa",
            Gesture::Giro => "giro",
            Gesture::Cejas => "cejas",
        }
    }
}

impl std::fmt::Display for Gesture {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("recognizer request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("database error: {0}")]
    Database(#[from] DbErr),
    #[error("stored template is corrupt: {0}")]
    CorruptTemplate(#[from] serde_json::Error),
}

/// Opaque biometric matcher: turns an image into a face vector and a vector
/// into the closest enrolled identity.
#[async_trait]
pub trait FaceMatcher: Send + Sync {
    /// `Ok(None)` when no face is present in the image.
    async fn extract(&self, image: &[u8]) -> Result<Option<FaceVector>, RecognitionError>;

    /// Nearest enrolled identity and its distance, if any is close enough.
    async fn best_match(&self, vector: &FaceVector)
    -> Result<Option<(i64, f64)>, RecognitionError>;
}

/// Opaque gesture classifier.
#[async_trait]
pub trait GestureDetector: Send + Sync {
    async fn detect(&self, image: &[u8], gesture: Gesture) -> Result<bool, RecognitionError>;
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    image: &'a str,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    embedding: Option<FaceVector>,
}

#[derive(Serialize)]
struct GestureRequest<'a> {
    image: &'a str,
    gesture: &'a str,
}

#[derive(Deserialize)]
struct GestureResponse {
    detected: bool,
}

/// HTTP client for the model sidecar plus a linear nearest-template scan for
/// identity resolution.
pub struct RemoteRecognizer {
    http: reqwest::Client,
    base_url: String,
    match_threshold: f64,
    db: DatabaseConnection,
}

impl RemoteRecognizer {
    pub fn new(db: DatabaseConnection) -> Self {
        let config = AppConfig::global();
        Self::with_endpoint(db, config.recognizer_url.clone(), config.match_threshold)
    }

    pub fn with_endpoint(db: DatabaseConnection, base_url: String, match_threshold: f64) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url,
            match_threshold,
            db,
        }
    }

    fn encode(image: &[u8]) -> String {
        base64::engine::general_purpose::STANDARD.encode(image)
    }
}

#[async_trait]
impl FaceMatcher for RemoteRecognizer {
    async fn extract(&self, image: &[u8]) -> Result<Option<FaceVector>, RecognitionError> {
        let response: EmbeddingResponse = self
            .http
            .post(format!("{}/embeddings", self.base_url))
            .json(&EmbeddingRequest {
                image: &Self::encode(image),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.embedding)
    }

    async fn best_match(
        &self,
        vector: &FaceVector,
    ) -> Result<Option<(i64, f64)>, RecognitionError> {
        let templates = face_template::Entity::find().all(&self.db).await?;

        let mut best: Option<(i64, f64)> = None;
        for template in &templates {
            let stored = template.vector()?;
            let distance = euclidean_distance(vector, &stored);
            if best.is_none_or(|(_, d)| distance < d) {
                best = Some((template.employee_id, distance));
            }
        }

        Ok(best.filter(|(_, distance)| *distance <= self.match_threshold))
    }
}

#[async_trait]
impl GestureDetector for RemoteRecognizer {
    async fn detect(&self, image: &[u8], gesture: Gesture) -> Result<bool, RecognitionError> {
        let response: GestureResponse = self
            .http
            .post(format!("{}/gestures", self.base_url))
            .json(&GestureRequest {
                image: &Self::encode(image),
                gesture: gesture.as_str(),
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.detected)
    }
}

/// Straight-line distance between two embeddings; mismatched dimensions never
/// match anything.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    if a.len() != b.len() {
        return f64::INFINITY;
    }
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}
