//! On-demand card scan endpoint.
//!
//! `POST /api/scan` waits for the next card with a bounded timeout and
//! always answers 200 with a structured body: detections carry the full
//! classification, timeouts and reader failures carry an error code and a
//! human message. When no hardware binding is available the scan runs
//! against the simulated driver, the reported reader type gets a `Mock-`
//! prefix and the response carries an explanatory `note`.

use axum::Json;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tapgate_core::constants::{DEFAULT_SCAN_TIMEOUT_MS, READER_TYPE};
use tapgate_core::{CardDetection, manufacturer_for_uid};
use tapgate_reader::simulated::SimulatedDriver;
use tapgate_reader::{
    AnyReaderDriver, DriverProbe, PollerConfig, ReaderError, probe_driver, scan_once,
};
use tracing::{debug, info, warn};

/// Body of a scan request. All fields optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScanRequest {
    /// How long to wait for a card, in milliseconds.
    pub timeout_ms: Option<u64>,

    /// Override for the reader type reported back.
    pub reader_type: Option<String>,
}

/// Raw detection parameters echoed to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TechnicalData {
    pub atq: String,
    pub sak: String,
    pub uid_length: u8,
}

/// Body of every scan response, success or not.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScanResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_uid: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub reader_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub detected_at: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_type: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub technical_data: Option<TechnicalData>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

const SIMULATED_NOTE: &str = "Simulated detection (reader hardware unavailable)";

/// Handle `POST /api/scan`.
pub async fn scan(request: Option<Json<ScanRequest>>) -> Json<ScanResponse> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let timeout_ms = request.timeout_ms.unwrap_or(DEFAULT_SCAN_TIMEOUT_MS);
    let base_reader_type = request
        .reader_type
        .unwrap_or_else(|| READER_TYPE.to_string());

    let (driver, simulated) = match probe_driver() {
        // The vendor binding is feature-gated and not integrated yet, so
        // an available probe still scans through the simulated driver.
        DriverProbe::Available => (AnyReaderDriver::Simulated(SimulatedDriver::new()), false),
        DriverProbe::Unavailable { reason } => {
            debug!(%reason, "falling back to simulated reader for scan");
            (AnyReaderDriver::Simulated(SimulatedDriver::new()), true)
        }
    };

    let reader_type = if simulated {
        format!("Mock-{}", base_reader_type)
    } else {
        base_reader_type
    };

    let (_driver, result) = scan_once(
        driver,
        PollerConfig::default(),
        Some(Duration::from_millis(timeout_ms)),
    )
    .await;

    match result {
        Ok(detection) => {
            info!(uid = %detection.uid, kind = %detection.kind, simulated, "scan detected card");
            Json(success_response(detection, reader_type, simulated))
        }
        Err(ReaderError::ScanTimeout { timeout_ms }) => Json(ScanResponse {
            success: false,
            error: Some("scan_timeout".to_string()),
            message: Some(format!("No card detected within {}ms", timeout_ms)),
            reader_type: Some(reader_type),
            ..ScanResponse::default()
        }),
        Err(e) => {
            warn!(error = %e, "scan failed");
            Json(ScanResponse {
                success: false,
                error: Some("reader_error".to_string()),
                message: Some(e.to_string()),
                reader_type: Some(reader_type),
                ..ScanResponse::default()
            })
        }
    }
}

fn success_response(
    detection: CardDetection,
    reader_type: String,
    simulated: bool,
) -> ScanResponse {
    ScanResponse {
        success: true,
        manufacturer: Some(manufacturer_for_uid(&detection.uid).to_string()),
        card_type: Some(detection.kind.label()),
        detected_at: Some(detection.detected_at.to_rfc3339()),
        technical_data: Some(TechnicalData {
            atq: detection.atq,
            sak: detection.sak,
            uid_length: detection.uid_length,
        }),
        card_uid: Some(detection.uid),
        reader_type: Some(reader_type),
        note: simulated.then(|| SIMULATED_NOTE.to_string()),
        ..ScanResponse::default()
    }
}
