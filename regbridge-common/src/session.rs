use zenoh::Session;

use crate::config::{TlsConfig, ZenohConfig};
use crate::error::{Error, Result};

/// Connect to Zenoh using the provided configuration.
///
/// When a TLS section is present the referenced files are checked before the
/// session is opened, and the device certificate is presented for mutual TLS.
pub async fn connect(config: &ZenohConfig) -> Result<Session> {
    let mut zenoh_config = zenoh::Config::default();

    // Set mode
    let mode_str = match config.mode.as_str() {
        "client" | "peer" | "router" => format!("\"{}\"", config.mode),
        other => {
            return Err(Error::Config(format!(
                "Invalid Zenoh mode: '{}'. Expected 'client', 'peer', or 'router'",
                other
            )));
        }
    };

    zenoh_config
        .insert_json5("mode", &mode_str)
        .map_err(|e| Error::Config(format!("Failed to set mode: {}", e)))?;

    // Set connect endpoints
    if !config.connect.is_empty() {
        let endpoints_json = serde_json::to_string(&config.connect)
            .map_err(|e| Error::Config(format!("Failed to serialize connect endpoints: {}", e)))?;

        zenoh_config
            .insert_json5("connect/endpoints", &endpoints_json)
            .map_err(|e| Error::Config(format!("Failed to set connect endpoints: {}", e)))?;
    }

    // Set listen endpoints
    if !config.listen.is_empty() {
        let endpoints_json = serde_json::to_string(&config.listen)
            .map_err(|e| Error::Config(format!("Failed to serialize listen endpoints: {}", e)))?;

        zenoh_config
            .insert_json5("listen/endpoints", &endpoints_json)
            .map_err(|e| Error::Config(format!("Failed to set listen endpoints: {}", e)))?;
    }

    if let Some(tls) = &config.tls {
        apply_tls(&mut zenoh_config, tls)?;
    }

    tracing::info!(
        mode = %config.mode,
        connect = ?config.connect,
        listen = ?config.listen,
        tls = config.tls.is_some(),
        "Connecting to Zenoh"
    );

    let session = zenoh::open(zenoh_config).await?;

    tracing::info!(zid = %session.zid(), "Connected to Zenoh");

    Ok(session)
}

fn apply_tls(zenoh_config: &mut zenoh::Config, tls: &TlsConfig) -> Result<()> {
    tls.verify_files()?;

    let mut entries = vec![
        (
            "transport/link/tls/connect_certificate",
            tls.connect_certificate.display().to_string(),
        ),
        (
            "transport/link/tls/connect_private_key",
            tls.connect_private_key.display().to_string(),
        ),
    ];
    if let Some(ca) = &tls.root_ca_certificate {
        entries.push(("transport/link/tls/root_ca_certificate", ca.display().to_string()));
    }

    for (key, path) in entries {
        let value = serde_json::to_string(&path)?;
        zenoh_config
            .insert_json5(key, &value)
            .map_err(|e| Error::Tls(format!("Failed to set {}: {}", key, e)))?;
    }

    zenoh_config
        .insert_json5("transport/link/tls/enable_mtls", "true")
        .map_err(|e| Error::Tls(format!("Failed to enable mTLS: {}", e)))?;

    Ok(())
}
