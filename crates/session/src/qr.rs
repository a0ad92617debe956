//! Terminal rendering of the pairing payload.

use tracing::{info, warn};

use crate::error::{Error, Result};

/// Render a pairing payload into terminal-friendly unicode blocks.
pub fn render_pairing_qr(code: &str) -> Result<String> {
    let payload = code.trim();
    if payload.is_empty() {
        return Err(Error::connect("pairing payload is empty"));
    }

    let qr = qrcode::QrCode::new(payload.as_bytes())
        .map_err(|e| Error::connect(format!("failed to encode pairing payload: {e}")))?;

    Ok(qr
        .render::<qrcode::render::unicode::Dense1x2>()
        .quiet_zone(true)
        .build())
}

/// Print the pairing code to the terminal, falling back to the raw
/// payload if rendering fails.
pub fn print_pairing_code(code: &str) {
    match render_pairing_qr(code) {
        Ok(rendered) => {
            eprintln!();
            eprintln!("Scan this code with the messaging app (Linked Devices):");
            eprintln!("{rendered}");
            eprintln!();
        },
        Err(e) => {
            warn!(error = %e, "failed to render pairing code in terminal");
            info!(payload = code, "pairing payload");
        },
    }
}
