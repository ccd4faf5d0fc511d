//! User-Friendly Error Formatting
//!
//! Provides user-friendly error messages with troubleshooting hints
//! for common error scenarios.

use std::fmt::Write;

use crate::protocol::ProtocolError;

/// Format error for user consumption
///
/// Takes technical error and produces user-friendly message with
/// troubleshooting steps and context.
pub fn format_user_error(error: &anyhow::Error) -> String {
    let mut output = String::new();

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "╔════════════════════════════════════════════════════════════╗"
    )
    .ok();
    writeln!(
        &mut output,
        "║                     ERROR                                  ║"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();
    writeln!(&mut output).ok();

    // Outer context plus every cause, so hints match wrapped errors too
    let error_msg = format!("{:#}", error);
    let rejected = error
        .chain()
        .find_map(|cause| match cause.downcast_ref::<ProtocolError>() {
            Some(ProtocolError::Rejected(reason)) => Some(reason.clone()),
            _ => None,
        });

    if let Some(reason) = rejected {
        format_rejected_error(&mut output, &reason);
    } else if error_msg.contains("Failed to connect") || error_msg.contains("refused") {
        format_connect_error(&mut output, &error_msg);
    } else if error_msg.contains("bind") || error_msg.contains("address") {
        format_network_error(&mut output, &error_msg);
    } else if error_msg.contains("config") {
        format_config_error(&mut output, &error_msg);
    } else {
        format_generic_error(&mut output, &error_msg);
    }

    writeln!(&mut output).ok();
    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Technical Details:").ok();
    writeln!(&mut output).ok();
    writeln!(&mut output, "{:#}", error).ok();
    writeln!(&mut output).ok();

    writeln!(
        &mut output,
        "━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━"
    )
    .ok();
    writeln!(&mut output, "Need Help?").ok();
    writeln!(
        &mut output,
        "  - Run with --verbose for detailed logs: cursor-timeline -vv <command>"
    )
    .ok();
    writeln!(
        &mut output,
        "  - Report issues: https://github.com/lamco-admin/cursor-timeline/issues"
    )
    .ok();
    writeln!(
        &mut output,
        "╚════════════════════════════════════════════════════════════╝"
    )
    .ok();

    output
}

fn format_rejected_error(output: &mut String, reason: &str) {
    writeln!(output, "Connection Rejected by Hub").ok();
    writeln!(output).ok();
    writeln!(output, "The hub refused this client: {}", reason).ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Another controller is already connected").ok();
    writeln!(output, "     → Only one owner may drive the cursor at a time").ok();
    writeln!(output, "     → Stop the other controller and retry").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Hub is full").ok();
    writeln!(output, "     → Raise [network] max_connections on the hub").ok();
    writeln!(output, "     → Or disconnect an idle observer").ok();
}

fn format_connect_error(output: &mut String, _error: &str) {
    writeln!(output, "Cannot Reach Hub").ok();
    writeln!(output).ok();
    writeln!(output, "Could not open a connection to the cursor hub.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Hub is not running").ok();
    writeln!(output, "     → Start it: cursor-timeline serve").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Wrong address or port").ok();
    writeln!(output, "     → Default hub port is 19876").ok();
    writeln!(
        output,
        "     → Example: cursor-timeline control --server 192.168.1.10:19876"
    )
    .ok();
    writeln!(output).ok();
    writeln!(output, "  3. Firewall blocks the port").ok();
    writeln!(output, "     → Check: sudo ss -tlnp | grep 19876 on the hub host").ok();
}

fn format_network_error(output: &mut String, _error: &str) {
    writeln!(output, "Network Binding Error").ok();
    writeln!(output).ok();
    writeln!(output, "Could not bind the hub's listen address.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Port 19876 already in use").ok();
    writeln!(output, "     → Check: sudo ss -tlnp | grep 19876").ok();
    writeln!(output, "     → Stop the other process or use --port").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Permission denied (port < 1024)").ok();
    writeln!(output, "     → Use port >= 1024").ok();
    writeln!(output).ok();
    writeln!(output, "  3. Invalid listen address").ok();
    writeln!(output, "     → Should be: 'IP:PORT' like '0.0.0.0:19876'").ok();
}

fn format_config_error(output: &mut String, _error: &str) {
    writeln!(output, "Configuration Error").ok();
    writeln!(output).ok();
    writeln!(output, "Problem with configuration file.").ok();
    writeln!(output).ok();
    writeln!(output, "Common Causes:").ok();
    writeln!(output).ok();
    writeln!(output, "  1. Invalid TOML syntax").ok();
    writeln!(output, "     → Check for typos, missing quotes, etc.").ok();
    writeln!(output).ok();
    writeln!(output, "  2. Out-of-range values").ok();
    writeln!(output, "     → [smoothing] window and [network] tick_rate_hz must be > 0").ok();
    writeln!(output, "     → Plane normals and ray directions must be non-zero").ok();
    writeln!(output, "     → [projection] mode is \"single\" or \"dual\"").ok();
}

fn format_generic_error(output: &mut String, error: &str) {
    writeln!(output, "Runtime Error").ok();
    writeln!(output).ok();
    writeln!(output, "An error occurred: {}", error).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_rejected_is_recognised_through_context() {
        let error = anyhow::Error::from(ProtocolError::Rejected("server full".into()))
            .context("Handshake failed");
        let text = format_user_error(&error);
        assert!(text.contains("Connection Rejected by Hub"));
        assert!(text.contains("server full"));
    }

    #[test]
    fn test_bind_error_hint() {
        let io = std::io::Error::new(std::io::ErrorKind::AddrInUse, "in use");
        let error = Err::<(), _>(io).context("Failed to bind 0.0.0.0:19876").unwrap_err();
        assert!(format_user_error(&error).contains("Network Binding Error"));
    }

    #[test]
    fn test_connect_error_hint() {
        let error = anyhow::anyhow!("Failed to connect to 127.0.0.1:1");
        assert!(format_user_error(&error).contains("Cannot Reach Hub"));
    }

    #[test]
    fn test_generic_error() {
        let error = anyhow::anyhow!("something odd");
        let text = format_user_error(&error);
        assert!(text.contains("Runtime Error"));
        assert!(text.contains("something odd"));
    }
}
