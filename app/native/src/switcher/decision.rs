//! Mode decisions.
//!
//! Pure predicates over the connection registry that decide whether the
//! device should enter or leave duplex mode. They are only evaluated once
//! the event stream has settled.

use super::classifier::ClientClassifier;
use super::controller::DeviceMode;
use super::event::StreamKind;
use super::registry::ConnectionRegistry;

/// Returns whether the device should switch to duplex mode.
///
/// True when at least one tracked output and one tracked input are live,
/// regardless of which clients own them.
#[must_use]
pub fn should_enter_duplex(registry: &ConnectionRegistry) -> bool {
    registry.len(StreamKind::Output) > 0 && registry.len(StreamKind::Input) > 0
}

/// Returns whether the device may switch back to stereo mode.
///
/// Always false outside duplex mode. In duplex mode the device has to stay
/// while any client holds a stream, except for a persistent speaker that
/// holds only its output stream.
#[must_use]
pub fn should_leave_duplex(
    registry: &ConnectionRegistry,
    mode: DeviceMode,
    classifier: &ClientClassifier,
) -> bool {
    if mode != DeviceMode::Duplex {
        return false;
    }

    registry.holdings().into_iter().all(|(client, held)| {
        held.kinds() == 0
            || (classifier.is_persistent_speaker(client) && held.output && !held.input)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ClientsConfig;

    fn classifier() -> ClientClassifier {
        ClientClassifier::new(&ClientsConfig {
            allow: vec!["Skype".into(), "Google Chrome".into()],
            persistent_speakers: vec!["Google Chrome".into()],
            ..ClientsConfig::default()
        })
        .unwrap()
    }

    fn registry(entries: &[(StreamKind, u32, &str)]) -> ConnectionRegistry {
        let mut registry = ConnectionRegistry::new();
        for (kind, id, client) in entries {
            registry.insert(*kind, *id, *client);
        }
        registry
    }

    #[test]
    fn enter_is_false_for_empty_registry() {
        assert!(!should_enter_duplex(&ConnectionRegistry::new()));
    }

    #[test]
    fn enter_requires_both_kinds() {
        let outputs_only = registry(&[(StreamKind::Output, 5, "Skype")]);
        let inputs_only = registry(&[(StreamKind::Input, 7, "Skype")]);
        assert!(!should_enter_duplex(&outputs_only));
        assert!(!should_enter_duplex(&inputs_only));
    }

    #[test]
    fn enter_when_output_and_input_are_live() {
        let both = registry(&[(StreamKind::Output, 5, "Skype"), (StreamKind::Input, 7, "Skype")]);
        assert!(should_enter_duplex(&both));
    }

    #[test]
    fn enter_does_not_require_the_same_client() {
        let mixed = registry(&[
            (StreamKind::Output, 5, "Google Chrome"),
            (StreamKind::Input, 7, "Skype"),
        ]);
        assert!(should_enter_duplex(&mixed));
    }

    #[test]
    fn leave_is_false_outside_duplex() {
        assert!(!should_leave_duplex(&ConnectionRegistry::new(), DeviceMode::Stereo, &classifier()));
    }

    #[test]
    fn leave_when_nothing_is_tracked() {
        assert!(should_leave_duplex(&ConnectionRegistry::new(), DeviceMode::Duplex, &classifier()));
    }

    #[test]
    fn stay_while_regular_client_holds_any_stream() {
        let classifier = classifier();
        let output = registry(&[(StreamKind::Output, 5, "Skype")]);
        let input = registry(&[(StreamKind::Input, 7, "Skype")]);
        assert!(!should_leave_duplex(&output, DeviceMode::Duplex, &classifier));
        assert!(!should_leave_duplex(&input, DeviceMode::Duplex, &classifier));
    }

    #[test]
    fn leave_when_only_persistent_speaker_output_remains() {
        let residual = registry(&[(StreamKind::Output, 5, "Google Chrome")]);
        assert!(should_leave_duplex(&residual, DeviceMode::Duplex, &classifier()));
    }

    #[test]
    fn stay_while_persistent_speaker_holds_both_kinds() {
        let both = registry(&[
            (StreamKind::Output, 5, "Google Chrome"),
            (StreamKind::Input, 6, "Google Chrome"),
        ]);
        assert!(!should_leave_duplex(&both, DeviceMode::Duplex, &classifier()));
    }

    #[test]
    fn stay_while_persistent_speaker_holds_only_input() {
        let input = registry(&[(StreamKind::Input, 6, "Google Chrome")]);
        assert!(!should_leave_duplex(&input, DeviceMode::Duplex, &classifier()));
    }

    #[test]
    fn regular_client_blocks_persistent_residual() {
        let mixed = registry(&[
            (StreamKind::Output, 5, "Google Chrome"),
            (StreamKind::Output, 8, "Skype"),
        ]);
        assert!(!should_leave_duplex(&mixed, DeviceMode::Duplex, &classifier()));
    }
}
