//! ==============================================================================
//! alert.rs - hysteresis alert state machine
//! ==============================================================================
//!
//! purpose:
//!     decides when to tell the user to turn the air purifier up or down.
//!
//!         INACTIVE ──[aqi >= 50 + h]──▶ ACTIVE     (worsening notification)
//!         ACTIVE   ──[aqi <= 50 - h]──▶ INACTIVE   (improving notification)
//!
//!     anything in between is a dead zone: no transition, no notification.
//!
//! ownership:
//!     the sampling loop owns the current AlertState and feeds it back in
//!     each cycle. there is no global flag.
//!
//! ==============================================================================

use crate::domain::{AirQualityIndex, AqiLevel};

/// aqi the hysteresis band is centred on
pub const ALERT_THRESHOLD: u16 = 50;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AlertState {
    #[default]
    Inactive,
    Active,
}

/// emitted on a state transition
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AlertEvent {
    Worsening(AqiLevel),
    Improving(AqiLevel),
}

impl AlertEvent {
    /// notification text sent to the user
    pub fn message(&self) -> String {
        match self {
            AlertEvent::Worsening(level) => format!(
                "The current air quality level is {}, consider turning on or \
                 increasing the speed of your air purifier.",
                level
            ),
            AlertEvent::Improving(level) => format!(
                "The air quality level has returned to {}, consider turning off or \
                 reducing the speed of your air purifier to reduce energy consumption.",
                level
            ),
        }
    }
}

impl AlertState {
    /// apply one cycle's index; returns the next state and the event, if any
    pub fn next(self, index: &AirQualityIndex, hysteresis: u16) -> (AlertState, Option<AlertEvent>) {
        let raise_at = ALERT_THRESHOLD.saturating_add(hysteresis);
        // with hysteresis > 50 the clear point is 0, so only aqi 0 clears
        let clear_at = ALERT_THRESHOLD.saturating_sub(hysteresis);

        match self {
            AlertState::Inactive if index.value >= raise_at => {
                (AlertState::Active, Some(AlertEvent::Worsening(index.level)))
            }
            AlertState::Active if index.value <= clear_at => {
                (AlertState::Inactive, Some(AlertEvent::Improving(index.level)))
            }
            state => (state, None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aqi::classify;

    fn index(value: u16) -> AirQualityIndex {
        AirQualityIndex { value, level: classify(value) }
    }

    fn run(sequence: &[u16], hysteresis: u16) -> Vec<(AlertState, Option<AlertEvent>)> {
        let mut state = AlertState::default();
        sequence
            .iter()
            .map(|&aqi| {
                let (next, event) = state.next(&index(aqi), hysteresis);
                state = next;
                (next, event)
            })
            .collect()
    }

    #[test]
    fn test_starts_inactive() {
        assert_eq!(AlertState::default(), AlertState::Inactive);
    }

    #[test]
    fn test_reference_sequence() {
        let steps = run(&[40, 61, 45, 39], 10);

        assert_eq!(steps[0], (AlertState::Inactive, None));
        assert_eq!(
            steps[1],
            (AlertState::Active, Some(AlertEvent::Worsening(AqiLevel::Moderate)))
        );
        // dead zone
        assert_eq!(steps[2], (AlertState::Active, None));
        assert_eq!(
            steps[3],
            (AlertState::Inactive, Some(AlertEvent::Improving(AqiLevel::Good)))
        );
    }

    #[test]
    fn test_boundaries_are_inclusive() {
        let (state, event) = AlertState::Inactive.next(&index(60), 10);
        assert_eq!(state, AlertState::Active);
        assert!(event.is_some());

        let (state, event) = AlertState::Inactive.next(&index(59), 10);
        assert_eq!(state, AlertState::Inactive);
        assert!(event.is_none());

        let (state, event) = AlertState::Active.next(&index(40), 10);
        assert_eq!(state, AlertState::Inactive);
        assert!(event.is_some());

        let (state, event) = AlertState::Active.next(&index(41), 10);
        assert_eq!(state, AlertState::Active);
        assert!(event.is_none());
    }

    #[test]
    fn test_no_repeat_notification_while_active() {
        let steps = run(&[70, 80, 90, 200], 10);
        let events = steps.iter().filter(|(_, e)| e.is_some()).count();
        assert_eq!(events, 1);
        assert!(steps.iter().all(|(s, _)| *s == AlertState::Active));
    }

    #[test]
    fn test_zero_hysteresis_toggles_on_threshold() {
        let steps = run(&[50, 50, 49, 50], 0);
        assert_eq!(steps[0].0, AlertState::Active);
        assert_eq!(steps[1].0, AlertState::Inactive);
        assert_eq!(steps[2].0, AlertState::Inactive);
        assert_eq!(steps[3].0, AlertState::Active);
    }

    #[test]
    fn test_large_hysteresis_saturates() {
        let (state, _) = AlertState::Inactive.next(&index(999), 60);
        assert_eq!(state, AlertState::Active);
        let (state, _) = state.next(&index(1), 60);
        assert_eq!(state, AlertState::Active);
        let (state, _) = state.next(&index(0), 60);
        assert_eq!(state, AlertState::Inactive);
    }

    #[test]
    fn test_messages_carry_level_label() {
        let worse = AlertEvent::Worsening(AqiLevel::UnhealthyForSome).message();
        assert!(worse.starts_with("The current air quality level is UNHEALTHY FOR SOME,"));
        assert!(worse.contains("air purifier"));

        let better = AlertEvent::Improving(AqiLevel::Good).message();
        assert!(better.starts_with("The air quality level has returned to GOOD,"));
        assert!(better.ends_with("reduce energy consumption."));
    }
}
