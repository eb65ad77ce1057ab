//! Per-connection protocol status.

/// Ordinal exported for connections that have not started an upgrade.
pub const STATUS_CONNECTION: u8 = ProtocolStatus::Uninitialized.as_u8();
/// Ordinal exported for connections whose upgrade request was recognized.
pub const STATUS_HANDSHAKE: u8 = ProtocolStatus::Handshaking.as_u8();
/// Ordinal exported for connections that completed the handshake.
pub const STATUS_ACTIVE: u8 = ProtocolStatus::Active.as_u8();
/// Older name for [`STATUS_ACTIVE`].
pub const STATUS_FRAME: u8 = STATUS_ACTIVE;

/// WebSocket protocol status of one connection.
///
/// Variants are ordered: a connection's status only ever moves up this
/// order, see [`ProtocolStatus::advance`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[repr(u8)]
pub enum ProtocolStatus {
    /// Fresh connection, no upgrade seen.
    #[default]
    Uninitialized = 0,
    /// Upgrade request recognized by the HTTP layer.
    Handshaking = 1,
    /// Handshake response sent and open event dispatched.
    Active = 2,
}

impl ProtocolStatus {
    /// Raw ordinal value.
    #[inline]
    #[must_use]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Status for a raw ordinal, if it names one.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(ProtocolStatus::Uninitialized),
            1 => Some(ProtocolStatus::Handshaking),
            2 => Some(ProtocolStatus::Active),
            _ => None,
        }
    }

    /// Whether frames may be pushed to the connection.
    ///
    /// Returns `true` from `Handshaking` on.
    #[inline]
    #[must_use]
    pub const fn can_push(self) -> bool {
        self.as_u8() >= STATUS_HANDSHAKE
    }

    /// Whether the handshake has completed.
    #[inline]
    #[must_use]
    pub const fn is_active(self) -> bool {
        self.as_u8() >= STATUS_ACTIVE
    }

    /// The later of `self` and `next`.
    #[inline]
    #[must_use]
    pub fn advance(self, next: Self) -> Self {
        self.max(next)
    }
}

impl std::fmt::Display for ProtocolStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolStatus::Uninitialized => write!(f, "Uninitialized"),
            ProtocolStatus::Handshaking => write!(f, "Handshaking"),
            ProtocolStatus::Active => write!(f, "Active"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert_eq!(ProtocolStatus::default(), ProtocolStatus::Uninitialized);
    }

    #[test]
    fn test_ordinals() {
        assert_eq!(STATUS_CONNECTION, 0);
        assert_eq!(STATUS_HANDSHAKE, 1);
        assert_eq!(STATUS_ACTIVE, 2);
        assert_eq!(STATUS_FRAME, STATUS_ACTIVE);
        assert!(ProtocolStatus::Uninitialized < ProtocolStatus::Handshaking);
        assert!(ProtocolStatus::Handshaking < ProtocolStatus::Active);
    }

    #[test]
    fn test_from_u8() {
        for status in [
            ProtocolStatus::Uninitialized,
            ProtocolStatus::Handshaking,
            ProtocolStatus::Active,
        ] {
            assert_eq!(ProtocolStatus::from_u8(status.as_u8()), Some(status));
        }
        assert_eq!(ProtocolStatus::from_u8(3), None);
    }

    #[test]
    fn test_two_tier_checks() {
        assert!(!ProtocolStatus::Uninitialized.can_push());
        assert!(ProtocolStatus::Handshaking.can_push());
        assert!(ProtocolStatus::Active.can_push());

        assert!(!ProtocolStatus::Uninitialized.is_active());
        assert!(!ProtocolStatus::Handshaking.is_active());
        assert!(ProtocolStatus::Active.is_active());
    }

    #[test]
    fn test_advance_never_regresses() {
        let status = ProtocolStatus::Active;
        assert_eq!(status.advance(ProtocolStatus::Handshaking), ProtocolStatus::Active);
        assert_eq!(
            ProtocolStatus::Uninitialized.advance(ProtocolStatus::Handshaking),
            ProtocolStatus::Handshaking
        );
    }

    #[test]
    fn test_state_display() {
        assert_eq!(ProtocolStatus::Uninitialized.to_string(), "Uninitialized");
        assert_eq!(ProtocolStatus::Handshaking.to_string(), "Handshaking");
        assert_eq!(ProtocolStatus::Active.to_string(), "Active");
    }
}
