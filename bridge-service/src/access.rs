//! Caller identity and the GM access guard.

use serde::{Deserialize, Serialize};

/// Foundry VTT user roles (`CONST.USER_ROLES`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum UserRole {
    #[default]
    None = 0,
    Player = 1,
    Trusted = 2,
    Assistant = 3,
    Gamemaster = 4,
}

impl UserRole {
    /// Convert from u8, defaulting to None for invalid values
    pub fn from_u8(value: u8) -> Self {
        match value {
            1 => UserRole::Player,
            2 => UserRole::Trusted,
            3 => UserRole::Assistant,
            4 => UserRole::Gamemaster,
            _ => UserRole::None,
        }
    }

    /// Assistant GMs count as GMs, matching Foundry's `User#isGM`
    pub fn is_gm(self) -> bool {
        self >= UserRole::Assistant
    }
}

/// Identity of whoever a query runs on behalf of
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    pub user_id: Option<String>,
    pub role: UserRole,
}

impl Caller {
    pub fn new(user_id: impl Into<String>, role: UserRole) -> Self {
        Self {
            user_id: Some(user_id.into()),
            role,
        }
    }

    /// Caller with no host session behind it
    pub fn anonymous() -> Self {
        Self::default()
    }
}

/// Outcome of the access check. Carries no reason on purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessCheck {
    pub allowed: bool,
}

/// Only GMs may run queries; denial is silent.
pub fn validate_gm_access(caller: &Caller) -> AccessCheck {
    AccessCheck {
        allowed: caller.role.is_gm(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gm_roles() {
        assert!(!UserRole::None.is_gm());
        assert!(!UserRole::Player.is_gm());
        assert!(!UserRole::Trusted.is_gm());
        assert!(UserRole::Assistant.is_gm());
        assert!(UserRole::Gamemaster.is_gm());
    }

    #[test]
    fn test_role_from_u8() {
        assert_eq!(UserRole::from_u8(0), UserRole::None);
        assert_eq!(UserRole::from_u8(2), UserRole::Trusted);
        assert_eq!(UserRole::from_u8(4), UserRole::Gamemaster);
        assert_eq!(UserRole::from_u8(7), UserRole::None);
        assert_eq!(UserRole::from_u8(255), UserRole::None);
    }

    #[test]
    fn test_unknown_role_is_denied() {
        let caller = Caller::new("u7", UserRole::from_u8(7));
        assert!(!validate_gm_access(&caller).allowed);
    }

    #[test]
    fn test_guard() {
        assert!(validate_gm_access(&Caller::new("gm", UserRole::Gamemaster)).allowed);
        assert!(!validate_gm_access(&Caller::new("p1", UserRole::Player)).allowed);
        assert!(!validate_gm_access(&Caller::anonymous()).allowed);
    }
}
