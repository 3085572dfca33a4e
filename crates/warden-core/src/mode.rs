//! Mode selector validation and key derivation

use warden_api::{FocusType, ModeType, StandardSubMode};
use warden_util::{ModeKey, Result, WardenError};

/// Validate a (mode, submode, focus) combination against the fixed
/// compatibility table: a submode is only valid under `Standard`, a focus
/// type only under `Focus`, and `Kids` takes neither.
pub fn validate_combination(
    mode: ModeType,
    submode: Option<StandardSubMode>,
    focus: Option<FocusType>,
) -> Result<()> {
    match mode {
        ModeType::Standard => {
            if focus.is_some() {
                return Err(WardenError::combination(
                    "focus type is only valid under focus mode",
                ));
            }
        }
        ModeType::Kids => {
            if submode.is_some() || focus.is_some() {
                return Err(WardenError::combination(
                    "kids mode takes neither a submode nor a focus type",
                ));
            }
        }
        ModeType::Focus => {
            if submode.is_some() {
                return Err(WardenError::combination(
                    "submode is only valid under standard mode",
                ));
            }
            if focus.is_none() {
                return Err(WardenError::combination(
                    "focus mode requires a focus type",
                ));
            }
        }
    }
    Ok(())
}

/// Derive the policy-store key for a validated selector.
///
/// `standard_<submode>` (submode defaults to `normal`), `kids`, or
/// `focus_<type>`.
pub fn mode_key(
    mode: ModeType,
    submode: Option<StandardSubMode>,
    focus: Option<FocusType>,
) -> ModeKey {
    match mode {
        ModeType::Standard => {
            let sub = submode.unwrap_or(StandardSubMode::Normal);
            ModeKey::new(format!("standard_{}", sub.as_str()))
        }
        ModeType::Kids => ModeKey::new("kids"),
        ModeType::Focus => {
            let kind = focus.unwrap_or(FocusType::Deep);
            ModeKey::new(format!("focus_{}", kind.as_str()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_accepts_submode() {
        assert!(validate_combination(
            ModeType::Standard,
            Some(StandardSubMode::Work),
            None
        )
        .is_ok());
        assert!(validate_combination(ModeType::Standard, None, None).is_ok());
    }

    #[test]
    fn standard_rejects_focus() {
        let err =
            validate_combination(ModeType::Standard, None, Some(FocusType::Deep)).unwrap_err();
        assert_eq!(err.kind(), "invalid_mode_combination");
    }

    #[test]
    fn kids_takes_no_refinement() {
        assert!(validate_combination(ModeType::Kids, None, None).is_ok());
        assert!(
            validate_combination(ModeType::Kids, Some(StandardSubMode::Normal), None).is_err()
        );
        assert!(validate_combination(ModeType::Kids, None, Some(FocusType::Light)).is_err());
    }

    #[test]
    fn focus_requires_focus_type() {
        assert!(validate_combination(ModeType::Focus, None, Some(FocusType::Custom)).is_ok());
        assert!(validate_combination(ModeType::Focus, None, None).is_err());
        assert!(
            validate_combination(ModeType::Focus, Some(StandardSubMode::Work), Some(FocusType::Deep))
                .is_err()
        );
    }

    #[test]
    fn keys_are_derived_from_selector() {
        assert_eq!(
            mode_key(ModeType::Standard, Some(StandardSubMode::Leisure), None).as_str(),
            "standard_leisure"
        );
        assert_eq!(mode_key(ModeType::Standard, None, None).as_str(), "standard_normal");
        assert_eq!(mode_key(ModeType::Kids, None, None).as_str(), "kids");
        assert_eq!(
            mode_key(ModeType::Focus, None, Some(FocusType::Light)).as_str(),
            "focus_light"
        );
    }
}
