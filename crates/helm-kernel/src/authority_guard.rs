//! [`AuthorityGuard`] – single interception point between inbound navigation
//! commands and the vessel's kinematics.
//!
//! Every [`NavCommand`] must pass [`AuthorityGuard::authorize_and_verify`]
//! before it is applied.  Two checks run in order:
//!
//! 1. **Authority check**: the sender must be the current holder in the
//!    [`ControllerRegistry`].  Anyone else gets
//!    [`HelmError::UnauthorizedSender`].
//! 2. **Value check**: the value must be finite, speeds must be in
//!    `0..=max_sog_knots`.  Courses are normalised into `[0, 360)`.
//!    Failures are [`HelmError::InvalidCommand`].
//!
//! # Example
//!
//! ```
//! use chrono::Utc;
//! use helm_kernel::{AuthorityGuard, ControllerRegistry, VerifiedCommand};
//! use helm_types::{CommandKind, ControllerId, NavCommand};
//!
//! let roc1: ControllerId = "ROC_1".parse().unwrap();
//! let controllers = ControllerRegistry::new(roc1.clone());
//! let guard = AuthorityGuard::default();
//!
//! let cmd = NavCommand { controller_id: roc1, kind: CommandKind::Cog, value: -90.0, timestamp: Utc::now() };
//! assert_eq!(guard.authorize_and_verify(&cmd, &controllers), Ok(VerifiedCommand::Course(270.0)));
//!
//! let rogue = NavCommand { controller_id: "ROC_2".parse().unwrap(), ..cmd };
//! assert!(guard.authorize_and_verify(&rogue, &controllers).is_err());
//! ```

use helm_types::{CommandKind, HelmError, NavCommand};

use crate::controller_registry::ControllerRegistry;

/// Speed cap applied when none is configured.
pub const DEFAULT_MAX_SOG_KNOTS: f64 = 40.0;

/// A command that passed both checks, ready to apply.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum VerifiedCommand {
    /// Course over ground in `[0, 360)` degrees.
    Course(f64),
    /// Speed over ground in knots.
    Speed(f64),
}

#[derive(Debug, Clone)]
pub struct AuthorityGuard {
    max_sog_knots: f64,
}

impl AuthorityGuard {
    pub fn new(max_sog_knots: f64) -> Self {
        Self { max_sog_knots }
    }

    pub fn max_sog_knots(&self) -> f64 {
        self.max_sog_knots
    }

    /// `Ok(())` iff the command's sender holds authority.
    pub fn authorize(
        &self,
        command: &NavCommand,
        controllers: &ControllerRegistry,
    ) -> Result<(), HelmError> {
        if controllers.is_holder(&command.controller_id) {
            Ok(())
        } else {
            Err(HelmError::UnauthorizedSender {
                sender: command.controller_id.clone(),
                holder: controllers.holder().clone(),
            })
        }
    }

    /// Authorize the sender, then validate and normalise the value.
    ///
    /// # Errors
    ///
    /// - [`HelmError::UnauthorizedSender`] – sender is not the holder.
    /// - [`HelmError::InvalidCommand`] – value is NaN/infinite, or a speed is
    ///   negative or above the cap.
    pub fn authorize_and_verify(
        &self,
        command: &NavCommand,
        controllers: &ControllerRegistry,
    ) -> Result<VerifiedCommand, HelmError> {
        self.authorize(command, controllers)?;

        let value = command.value;
        if !value.is_finite() {
            return Err(HelmError::InvalidCommand(format!(
                "{} value {value} is not finite",
                command.kind
            )));
        }
        match command.kind {
            CommandKind::Cog => {
                let cog = value.rem_euclid(360.0);
                // rem_euclid can round up to exactly 360.0 for tiny negatives.
                Ok(VerifiedCommand::Course(if cog >= 360.0 { 0.0 } else { cog }))
            }
            CommandKind::Sog if value < 0.0 => Err(HelmError::InvalidCommand(format!(
                "SOG {value} kn is negative"
            ))),
            CommandKind::Sog if value > self.max_sog_knots => {
                Err(HelmError::InvalidCommand(format!(
                    "SOG {value} kn exceeds the {} kn cap",
                    self.max_sog_knots
                )))
            }
            CommandKind::Sog => Ok(VerifiedCommand::Speed(value)),
        }
    }
}

impl Default for AuthorityGuard {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_SOG_KNOTS)
    }
}
