pub mod error;
pub mod rule;
pub mod validation;

// Rule builders
pub mod far;
pub mod pdr;
pub mod qer;

// Session message assembly
pub mod session;

pub use error::RuleError;
pub use far::{FarBuilder, FarConfig, FarFuzz};
pub use pdr::{Pdi, PdrBuilder, PdrConfig, PdrFuzz};
pub use qer::{QerBuilder, QerConfig, QerFuzz};
pub use rule::{BuiltRule, IeMethod, RuleDefinition, RuleKind};
pub use session::{SessionBuilder, SessionRequest, SessionRequestKind};
pub use validation::{ActionConstraint, ActionRuleSet};
