//! Organization and membership lifecycle rules.
//!
//! Pure, deterministic domain logic (no IO, no HTTP, no storage). Stores call
//! into these rules while holding whatever lock or transaction makes the
//! read-then-write atomic.

pub mod case;
pub mod invitation;
pub mod join_request;
pub mod membership;
pub mod organization;
pub mod tag;
pub mod voter;

pub use case::{Case, CaseStatus, NewCase};
pub use invitation::{AcceptCheck, Invitation, InviteToken, normalize_email};
pub use join_request::{Decision, JoinRequest, JoinRequestStatus};
pub use membership::{Membership, ensure_admin_remains};
pub use organization::{JoinCode, NewOrganization, OfficeKind, OfficeScope, Organization};
pub use tag::{DEFAULT_TAG_COLOR, NewTag, Tag, TagPatch};
pub use voter::{NewVoter, Voter, VoterPatch};
