use gabinete_core::OrgId;

/// Marks messages that may belong to an organization.
///
/// Workers use this to pin themselves to one organization when needed; global
/// messages (e.g. a super-admin password reset) return `None`.
pub trait OrgScoped {
    fn org_id(&self) -> Option<OrgId>;
}
